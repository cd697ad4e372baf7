//! # I18n Unit Tests / I18n 单元测试
//!
//! Locale resolution and the localized status labels used by every report.
//!
//! 语言环境解析以及所有报告使用的本地化状态标签。

use storm_runner::core::models::Status;
use storm_runner::reporting::console::status_label;
use storm_runner::resolve_locale;

#[cfg(test)]
mod locale_resolution_tests {
    use super::*;

    #[test]
    fn test_exact_locale_is_kept() {
        assert_eq!(resolve_locale("en"), "en");
        assert_eq!(resolve_locale("zh-CN"), "zh-CN");
    }

    #[test]
    fn test_region_falls_back_to_language() {
        assert_eq!(resolve_locale("en-US"), "en");
        assert_eq!(resolve_locale("en_GB"), "en");
    }

    #[test]
    fn test_any_chinese_variant_maps_to_zh_cn() {
        assert_eq!(resolve_locale("zh"), "zh-CN");
        assert_eq!(resolve_locale("zh_CN"), "zh-CN");
        assert_eq!(resolve_locale("zh-TW"), "zh-CN");
    }

    #[test]
    fn test_unknown_locale_falls_back_to_english() {
        assert_eq!(resolve_locale("fr-FR"), "en");
        assert_eq!(resolve_locale(""), "en");
        assert_eq!(resolve_locale("invalid-lang"), "en");
    }
}

#[cfg(test)]
mod status_label_tests {
    use super::*;

    #[test]
    fn test_english_labels() {
        assert_eq!(status_label(Status::Pass, "en"), "PASS");
        assert_eq!(status_label(Status::Fail, "en"), "FAIL");
        assert_eq!(status_label(Status::Skipped, "en"), "SKIPPED");
        assert_eq!(status_label(Status::NotRun, "en"), "NOT_RUN");
    }

    #[test]
    fn test_chinese_labels() {
        assert_eq!(status_label(Status::Pass, "zh-CN"), "通过");
        assert_eq!(status_label(Status::Fail, "zh-CN"), "失败");
        assert_eq!(status_label(Status::Skipped, "zh-CN"), "跳过");
    }

    /// Labels are looked up per call, so mixing locales is safe.
    #[test]
    fn test_locales_do_not_interfere() {
        let english = status_label(Status::Pass, "en");
        let chinese = status_label(Status::Pass, "zh-CN");
        assert_ne!(english, chinese);
        assert_eq!(status_label(Status::Pass, "en"), english);
    }
}
