//! # Logging Setup Tests / 日志设置测试

use chrono::{Local, TimeZone};
use storm_runner::core::config::LoggingConfig;
use storm_runner::infra::logging::{init, log_file_name};
use tempfile::tempdir;

#[cfg(test)]
mod logging_tests {
    use super::*;

    #[test]
    fn test_log_file_name_uses_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(log_file_name(now), "storm_test_20240309140507.log");
    }

    #[test]
    fn test_init_creates_log_file_under_base_dir() {
        let dir = tempdir().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            directory: Some("logs".into()),
        };

        let path = init(&config, dir.path()).unwrap().unwrap();

        assert!(path.starts_with(dir.path().join("logs")));
        assert!(path.exists());
        // A second call keeps the first subscriber and still succeeds.
        assert!(init(&LoggingConfig::default(), dir.path()).unwrap().is_none());
    }
}
