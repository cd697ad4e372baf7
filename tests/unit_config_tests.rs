//! # Config Module Unit Tests / Config 模块单元测试
//!
//! Parsing and validation of `Storm.toml`, test data resolution, and the
//! translation of config entries into runnable suites.
//!
//! `Storm.toml` 的解析与验证、测试数据解析，以及配置项到可运行套件的转换。

use std::fs;
use storm_runner::core::config::{StormConfig, parse_config};
use storm_runner::core::error::ConfigError;
use storm_runner::core::registry::{GherkinRole, ScenarioMode};
use tempfile::tempdir;

const SAMPLE: &str = r#"
language = "zh-CN"
jobs = 4

[logging]
level = "debug"
directory = "logs"

[[suites]]
name = "Smoke"
test_data = { env = "dev" }

[[suites.tests]]
name = "TestLogin"
test_id = "C-1"
set_up = "true"
cases = [
    { name = "login works", command = "true" },
    { name = "sizes", command = "true", rows = { small = 1, large = 100 } },
]

[[suites.behaviors]]
name = "LoginBehavior"
mode = "linear"
steps = [
    { role = "given", name = "a user", command = "true" },
    { role = "when", name = "they log in", command = "true", skip_with = ["GIVEN nobody"] },
    { role = "then", name = "a session exists", command = "true", can_fail = true },
]
"#;

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_parse_sample_config() {
        let config = parse_config(SAMPLE).unwrap();

        assert_eq!(config.language, "zh-CN");
        assert_eq!(config.jobs, 4);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.suites.len(), 1);

        let suite = &config.suites[0];
        assert_eq!(suite.name, "Smoke");
        assert_eq!(
            suite.test_data.as_ref().and_then(|d| d.get("env")),
            Some(&serde_json::json!("dev"))
        );

        let test = &suite.tests[0];
        assert_eq!(test.test_id.as_deref(), Some("C-1"));
        assert_eq!(test.set_up.as_deref(), Some("true"));
        assert_eq!(test.cases.len(), 2);
        assert_eq!(test.cases[1].rows.as_ref().map(|r| r.len()), Some(2));

        let behavior = &suite.behaviors[0];
        assert_eq!(behavior.mode, ScenarioMode::Linear);
        assert_eq!(behavior.steps[0].role, GherkinRole::Given);
        assert_eq!(behavior.steps[1].skip_with, vec!["GIVEN nobody"]);
        assert!(behavior.steps[2].can_fail);
    }

    #[test]
    fn test_defaults_apply_to_empty_config() {
        let config = parse_config("").unwrap();
        let default = StormConfig::default();

        assert_eq!(config.language, "en");
        assert_eq!(config.jobs, 1);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.directory.is_none());
        assert!(config.suites.is_empty());
        assert_eq!(default.jobs, config.jobs);
    }

    #[test]
    fn test_config_serializes_back_to_toml() {
        let config = parse_config(SAMPLE).unwrap();
        let text = toml::to_string_pretty(&config).unwrap();
        let again = parse_config(&text).unwrap();

        assert_eq!(again.suites[0].tests[0].cases.len(), 2);
        assert_eq!(again.suites[0].behaviors[0].mode, ScenarioMode::Linear);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = parse_config("jobs = [").unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse TOML config"));
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    fn config_error(text: &str) -> ConfigError {
        let err = parse_config(text).unwrap_err();
        match err.downcast::<ConfigError>() {
            Ok(e) => e,
            Err(other) => panic!("expected a ConfigError, got {other:#}"),
        }
    }

    #[test]
    fn test_zero_jobs_is_rejected() {
        assert!(matches!(config_error("jobs = 0"), ConfigError::InvalidJobs));
    }

    #[test]
    fn test_duplicate_suite_names_are_rejected() {
        let text = r#"
            [[suites]]
            name = "Same"
            [[suites]]
            name = "Same"
        "#;
        match config_error(text) {
            ConfigError::DuplicateSuite(name) => assert_eq!(name, "Same"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_case_name_is_rejected() {
        let text = r#"
            [[suites]]
            name = "S"
            [[suites.tests]]
            name = "TestBlank"
            cases = [{ name = "  ", command = "true" }]
        "#;
        match config_error(text) {
            ConfigError::EmptyCaseName { test } => assert_eq!(test, "TestBlank"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_step_name_is_rejected() {
        let text = r#"
            [[suites]]
            name = "S"
            [[suites.behaviors]]
            name = "Spec"
            steps = [{ role = "given", name = "", command = "true" }]
        "#;
        assert!(matches!(
            config_error(text),
            ConfigError::EmptyCaseName { .. }
        ));
    }
}

#[cfg(test)]
mod data_tests {
    use super::*;

    #[test]
    fn test_data_file_is_merged_over_inline_data() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("data.json"),
            r#"{ "env": "staging", "user": "ada" }"#,
        )
        .unwrap();
        let text = r#"
            [[suites]]
            name = "S"
            test_data = { env = "dev", region = "eu" }
            test_data_file = "data.json"
        "#;
        let config = parse_config(text).unwrap();

        let data = config.suites[0].resolve_data(dir.path()).unwrap().unwrap();

        assert_eq!(data["env"], "staging");
        assert_eq!(data["user"], "ada");
        assert_eq!(data["region"], "eu");
    }

    #[test]
    fn test_non_object_data_file_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("data.json"), "[1, 2, 3]").unwrap();
        let text = r#"
            [[suites]]
            name = "S"
            test_data_file = "data.json"
        "#;
        let config = parse_config(text).unwrap();

        let err = config.suites[0].resolve_data(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::TestDataNotObject { .. })
        ));
    }

    #[test]
    fn test_missing_data_file_fails_the_build() {
        let dir = tempdir().unwrap();
        let text = r#"
            [[suites]]
            name = "S"
            test_data_file = "missing.json"
        "#;
        let config = parse_config(text).unwrap();

        let err = config.build_suites(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("suite 'S'"));
    }

    #[test]
    fn test_suite_without_data_has_none() {
        let config = parse_config("[[suites]]\nname = \"Bare\"").unwrap();
        assert!(config.suites[0].resolve_data(std::path::Path::new(".")).unwrap().is_none());
    }
}

#[cfg(test)]
mod build_tests {
    use super::*;
    use std::sync::Arc;
    use storm_runner::core::models::Status;
    use storm_runner::core::suite::StormRunner;
    use storm_runner::reporting::NoopReporter;

    #[test]
    fn test_build_suites_keeps_unit_order() {
        let dir = tempdir().unwrap();
        let config = parse_config(SAMPLE).unwrap();

        let suites = config.build_suites(dir.path()).unwrap();

        assert_eq!(suites.len(), 1);
        assert_eq!(suites[0].name(), "Smoke");
        let names: Vec<_> = suites[0].units().iter().map(|u| u.name().to_string()).collect();
        assert_eq!(names, vec!["TestLogin", "LoginBehavior"]);
        assert!(suites[0].test_data().is_some());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_command_backed_suite_runs() {
        let dir = tempdir().unwrap();
        let text = r#"
            jobs = 2

            [[suites]]
            name = "Commands"

            [[suites.tests]]
            name = "TestPasses"
            cases = [{ name = "ok", command = "true" }]

            [[suites.tests]]
            name = "TestFails"
            cases = [{ name = "broken", command = "false" }]

            [[suites.behaviors]]
            name = "Spec"
            steps = [
                { role = "given", name = "g", command = "true" },
                { role = "when", name = "w", command = "true" },
                { role = "then", name = "t", command = "false", can_fail = true },
            ]
        "#;
        let config = parse_config(text).unwrap();
        let suites = config.build_suites(dir.path()).unwrap();
        let mut runner = StormRunner::new(suites)
            .with_jobs(config.jobs)
            .with_reporter(Arc::new(NoopReporter));

        let summary = runner.run_tests(None).await;
        let statuses: Vec<_> = summary.suites[0].records.iter().map(|r| r.status).collect();

        assert_eq!(statuses, vec![Status::Pass, Status::Fail, Status::Skipped]);
        assert!(summary.has_failures());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_rows_are_exported_to_the_command() {
        let dir = tempdir().unwrap();
        let text = r#"
            [[suites]]
            name = "Rows"

            [[suites.tests]]
            name = "TestRows"
            cases = [
                { name = "positive", command = "sh -c 'test \"$STORM_ROW_DATA\" -gt 0'", rows = { one = 1, zero = 0 } },
            ]
        "#;
        let config = parse_config(text).unwrap();
        let mut runner = StormRunner::new(config.build_suites(dir.path()).unwrap());

        let summary = runner.run_tests(None).await;
        let cases = &summary.suites[0].records[0].cases;

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "positive - one");
        assert_eq!(cases[0].status, Status::Pass);
        assert_eq!(cases[1].name, "positive - zero");
        assert_eq!(cases[1].status, Status::Fail);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hooks_see_the_run_time_data() {
        let dir = tempdir().unwrap();
        let text = r#"
            [[suites]]
            name = "Hooks"
            test_data = { env = "dev" }

            [[suites.tests]]
            name = "TestHook"
            set_up = "sh -c 'echo \"$STORM_TEST_DATA\" > hook.json'"
            cases = [{ name = "ok", command = "true" }]
        "#;
        let config = parse_config(text).unwrap();
        let mut runner = StormRunner::new(config.build_suites(dir.path()).unwrap());
        let mut data = storm_runner::core::models::TestData::new();
        data.insert("env".to_string(), serde_json::json!("prod"));

        let summary = runner.run_tests(Some(data)).await;
        let seen: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("hook.json")).unwrap()).unwrap();

        assert_eq!(summary.status(), Status::Pass);
        assert_eq!(seen["env"], "prod");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_token_skips_every_command() {
        let dir = tempdir().unwrap();
        let text = r#"
            [[suites]]
            name = "Cancelled"

            [[suites.tests]]
            name = "TestTouch"
            set_up_each = "touch ran.txt"
            cases = [{ name = "touch", command = "touch ran.txt" }]

            [[suites.behaviors]]
            name = "Spec"
            steps = [
                { role = "given", name = "g", command = "touch ran.txt" },
                { role = "when", name = "w", command = "true" },
                { role = "then", name = "t", command = "true" },
            ]
        "#;
        let config = parse_config(text).unwrap();
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let suites = config
            .build_suites_with_cancellation(dir.path(), &token)
            .unwrap();
        let mut runner = StormRunner::new(suites);

        let summary = runner.run_tests(None).await;
        let records = &summary.suites[0].records;

        assert_eq!(records[0].cases[0].status, Status::Skipped);
        assert_eq!(records[1].status, Status::Skipped);
        assert!(!summary.has_failures());
        assert!(!dir.path().join("ran.txt").exists());
    }
}
