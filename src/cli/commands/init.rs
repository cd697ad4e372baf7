//! # Config Initialization Module / 配置初始化模块
//!
//! This module provides an interactive command-line wizard that writes a
//! starter `Storm.toml` built from a few templates: a lifecycle test with
//! shell hooks, a parameterized case and a behavior spec.
//!
//! 此模块提供交互式命令行向导，根据几个模板生成初始 `Storm.toml`：
//! 带 shell 钩子的生命周期测试、参数化用例以及行为规格。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, theme::ColorfulTheme};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::core::config::{
    BehaviorConfig, CaseConfig, DEFAULT_CONFIG_FILE, LoggingConfig, StepConfig, StormConfig,
    SuiteConfig, TestConfig,
};
use crate::core::models::TestData;
use crate::core::registry::{GherkinRole, ScenarioMode};
use crate::t;

/// Runs the wizard to generate a `Storm.toml` file in the current directory.
///
/// With `non_interactive`, a default configuration is written without any
/// prompt, overwriting an existing file.
///
/// 运行向导，在当前目录生成 `Storm.toml` 文件。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new(DEFAULT_CONFIG_FILE);
    let theme = ColorfulTheme::default();

    if non_interactive {
        return write_config(config_path, &default_config(language), language);
    }

    println!("\n{}", t!("init_wizard_welcome", locale = language).cyan().bold());
    println!("{}", t!("init_wizard_description", locale = language));

    if config_path.exists() {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init_overwrite_prompt", locale = language, path = config_path.display()))
            .default(false)
            .interact()
            .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init_aborted", locale = language));
            return Ok(());
        }
    }

    let jobs: usize = Input::with_theme(&theme)
        .with_prompt(t!("init_jobs_prompt", locale = language))
        .default(default_jobs())
        .validate_with(|jobs: &usize| {
            if *jobs >= 1 {
                Ok(())
            } else {
                Err(t!("init_jobs_invalid", locale = language).to_string())
            }
        })
        .interact_text()?;

    let log_to_file = Confirm::with_theme(&theme)
        .with_prompt(t!("init_log_file_prompt", locale = language))
        .default(true)
        .interact()
        .context(t!("init_user_confirmation_failed", locale = language).to_string())?;

    let options = [
        ("lifecycle", t!("init_template_lifecycle", locale = language)),
        ("parameterized", t!("init_template_parameterized", locale = language)),
        ("behavior", t!("init_template_behavior", locale = language)),
    ];

    let selections = MultiSelect::with_theme(&theme)
        .with_prompt(t!("init_template_selection_prompt", locale = language))
        .items(&options.iter().map(|o| o.1.clone()).collect::<Vec<_>>())
        .interact()
        .context(t!("init_user_confirmation_failed", locale = language).to_string())?;

    if selections.is_empty() {
        println!("{}", t!("init_no_templates_selected", locale = language).yellow());
        return write_config(config_path, &default_config(language), language);
    }

    let mut suite = empty_suite();
    for i in selections {
        match options[i].0 {
            "lifecycle" => {
                let command: String = Input::with_theme(&theme)
                    .with_prompt(t!("init_command_prompt", locale = language))
                    .default("true".to_string())
                    .interact_text()?;
                suite.tests.push(lifecycle_template(&command));
            }
            "parameterized" => suite.tests.push(parameterized_template()),
            "behavior" => suite.behaviors.push(behavior_template()),
            _ => continue,
        }
    }

    let storm_config = StormConfig {
        language: language.to_string(),
        jobs,
        logging: LoggingConfig {
            directory: log_to_file.then(|| "logs".into()),
            ..LoggingConfig::default()
        },
        suites: vec![suite],
    };
    write_config(config_path, &storm_config, language)
}

fn default_jobs() -> usize {
    num_cpus::get() / 2 + 1
}

fn empty_suite() -> SuiteConfig {
    let mut data = TestData::new();
    data.insert("env".to_string(), json!("dev"));
    SuiteConfig {
        name: "Smoke".to_string(),
        test_data: Some(data),
        test_data_file: None,
        tests: Vec::new(),
        behaviors: Vec::new(),
    }
}

fn lifecycle_template(command: &str) -> TestConfig {
    TestConfig {
        name: "TestTheThing".to_string(),
        set_up: Some("echo set up".to_string()),
        tear_down: Some("echo tear down".to_string()),
        cases: vec![CaseConfig {
            name: "the thing works".to_string(),
            command: command.to_string(),
            rows: None,
        }],
        ..TestConfig::default()
    }
}

fn parameterized_template() -> TestConfig {
    let mut rows = TestData::new();
    rows.insert("small".to_string(), json!(1));
    rows.insert("large".to_string(), json!(1000));
    TestConfig {
        name: "TestSizes".to_string(),
        cases: vec![CaseConfig {
            name: "accepts size".to_string(),
            command: "sh -c 'test -n \"$STORM_ROW_DATA\"'".to_string(),
            rows: Some(rows),
        }],
        ..TestConfig::default()
    }
}

fn behavior_template() -> BehaviorConfig {
    let step = |role, name: &str, command: &str| StepConfig {
        role,
        name: name.to_string(),
        command: command.to_string(),
        can_fail: false,
        skip_with: Vec::new(),
    };
    BehaviorConfig {
        name: "LoginBehavior".to_string(),
        mode: ScenarioMode::DecisionMatrix,
        steps: vec![
            step(GherkinRole::Given, "a registered user", "true"),
            step(GherkinRole::When, "the user logs in", "true"),
            step(GherkinRole::Then, "the dashboard is shown", "true"),
        ],
    }
}

/// The configuration written by `init --non-interactive`.
pub fn default_config(language: &str) -> StormConfig {
    let mut suite = empty_suite();
    suite.tests.push(lifecycle_template("true"));
    StormConfig {
        language: language.to_string(),
        jobs: default_jobs(),
        logging: LoggingConfig::default(),
        suites: vec![suite],
    }
}

fn write_config(path: &Path, storm_config: &StormConfig, language: &str) -> Result<()> {
    let toml_string = toml::to_string_pretty(storm_config)
        .context(t!("init_serialize_failed", locale = language).to_string())?;

    fs::write(path, toml_string)
        .with_context(|| t!("init_write_failed", locale = language, path = path.display()).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init_success_created", locale = language, path = path.display()).bold()
    );
    println!("{}", t!("init_usage_hint", locale = language));

    Ok(())
}
