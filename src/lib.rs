//! # Storm Runner Library / Storm Runner 库
//!
//! A test orchestration library: register lifecycle tests and Given/When/Then
//! behavior specs, group them into suites, run them in parallel and report
//! their results. The `storm-runner` binary drives the same engine from a
//! `Storm.toml` file whose hooks, cases and steps are shell commands.
//!
//! 一个测试编排库：注册生命周期测试和 Given/When/Then 行为规格，将它们组织成套件，
//! 并行运行并报告结果。`storm-runner` 可执行文件通过 `Storm.toml` 驱动同一引擎，
//! 其中的钩子、用例和步骤都是 shell 命令。
//!
//! ## Modules / 模块
//!
//! - `core` - Registry, lifecycle controller, BDD engine, executor and aggregation
//! - `infra` - Command execution, test-data files and logging setup
//! - `reporting` - Reporter interface plus console, HTML and submission sinks
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 注册表、生命周期控制器、BDD 引擎、执行器和结果聚合
//! - `infra` - 命令执行、测试数据文件和日志设置
//! - `reporting` - 报告器接口以及控制台、HTML 和结果提交输出端
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::{
    BehaviorSpec, GherkinRole, ParallelExecutor, RunSummary, Skip, Status, StormRunner, StormTest,
    TestContext, TestData, TestSuite,
};
pub use rust_i18n::t;

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

/// Maps a requested locale onto one the crate ships.
///
/// It attempts to match the full locale (e.g., "zh-CN"), then just the
/// language code (e.g., "en" from "en-US"), and finally falls back to "en".
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();
    if available_locales.contains(&requested) {
        return requested.to_string();
    }
    let language = requested.split(['-', '_']).next().unwrap_or("en");
    if language == "zh" && available_locales.contains(&"zh-CN") {
        return "zh-CN".to_string();
    }
    available_locales
        .iter()
        .find(|locale| **locale == language)
        .map(|locale| locale.to_string())
        .unwrap_or_else(|| "en".to_string())
}
