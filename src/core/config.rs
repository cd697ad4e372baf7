//! # Configuration Module / 配置模块
//!
//! The `Storm.toml` model and its translation into runnable suites. Every
//! hook, case and step declared in the file is backed by a shell command
//! run through [`ShellCommand`].
//!
//! `Storm.toml` 配置模型及其到可运行套件的转换。文件中声明的每个钩子、
//! 用例和步骤都由通过 [`ShellCommand`] 运行的 shell 命令支撑。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::context::TestContext;
use crate::core::error::{ConfigError, Skip};
use crate::core::executor::Runnable;
use crate::core::models::TestData;
use crate::core::registry::{
    BehaviorSpec, GherkinRole, GherkinStep, HookKind, ScenarioMode, StepOutput, StormTest,
};
use crate::core::suite::TestSuite;
use crate::infra::command::ShellCommand;
use crate::infra::fs::{load_test_data, merge_test_data, resolve};
use crate::infra::t;

/// Default config file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "Storm.toml";

/// Represents the entire runner configuration, loaded from a TOML file.
/// 代表从 TOML 文件加载的整个运行器配置。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StormConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,

    /// Maximum number of units running at once.
    /// 同时运行的最大单元数。
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub suites: Vec<SuiteConfig>,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            jobs: default_jobs(),
            logging: LoggingConfig::default(),
            suites: Vec::new(),
        }
    }
}

/// Logging settings. / 日志设置。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// A `tracing` filter directive such as `info` or `storm_runner=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    /// When set, every run also writes `storm_test_<timestamp>.log` here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuiteConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data: Option<TestData>,
    /// JSON object merged over `test_data`, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data_file: Option<PathBuf>,
    #[serde(default)]
    pub tests: Vec<TestConfig>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorConfig>,
}

/// A lifecycle test with shell hooks. / 带 shell 钩子的生命周期测试。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TestConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tear_down: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_up_each: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tear_down_each: Option<String>,
    #[serde(default)]
    pub cases: Vec<CaseConfig>,
}

/// One case. With `rows`, it expands into one case per row named
/// `"<name> - <row key>"`, and the row is exported as `STORM_ROW_DATA`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaseConfig {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<TestData>,
}

/// A behavior spec whose steps are shell commands.
/// 步骤为 shell 命令的行为规格。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BehaviorConfig {
    pub name: String,
    #[serde(default)]
    pub mode: ScenarioMode,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// A Given/When/Then command. A zero exit passes; stdout holding a JSON
/// object becomes the next data state. A non-zero exit fails the step, or
/// skips it when `can_fail` is set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepConfig {
    pub role: GherkinRole,
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub can_fail: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_with: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_jobs() -> usize {
    crate::core::executor::DEFAULT_JOBS
}

fn default_level() -> String {
    "info".to_string()
}

/// Loads and validates the configuration from a TOML file.
/// 从 TOML 文件加载并验证配置。
pub fn load_config(path: &Path) -> Result<StormConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = parse_config(&content)?;
    Ok(config)
}

/// Parses and validates configuration text.
pub fn parse_config(content: &str) -> Result<StormConfig> {
    let config: StormConfig = toml::from_str(content).context("Failed to parse TOML config")?;
    config.validate()?;
    Ok(config)
}

impl StormConfig {
    /// Checks the invariants serde cannot express.
    /// 检查 serde 无法表达的约束。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::InvalidJobs);
        }
        let mut seen = HashSet::new();
        for suite in &self.suites {
            if !seen.insert(suite.name.as_str()) {
                return Err(ConfigError::DuplicateSuite(suite.name.clone()));
            }
            for test in &suite.tests {
                if test.cases.iter().any(|c| c.name.trim().is_empty()) {
                    return Err(ConfigError::EmptyCaseName {
                        test: test.name.clone(),
                    });
                }
            }
            for behavior in &suite.behaviors {
                if behavior.steps.iter().any(|s| s.name.trim().is_empty()) {
                    return Err(ConfigError::EmptyCaseName {
                        test: behavior.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Builds runnable suites. Relative paths and commands resolve against
    /// `base_dir`, normally the directory holding the config file.
    ///
    /// 构建可运行的套件。相对路径和命令都相对于 `base_dir` 解析，通常是配置文件所在目录。
    pub fn build_suites(&self, base_dir: &Path) -> Result<Vec<TestSuite>> {
        self.build_suites_with_cancellation(base_dir, &CancellationToken::new())
    }

    /// Like [`build_suites`](Self::build_suites), but every command stops
    /// once `token` is cancelled: a running child is killed and whatever has
    /// not started yet is recorded SKIPPED.
    ///
    /// 与 `build_suites` 相同，但 `token` 取消后所有命令都会停止：
    /// 正在运行的子进程被终止，尚未开始的部分记为 SKIPPED。
    pub fn build_suites_with_cancellation(
        &self,
        base_dir: &Path,
        token: &CancellationToken,
    ) -> Result<Vec<TestSuite>> {
        self.suites
            .iter()
            .map(|suite| suite.build(base_dir, token))
            .collect()
    }
}

impl SuiteConfig {
    /// Resolves the suite's data: inline `test_data` with the data file merged over it.
    pub fn resolve_data(&self, base_dir: &Path) -> Result<Option<TestData>> {
        let file_data = match &self.test_data_file {
            Some(path) => Some(load_test_data(&resolve(base_dir, path))?),
            None => None,
        };
        Ok(match (self.test_data.clone(), file_data) {
            (Some(inline), Some(file)) => Some(merge_test_data(inline, file)),
            (inline, file) => inline.or(file),
        })
    }

    pub fn build(&self, base_dir: &Path, token: &CancellationToken) -> Result<TestSuite> {
        let data = self
            .resolve_data(base_dir)
            .with_context(|| format!("Failed to load test data for suite '{}'", self.name))?;

        let mut units: Vec<Arc<dyn Runnable>> = Vec::new();
        for test in &self.tests {
            units.push(Arc::new(test.build(base_dir, token)));
        }
        for behavior in &self.behaviors {
            units.push(Arc::new(behavior.build(base_dir, token)));
        }

        let suite = TestSuite::new(&self.name).with_units(units);
        Ok(match data {
            Some(data) => suite.with_test_data(data),
            None => suite,
        })
    }
}

impl TestConfig {
    /// Hooks and case bodies both see the data the run hands them.
    pub fn build(&self, base_dir: &Path, token: &CancellationToken) -> StormTest {
        let mut test = StormTest::new(&self.name);
        if let Some(id) = &self.test_id {
            test = test.with_test_id(id);
        }
        if let Some(description) = &self.description {
            test = test.with_description(description);
        }

        let hooks = [
            (HookKind::SetUp, &self.set_up),
            (HookKind::TearDown, &self.tear_down),
            (HookKind::SetUpEach, &self.set_up_each),
            (HookKind::TearDownEach, &self.tear_down_each),
        ];
        for (kind, line) in hooks {
            if let Some(line) = line {
                let cmd = ShellCommand::new(line, base_dir).with_cancellation(token.clone());
                test = test.hook(kind, move |ctx: &mut TestContext| {
                    interruptible(&cmd, || cmd.run_checked(ctx.data(), None)).map(|_| ())
                });
            }
        }

        for case in &self.cases {
            let cmd = ShellCommand::new(&case.command, base_dir).with_cancellation(token.clone());
            test = match &case.rows {
                Some(rows) => test.iter_case(
                    &case.name,
                    rows.clone(),
                    move |ctx: &mut TestContext, row: &Value, data: Option<&TestData>| {
                        let out = interruptible(&cmd, || cmd.run_checked(data, Some(row)))?;
                        ctx.step(cmd.line(), Some(json!({ "output": out.output })));
                        Ok(())
                    },
                ),
                None => test.case(&case.name, move |ctx: &mut TestContext, data: Option<&TestData>| {
                    let out = interruptible(&cmd, || cmd.run_checked(data, None))?;
                    ctx.step(cmd.line(), Some(json!({ "output": out.output })));
                    Ok(())
                }),
            };
        }
        test
    }
}

impl BehaviorConfig {
    pub fn build(&self, base_dir: &Path, token: &CancellationToken) -> BehaviorSpec {
        let mut spec = BehaviorSpec::new(&self.name).with_mode(self.mode);
        for step in &self.steps {
            let cmd = ShellCommand::new(&step.command, base_dir).with_cancellation(token.clone());
            let can_fail = step.can_fail;
            let mut gherkin = GherkinStep::new(step.role, &step.name, move |data: &TestData| {
                interruptible(&cmd, || run_step_command(&cmd, data, can_fail))
            });
            gherkin.can_fail = can_fail;
            gherkin.skip_with = step
                .skip_with
                .iter()
                .map(|other| other.trim().replace('_', " "))
                .collect();
            spec = spec.step(gherkin);
        }
        spec
    }
}

/// Runs `call` unless the run was interrupted. An interrupted run turns
/// into a [`Skip`], so killed and never-started commands are not counted as
/// failures.
fn interruptible<T>(cmd: &ShellCommand, call: impl FnOnce() -> Result<T>) -> Result<T> {
    let interrupted = || anyhow::Error::from(Skip::new(t!("run_interrupted").to_string()));
    if cmd.is_cancelled() {
        return Err(interrupted());
    }
    call().map_err(|e| if cmd.is_cancelled() { interrupted() } else { e })
}

fn run_step_command(cmd: &ShellCommand, data: &TestData, can_fail: bool) -> Result<StepOutput> {
    if can_fail {
        let out = cmd.run_blocking(Some(data), None)?;
        if !out.success() {
            return Ok(StepOutput::Verdict(false));
        }
        return Ok(step_output(&out.stdout));
    }
    let out = cmd.run_checked(Some(data), None)?;
    Ok(step_output(&out.stdout))
}

/// Stdout holding a JSON object replaces the data state; anything else is ignored.
fn step_output(stdout: &str) -> StepOutput {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(Value::Object(map)) => StepOutput::Data(map),
        _ => StepOutput::Unit,
    }
}
