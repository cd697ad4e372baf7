//! # Command Execution Module / 命令执行模块
//!
//! Runs the shell commands behind config-defined hooks, cases and steps.
//! Commands are expanded, split into arguments, spawned with their output
//! captured, and given the current test data through the environment.
//!
//! 运行配置中定义的钩子、用例和步骤背后的 shell 命令。
//! 命令会被展开、拆分为参数，在捕获输出的情况下启动，并通过环境变量获得当前测试数据。

use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::core::models::TestData;
use crate::infra::t;

/// Environment variable carrying the current test data as a JSON object.
pub const TEST_DATA_ENV: &str = "STORM_TEST_DATA";
/// Environment variable carrying an iterated case's row as JSON.
pub const ROW_DATA_ENV: &str = "STORM_ROW_DATA";

/// A shell command bound to the directory it runs in.
/// 绑定到运行目录的 shell 命令。
#[derive(Debug, Clone)]
pub struct ShellCommand {
    line: String,
    working_dir: PathBuf,
    cancel: Option<CancellationToken>,
}

/// What a finished command left behind.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Interleaved stdout and stderr lines.
    pub output: String,
    /// Stdout only, used when a step hands back a new data state.
    pub stdout: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

impl ShellCommand {
    pub fn new(line: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            line: line.into(),
            working_dir: working_dir.into(),
            cancel: None,
        }
    }

    /// Kills the running child once `token` is cancelled, and refuses to
    /// spawn after that.
    ///
    /// `token` 被取消后终止正在运行的子进程，并拒绝再启动新进程。
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Expands `$VARS` and `~`, then splits the line shell-style.
    ///
    /// Unknown variables and the runner's own `STORM_*` variables are left
    /// untouched, so `sh -c 'echo "$STORM_TEST_DATA"'` sees the child's value.
    ///
    /// 展开 `$VARS` 和 `~`，然后按 shell 规则拆分命令行。
    /// 未知变量和运行器自己的 `STORM_*` 变量保持原样。
    pub fn parse(&self) -> Result<Vec<String>> {
        let expanded = shellexpand::env_with_context_no_errors(&self.line, |var: &str| {
            if var.starts_with("STORM_") {
                None
            } else {
                std::env::var(var).ok()
            }
        });
        let expanded = shellexpand::tilde(&expanded).to_string();
        let parts = shlex::split(&expanded)
            .ok_or_else(|| anyhow!("Failed to parse command: {}", expanded))?;
        if parts.is_empty() {
            bail!("Empty command after parsing: '{}'", self.line);
        }
        Ok(parts)
    }

    /// Spawns the command and waits for it, exporting `data` (and `row`, for
    /// iterated cases) as JSON environment variables.
    pub async fn run(&self, data: Option<&TestData>, row: Option<&serde_json::Value>) -> Result<CommandOutput> {
        let parts = self.parse()?;
        if self.is_cancelled() {
            bail!("Command cancelled before it started: {}", self.line);
        }
        let mut cmd = tokio::process::Command::new(&parts[0]);
        cmd.args(&parts[1..])
            .kill_on_drop(true)
            .current_dir(&self.working_dir);
        if let Some(data) = data {
            cmd.env(TEST_DATA_ENV, serde_json::to_string(data)?);
        }
        if let Some(row) = row {
            cmd.env(ROW_DATA_ENV, serde_json::to_string(row)?);
        }

        let (status, output, stdout) = spawn_and_capture(cmd, self.cancel.as_ref()).await;
        let status = status.with_context(|| format!("Failed to run command: {}", self.line))?;
        Ok(CommandOutput {
            status,
            output,
            stdout,
        })
    }

    /// Runs the command from synchronous code on a runtime worker thread
    /// (hooks, case bodies and steps are synchronous).
    ///
    /// 从运行时工作线程上的同步代码中运行命令（钩子、用例体和步骤都是同步的）。
    pub fn run_blocking(&self, data: Option<&TestData>, row: Option<&serde_json::Value>) -> Result<CommandOutput> {
        let handle = tokio::runtime::Handle::try_current()
            .context("shell commands must run inside a Tokio runtime")?;
        handle.block_on(self.run(data, row))
    }

    /// Runs the command and turns a non-zero exit into an error carrying the output.
    pub fn run_checked(&self, data: Option<&TestData>, row: Option<&serde_json::Value>) -> Result<CommandOutput> {
        let result = self.run_blocking(data, row)?;
        if result.success() {
            tracing::debug!(command = %self.line, "command succeeded");
            Ok(result)
        } else {
            bail!(
                "{}\n{}",
                t!("command_failed", command = &self.line, status = result.status),
                result.output.trim_end()
            )
        }
    }
}

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
/// When `cancel` fires first, the child is killed and reaped, and the status
/// is an `Interrupted` error.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
/// - The stdout alone.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
    cancel: Option<&CancellationToken>,
) -> (std::io::Result<ExitStatus>, String, String) {
    let mut child = match cmd
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new(), String::new()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other(t!("capture_output_failed").to_string())),
            String::new(),
            String::new(),
        );
    };

    // Both readers append to the combined log; stdout is also kept on its own.
    // 两个读取任务都追加到合并日志；stdout 也会单独保留。
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(async move {
        let mut own = String::new();
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stdout_output.lock().await;
            output.push_str(&line);
            output.push('\n');
            own.push_str(&line);
            own.push('\n');
        }
        own
    });

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stderr_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let status = match cancel {
        Some(token) => tokio::select! {
            status = child.wait() => status,
            _ = token.cancelled() => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill cancelled command");
                }
                Err(std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "command cancelled",
                ))
            }
        },
        None => child.wait().await,
    };

    let stdout_only = match stdout_handle.await {
        Ok(own) => own,
        Err(e) => {
            tracing::warn!(error = %e, "failed to join stdout reader");
            String::new()
        }
    };
    if let Err(e) = stderr_handle.await {
        tracing::warn!(error = %e, "failed to join stderr reader");
    }

    let combined = output.lock().await.clone();
    (status, combined, stdout_only)
}
