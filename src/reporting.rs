//! # Reporting Module / 报告模块
//!
//! This module defines the [`Reporter`] interface notified at lifecycle
//! checkpoints, together with the console, HTML and result-submission sinks.
//! Reporters observe a run; nothing in the engine depends on them for
//! correctness, so every hook call is best-effort.
//!
//! 此模块定义了在生命周期检查点被通知的 [`Reporter`] 接口，
//! 以及控制台、HTML 和结果提交等输出端。
//! 报告器只观察运行过程，引擎的正确性不依赖于它们，因此每次钩子调用都是尽力而为的。

pub mod console;
pub mod html;
pub mod submission;

use anyhow::Result;
use std::panic::{self, AssertUnwindSafe};

use crate::core::aggregator::SuiteReport;
use crate::core::error::panic_message;
use crate::core::models::{Step, TestCaseRecord};

// Re-export common reporting functions
pub use console::{ConsoleReporter, print_failure_details, print_summary};
pub use html::generate_html_report;

/// Sink notified before and after runs, tests and steps.
/// All hooks are no-ops by default.
///
/// Hooks may be called concurrently from several workers, and the order in
/// which different tests complete is unspecified.
///
/// 在运行、测试和步骤前后被通知的输出端。所有钩子默认不执行任何操作。
/// 钩子可能被多个工作线程并发调用，不同测试完成的顺序是不确定的。
pub trait Reporter: Send + Sync {
    /// Called once per suite, before its units start. A run over several
    /// suites calls it once for each of them.
    ///
    /// 每个套件调用一次，在其单元开始之前。多个套件的运行会为每个套件各调用一次。
    fn before_run(&self, _suite: &str) -> Result<()> {
        Ok(())
    }

    /// Called once per suite with that suite's report.
    fn after_run(&self, _report: &SuiteReport) -> Result<()> {
        Ok(())
    }

    fn before_test(&self, _case: &TestCaseRecord) -> Result<()> {
        Ok(())
    }

    fn after_test(&self, _case: &TestCaseRecord) -> Result<()> {
        Ok(())
    }

    fn before_step(&self, _step: &Step) -> Result<()> {
        Ok(())
    }

    fn after_step(&self, _step: &Step) -> Result<()> {
        Ok(())
    }
}

/// A reporter that ignores every hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Calls one reporter hook, logging and swallowing both errors and panics.
/// 调用一个报告器钩子，记录并吞掉错误和 panic。
pub(crate) fn notify<F>(hook: &'static str, call: F)
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(hook, error = %e, "reporter hook failed"),
        Err(payload) => tracing::warn!(
            hook,
            error = %panic_message(payload.as_ref()),
            "reporter hook panicked"
        ),
    }
}
