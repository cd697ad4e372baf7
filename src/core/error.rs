//! # Error Taxonomy / 错误分类
//!
//! Typed failures raised while running units. Phase and step failures are
//! recovered into record statuses; only configuration errors reach the caller.
//!
//! 运行执行单元时产生的类型化错误。阶段和步骤失败会被恢复为记录状态；
//! 只有配置错误会返回给调用方。

use std::any::Any;
use std::fmt;
use thiserror::Error;

/// The lifecycle phase a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SetUp,
    TearDown,
    SetUpEach,
    TearDownEach,
    Body,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::SetUp => "set up",
            Phase::TearDown => "tear down",
            Phase::SetUpEach => "set up each",
            Phase::TearDownEach => "tear down each",
            Phase::Body => "body",
        };
        f.write_str(name)
    }
}

/// A hook or body failed, either by returning an error or by panicking.
/// 钩子或测试体失败（返回错误或发生 panic）。
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("{phase} failed: {message}")]
    Returned { phase: Phase, message: String },
    #[error("{phase} panicked: {message}")]
    Panicked { phase: Phase, message: String },
}

impl PhaseError {
    /// Gets the bare message without the phase prefix.
    pub fn message(&self) -> &str {
        match self {
            PhaseError::Returned { message, .. } | PhaseError::Panicked { message, .. } => message,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            PhaseError::Returned { phase, .. } | PhaseError::Panicked { phase, .. } => *phase,
        }
    }
}

/// A dispatch unit never produced a record.
/// 调度单元未能产生记录。
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("worker for '{name}' panicked: {message}")]
    WorkerPanicked { name: String, message: String },
    #[error("worker for '{name}' was cancelled")]
    WorkerCancelled { name: String },
}

impl ExecutorError {
    pub fn unit_name(&self) -> &str {
        match self {
            ExecutorError::WorkerPanicked { name, .. } | ExecutorError::WorkerCancelled { name } => {
                name
            }
        }
    }

    pub(crate) fn from_join(name: String, error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            ExecutorError::WorkerPanicked {
                name,
                message: panic_message(error.into_panic().as_ref()),
            }
        } else {
            ExecutorError::WorkerCancelled { name }
        }
    }
}

/// Configuration could not be turned into runnable suites.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`jobs` must be at least 1")]
    InvalidJobs,
    #[error("duplicate suite name '{0}'")]
    DuplicateSuite(String),
    #[error("test '{test}' has a case with an empty name")]
    EmptyCaseName { test: String },
    #[error("test data file {path} must contain a JSON object")]
    TestDataNotObject { path: String },
}

/// Marker error: a case body returning it is recorded SKIPPED instead of FAIL.
///
/// ```ignore
/// return Err(Skip::new("backend not reachable").into());
/// ```
#[derive(Debug, Clone, Error)]
#[error("skipped: {reason}")]
pub struct Skip {
    pub reason: String,
}

impl Skip {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Extracts a readable message from a panic payload.
/// 从 panic 负载中提取可读消息。
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
