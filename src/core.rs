//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Storm Runner: the step and
//! case registry, the lifecycle controller, the behavior-driven decision
//! matrix, the parallel executor and the result aggregation.
//!
//! 此模块包含 Storm Runner 的核心功能：步骤与用例注册表、生命周期控制器、
//! 行为驱动决策矩阵、并行执行器以及结果聚合。

pub mod aggregator;
pub mod bdd;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod models;
pub mod registry;
pub mod suite;

// Re-exports
pub use aggregator::{RunSummary, SuiteReport};
pub use config::StormConfig;
pub use context::TestContext;
pub use error::{ConfigError, ExecutorError, PhaseError, Skip};
pub use executor::{ParallelExecutor, Runnable};
pub use models::{Status, TestCaseRecord, TestData, TestRecord};
pub use registry::{BehaviorSpec, GherkinRole, GherkinStep, ScenarioMode, StormTest};
pub use suite::{StormRunner, TestSuite};
