//! # Parallel Executor / 并行执行器
//!
//! Dispatches runnable units to a bounded pool of blocking workers and
//! collects their records. Every dispatch receives its own copy of the shared
//! data, and results come back in submission order whatever order the workers
//! finish in.
//!
//! 将可运行单元分派到有界的阻塞工作线程池并收集其记录。
//! 每次分派都会获得共享数据的独立副本，无论工作线程以何种顺序完成，结果都按提交顺序返回。

use futures::{StreamExt, stream};
use std::sync::Arc;
use tracing::{debug, error};

use crate::core::error::ExecutorError;
use crate::core::models::{TestData, TestRecord, UnitKind};
use crate::reporting::Reporter;

/// A unit of work the executor can dispatch: a lifecycle test or a behavior spec.
///
/// Implementations must be self-contained. The only inputs are the copied
/// shared data and the reporter.
///
/// 执行器可以分派的工作单元：生命周期测试或行为规格。
pub trait Runnable: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> UnitKind;

    fn run(&self, data: Option<&TestData>, reporter: Arc<dyn Reporter>) -> TestRecord;
}

/// Default number of workers: one, i.e. sequential unless raised.
pub const DEFAULT_JOBS: usize = 1;

#[derive(Debug, Clone, Copy)]
pub struct ParallelExecutor {
    jobs: usize,
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_JOBS)
    }
}

impl ParallelExecutor {
    /// Creates an executor with `jobs` workers. Zero is treated as one.
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.max(1) }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Runs every unit and waits for all of them.
    ///
    /// There is no per-unit timeout: a unit that never returns stalls the
    /// whole batch. A worker that panics outside the engines' own phase
    /// isolation surfaces as an [`ExecutorError`] in that unit's slot.
    ///
    /// 运行所有单元并等待全部完成。没有单元级超时：永不返回的单元会阻塞整个批次。
    pub async fn run(
        &self,
        units: &[Arc<dyn Runnable>],
        data: Option<&TestData>,
        reporter: Arc<dyn Reporter>,
    ) -> Vec<Result<TestRecord, ExecutorError>> {
        if units.is_empty() {
            debug!("no units to dispatch");
            return Vec::new();
        }

        let dispatches = units.iter().cloned().enumerate().map(|(index, unit)| {
            let data = data.cloned();
            let reporter = Arc::clone(&reporter);
            async move {
                let name = unit.name().to_string();
                debug!(unit = %name, index, "dispatching unit");
                let outcome =
                    tokio::task::spawn_blocking(move || unit.run(data.as_ref(), reporter))
                        .await
                        .map_err(|e| ExecutorError::from_join(name, e));
                if let Err(e) = &outcome {
                    error!(error = %e, "worker did not return a record");
                }
                (index, outcome)
            }
        });

        let mut results: Vec<_> = stream::iter(dispatches)
            .buffer_unordered(self.jobs)
            .collect()
            .await;

        // Completion order is arbitrary; restore submission order.
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
