//! # Lifecycle Controller / 生命周期控制器
//!
//! Drives one [`StormTest`] through `set_up`, every case (`set_up_each`,
//! body, `tear_down_each`) and `tear_down`. Failures are isolated per phase:
//! a failing hook or body is recorded and the controller moves on, so every
//! registered case always ends with a terminal status.
//!
//! 驱动一个 [`StormTest`] 依次经过 `set_up`、每个用例（`set_up_each`、测试体、
//! `tear_down_each`）和 `tear_down`。失败按阶段隔离：失败的钩子或测试体会被记录，
//! 控制器继续执行，因此每个注册的用例最终都会得到终止状态。

use anyhow::Result;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::core::context::TestContext;
use crate::core::error::{Phase, PhaseError, Skip, panic_message};
use crate::core::executor::Runnable;
use crate::core::models::{Status, TestCaseRecord, TestData, TestRecord, UnitKind};
use crate::core::registry::{CaseEntry, HookKind, StormTest};
use crate::reporting::{Reporter, notify};

/// How a single phase ended.
#[derive(Debug)]
pub(crate) enum PhaseOutcome {
    Done,
    Skipped(String),
    Failed(PhaseError),
}

/// Runs one phase, turning both returned errors and panics into a [`PhaseOutcome`].
/// 运行一个阶段，将返回的错误和 panic 都转换为 [`PhaseOutcome`]。
pub(crate) fn run_phase<F>(phase: Phase, call: F) -> PhaseOutcome
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => PhaseOutcome::Done,
        Ok(Err(e)) => match e.downcast_ref::<Skip>() {
            Some(skip) => PhaseOutcome::Skipped(skip.reason.clone()),
            None => PhaseOutcome::Failed(PhaseError::Returned {
                phase,
                message: format!("{e:#}"),
            }),
        },
        Err(payload) => PhaseOutcome::Failed(PhaseError::Panicked {
            phase,
            message: panic_message(payload.as_ref()),
        }),
    }
}

pub struct LifecycleController<'a> {
    test: &'a StormTest,
    reporter: Arc<dyn Reporter>,
}

impl<'a> LifecycleController<'a> {
    pub fn new(test: &'a StormTest, reporter: Arc<dyn Reporter>) -> Self {
        Self { test, reporter }
    }

    /// Runs the whole lifecycle and returns the populated unit record.
    ///
    /// A failing `set_up` marks the unit FAIL but does not skip any case.
    /// A failing `tear_down` marks the unit FAIL without touching the
    /// already-terminal case statuses.
    ///
    /// 运行完整的生命周期并返回填充好的单元记录。
    pub fn run(&self, data: Option<&TestData>) -> TestRecord {
        let started = Instant::now();
        let name = self.test.name();
        let mut record = TestRecord::new(name, UnitKind::Lifecycle);
        record.test_id = self.test.test_id.clone();
        record.cases = self
            .test
            .cases()
            .iter()
            .map(|case| TestCaseRecord::new(&case.name))
            .collect();
        record.status = Status::InProgress;

        info!(test = %name, cases = record.cases.len(), "running test item");

        let mut phase_status = Status::Pass;
        let mut skip_reason = None;

        match self.run_hook(HookKind::SetUp, Phase::SetUp, data) {
            PhaseOutcome::Done => {}
            PhaseOutcome::Skipped(reason) => {
                info!(test = %name, %reason, "set up requested skip");
                skip_reason = Some(reason);
            }
            PhaseOutcome::Failed(e) => {
                error!(test = %name, error = %e, "test setup failed");
                record.errors.push(e.to_string());
                phase_status = Status::Fail;
            }
        }

        for (entry, case) in self.test.cases().iter().zip(record.cases.iter_mut()) {
            match &skip_reason {
                Some(reason) => {
                    case.status = Status::InProgress;
                    notify("before_test", || self.reporter.before_test(case));
                    case.status = Status::Skipped;
                    case.error = Some(format!("skipped: {reason}"));
                    notify("after_test", || self.reporter.after_test(case));
                }
                None => self.run_case(entry, case, data),
            }
        }

        if let PhaseOutcome::Failed(e) = self.run_hook(HookKind::TearDown, Phase::TearDown, data) {
            error!(test = %name, error = %e, "test teardown failed");
            record.errors.push(e.to_string());
            phase_status = Status::Fail;
        }

        let case_statuses = record.cases.iter().map(|case| case.status);
        record.status = if skip_reason.is_some() && phase_status == Status::Pass {
            Status::Skipped
        } else {
            Status::rollup(std::iter::once(phase_status).chain(case_statuses))
        };
        record.duration = started.elapsed();

        info!(test = %name, status = %record.status, "finished test item");
        record
    }

    fn run_hook(&self, kind: HookKind, phase: Phase, data: Option<&TestData>) -> PhaseOutcome {
        let Some(hook) = self.test.hook_fn(kind) else {
            return PhaseOutcome::Done;
        };
        let mut ctx = TestContext::new(self.test.name(), Arc::clone(&self.reporter)).with_data(data);
        let outcome = run_phase(phase, || hook(&mut ctx));
        if !ctx.steps().is_empty() {
            warn!(
                test = %self.test.name(),
                %phase,
                steps = ctx.steps().len(),
                "steps recorded outside a case are discarded"
            );
        }
        outcome
    }

    fn run_case(&self, entry: &CaseEntry, case: &mut TestCaseRecord, data: Option<&TestData>) {
        let started = Instant::now();
        case.status = Status::InProgress;
        info!(test = %self.test.name(), case = %case.name, "running test case");
        notify("before_test", || self.reporter.before_test(case));

        let mut ctx = TestContext::new(self.test.name(), Arc::clone(&self.reporter)).with_data(data);
        let mut failure: Option<PhaseError> = None;
        let mut skipped: Option<String> = None;

        let set_up_each = match self.test.hook_fn(HookKind::SetUpEach) {
            Some(hook) => run_phase(Phase::SetUpEach, || hook(&mut ctx)),
            None => PhaseOutcome::Done,
        };

        match set_up_each {
            PhaseOutcome::Failed(e) => failure = Some(e),
            PhaseOutcome::Skipped(reason) => skipped = Some(reason),
            PhaseOutcome::Done => {
                match run_phase(Phase::Body, || (entry.body)(&mut ctx, data)) {
                    PhaseOutcome::Done => {}
                    PhaseOutcome::Skipped(reason) => skipped = Some(reason),
                    PhaseOutcome::Failed(e) => failure = Some(e),
                }

                // Cleanup runs whenever set up succeeded; the first failure wins.
                if let Some(hook) = self.test.hook_fn(HookKind::TearDownEach) {
                    if let PhaseOutcome::Failed(e) =
                        run_phase(Phase::TearDownEach, || hook(&mut ctx))
                    {
                        if failure.is_none() {
                            failure = Some(e);
                        } else {
                            warn!(case = %case.name, error = %e, "tear down each failed after an earlier failure");
                        }
                    }
                }
            }
        }

        case.steps = ctx.take_steps();
        case.duration = started.elapsed();

        if let Some(e) = failure {
            warn!(case = %case.name, error = %e, "test case failed");
            case.status = Status::Fail;
            case.error = Some(e.message().to_string());
        } else if let Some(reason) = skipped {
            case.status = Status::Skipped;
            case.error = Some(format!("skipped: {reason}"));
        } else if let Some(step) = case.steps.iter().find(|s| s.status.is_failure()) {
            case.status = Status::Fail;
            case.error = Some(format!(
                "validation '{}' failed: {}",
                step.name,
                step.error.as_deref().unwrap_or("no reason given")
            ));
        } else {
            case.status = Status::Pass;
        }

        notify("after_test", || self.reporter.after_test(case));
    }
}

impl Runnable for StormTest {
    fn name(&self) -> &str {
        StormTest::name(self)
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Lifecycle
    }

    fn run(&self, data: Option<&TestData>, reporter: Arc<dyn Reporter>) -> TestRecord {
        LifecycleController::new(self, reporter).run(data)
    }
}
