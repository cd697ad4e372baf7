//! Per-invocation context handed to hooks and case bodies.
//!
//! Each case gets a fresh [`TestContext`], so recorded steps never leak into
//! another case or another concurrently running unit.

use serde_json::Value;
use std::sync::Arc;

use crate::core::models::{Status, Step, TestData};
use crate::reporting::{NoopReporter, Reporter, notify};

pub struct TestContext {
    unit: String,
    steps: Vec<Step>,
    data: Option<TestData>,
    reporter: Arc<dyn Reporter>,
}

impl TestContext {
    pub fn new(unit: impl Into<String>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            unit: unit.into(),
            steps: Vec::new(),
            data: None,
            reporter,
        }
    }

    /// Attaches the data the current run was started with.
    pub fn with_data(mut self, data: Option<&TestData>) -> Self {
        self.data = data.cloned();
        self
    }

    /// The run's test data, also visible to hooks.
    /// 本次运行的测试数据，钩子同样可见。
    pub fn data(&self) -> Option<&TestData> {
        self.data.as_ref()
    }

    /// A context that reports nowhere, handy for calling bodies directly.
    pub fn detached(unit: impl Into<String>) -> Self {
        Self::new(unit, Arc::new(NoopReporter))
    }

    /// Name of the unit this context belongs to.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Records a soft assertion. The body keeps running either way, but a
    /// failed validation makes the case FAIL once the body returns.
    ///
    /// Returns `condition` so callers can branch on it.
    pub fn validate(&mut self, name: impl Into<String>, condition: bool, fail_msg: impl Into<String>) -> bool {
        let mut step = Step::new(name);
        self.begin(&step);
        if condition {
            step.status = Status::Pass;
        } else {
            step.status = Status::Fail;
            step.error = Some(fail_msg.into());
        }
        self.finish(step);
        condition
    }

    /// Records a passing checkpoint with an optional artifact.
    pub fn step(&mut self, name: impl Into<String>, artifact: Option<Value>) {
        let mut step = Step::new(name);
        self.begin(&step);
        step.status = Status::Pass;
        step.artifact = artifact;
        self.finish(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn has_failed_steps(&self) -> bool {
        self.steps.iter().any(|s| s.status.is_failure())
    }

    /// Hands the accumulated steps over, leaving the accumulator empty.
    pub fn take_steps(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.steps)
    }

    fn begin(&self, step: &Step) {
        let mut in_progress = step.clone();
        in_progress.status = Status::InProgress;
        notify("before_step", || self.reporter.before_step(&in_progress));
    }

    fn finish(&mut self, step: Step) {
        notify("after_step", || self.reporter.after_step(&step));
        self.steps.push(step);
    }
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("unit", &self.unit)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
