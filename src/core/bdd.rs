//! # Behavior Decision-Matrix Engine / 行为决策矩阵引擎
//!
//! Evaluates a [`BehaviorSpec`]: every compatible (Given, When) pair is run
//! against a fresh copy of the input data, followed by every THEN step that is
//! not excluded by either of them. Each pair yields one [`ScenarioResult`]
//! with a readable narrative.
//!
//! 评估一个 [`BehaviorSpec`]：每个兼容的 (Given, When) 组合都在输入数据的新副本上运行，
//! 随后运行未被二者排除的每个 THEN 步骤。每个组合产生一个带有可读叙述的 [`ScenarioResult`]。

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::error::Phase;
use crate::core::executor::Runnable;
use crate::core::lifecycle::{PhaseOutcome, run_phase};
use crate::core::models::{
    Scenario, ScenarioResult, Status, Step, TestCaseRecord, TestData, TestRecord, UnitKind,
};
use crate::core::registry::{BehaviorSpec, GherkinRole, GherkinStep, ScenarioMode, StepOutput};
use crate::reporting::{Reporter, notify};

/// One evaluated scenario together with the case record reported for it.
#[derive(Debug, Clone)]
pub struct Evaluated {
    pub result: ScenarioResult,
    pub case: TestCaseRecord,
}

pub struct DecisionMatrix<'a> {
    spec: &'a BehaviorSpec,
    reporter: Arc<dyn Reporter>,
}

impl<'a> DecisionMatrix<'a> {
    pub fn new(spec: &'a BehaviorSpec, reporter: Arc<dyn Reporter>) -> Self {
        Self { spec, reporter }
    }

    /// Evaluates every (Given, When) pair that is not skip-paired.
    ///
    /// 评估每个未被互斥配对排除的 (Given, When) 组合。
    pub fn run_decision_matrix(&self, data: Option<&TestData>) -> Vec<Evaluated> {
        let initial = data.cloned().unwrap_or_default();
        let mut evaluated = Vec::new();

        for (step, other) in self.spec.unmatched_exclusions() {
            debug!(spec = %self.spec.name(), %step, skip_with = %other, "exclusion matches no step");
        }

        for given in self.spec.steps(GherkinRole::Given) {
            for when in self.spec.steps(GherkinRole::When) {
                if given.excludes(when) {
                    debug!(given = %given.name, when = %when.name, "skip-paired, not evaluated");
                    continue;
                }
                evaluated.push(self.evaluate_pair(given, when, &initial));
            }
        }
        evaluated
    }

    fn evaluate_pair(&self, given: &GherkinStep, when: &GherkinStep, initial: &TestData) -> Evaluated {
        let started = Instant::now();
        let mut case = TestCaseRecord::new(format!("{} {}", given.name, when.name));
        case.status = Status::InProgress;
        notify("before_test", || self.reporter.before_test(&case));

        let mut state = initial.clone();
        let given_step = self.execute(given, &mut state);
        let when_step = self.execute(when, &mut state);

        let then_steps: Vec<Step> = self
            .spec
            .steps(GherkinRole::Then)
            .iter()
            .filter(|then| !then.excludes(given) && !then.excludes(when))
            .map(|then| self.execute(then, &mut state.clone()))
            .collect();

        let mut diagnostic = None;
        let status = if then_steps.is_empty() {
            let message = format!(
                "no eligible THEN step for '{}' / '{}'",
                given.name, when.name
            );
            warn!(spec = %self.spec.name(), "{message}");
            diagnostic = Some(message);
            Status::Skipped
        } else {
            Status::strict(
                [given_step.status, when_step.status]
                    .into_iter()
                    .chain(then_steps.iter().map(|s| s.status)),
            )
        };

        let scenario = Scenario::new(&given_step.name, &when_step.name, then_narrative(&then_steps));
        let mut steps = vec![given_step, when_step];
        steps.extend(then_steps);

        self.finish(scenario, status, diagnostic, case, steps, started)
    }

    /// Runs every GIVEN, then every WHEN, then every THEN once, threading the
    /// data state through all of them, and reports a single scenario.
    ///
    /// 依次运行每个 GIVEN、每个 WHEN 和每个 THEN 各一次，数据状态贯穿其中，报告单个场景。
    pub fn run_scenario(&self, data: Option<&TestData>) -> Evaluated {
        let started = Instant::now();
        let mut case = TestCaseRecord::new(self.spec.name());
        case.status = Status::InProgress;
        notify("before_test", || self.reporter.before_test(&case));

        let mut state = data.cloned().unwrap_or_default();
        let mut parts = Vec::with_capacity(3);
        let mut steps = Vec::new();
        for role in [GherkinRole::Given, GherkinRole::When, GherkinRole::Then] {
            let executed: Vec<Step> = self
                .spec
                .steps(role)
                .iter()
                .map(|step| self.execute(step, &mut state))
                .collect();
            parts.push(join_role(role, &executed));
            steps.extend(executed);
        }

        let mut diagnostic = None;
        let mut status = Status::strict(steps.iter().map(|s| s.status));
        if self.spec.steps(GherkinRole::Then).is_empty() {
            diagnostic = Some(format!("'{}' has no THEN step", self.spec.name()));
            status = Status::strict([status, Status::Skipped]);
        }

        let mut parts = parts.into_iter();
        let scenario = Scenario::new(
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
        );
        self.finish(scenario, status, diagnostic, case, steps, started)
    }

    fn finish(
        &self,
        scenario: Scenario,
        status: Status,
        diagnostic: Option<String>,
        mut case: TestCaseRecord,
        steps: Vec<Step>,
        started: Instant,
    ) -> Evaluated {
        case.name = scenario.narrative();
        case.status = status;
        case.error = steps
            .iter()
            .find(|s| s.status.is_failure())
            .and_then(|s| s.error.as_ref().map(|e| format!("{}: {e}", s.name)))
            .or_else(|| diagnostic.clone());
        case.steps = steps;
        case.duration = started.elapsed();
        notify("after_test", || self.reporter.after_test(&case));

        Evaluated {
            result: ScenarioResult {
                scenario,
                status,
                diagnostic,
            },
            case,
        }
    }

    /// Executes one step against `state` and records its verdict.
    ///
    /// An error or panic is FAIL. A `false` verdict is FAIL, or SKIPPED on a
    /// can-fail step. Anything else is PASS; returned data becomes the next state.
    fn execute(&self, step: &GherkinStep, state: &mut TestData) -> Step {
        let mut record = Step::new(&step.name);
        record.status = Status::InProgress;
        notify("before_step", || self.reporter.before_step(&record));

        let mut output = None;
        let outcome = run_phase(Phase::Body, || {
            output = Some((step.handler)(state)?);
            Ok(())
        });

        match outcome {
            PhaseOutcome::Failed(e) => {
                record.status = Status::Fail;
                record.error = Some(e.message().to_string());
            }
            PhaseOutcome::Skipped(reason) => {
                record.status = Status::Skipped;
                record.error = Some(format!("skipped: {reason}"));
            }
            PhaseOutcome::Done => match output {
                Some(StepOutput::Verdict(false)) if step.can_fail => {
                    record.status = Status::Skipped;
                    record.artifact = Some(Value::Bool(false));
                }
                Some(StepOutput::Verdict(false)) => {
                    record.status = Status::Fail;
                    record.artifact = Some(Value::Bool(false));
                    record.error = Some("step returned false".to_string());
                }
                Some(StepOutput::Verdict(true)) => {
                    record.status = Status::Pass;
                    record.artifact = Some(Value::Bool(true));
                }
                Some(StepOutput::Data(next)) => {
                    record.status = Status::Pass;
                    record.artifact = Some(Value::Object(next.clone()));
                    *state = next;
                }
                Some(StepOutput::Unit) | None => record.status = Status::Pass,
            },
        }

        notify("after_step", || self.reporter.after_step(&record));
        record
    }
}

/// Builds the THEN narrative: the first name as is, each further one on a new
/// line with its `THEN` keyword replaced by `AND`.
///
/// 构建 THEN 叙述：第一个名称保持不变，后续名称另起一行并将 `THEN` 替换为 `AND`。
pub fn then_narrative(steps: &[Step]) -> String {
    join_role(GherkinRole::Then, steps)
}

fn join_role(role: GherkinRole, steps: &[Step]) -> String {
    let keyword = role.keyword();
    let mut text = String::new();
    for (i, step) in steps.iter().enumerate() {
        if i == 0 {
            text.push_str(&step.name);
        } else {
            let rest = step.name.strip_prefix(keyword).unwrap_or(&step.name);
            text.push_str("\nAND");
            if !rest.starts_with(' ') {
                text.push(' ');
            }
            text.push_str(rest);
        }
    }
    text
}

impl Runnable for BehaviorSpec {
    fn name(&self) -> &str {
        BehaviorSpec::name(self)
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Behavior
    }

    fn run(&self, data: Option<&TestData>, reporter: Arc<dyn Reporter>) -> TestRecord {
        let started = Instant::now();
        let mut record = TestRecord::new(self.name(), UnitKind::Behavior);
        record.status = Status::InProgress;
        info!(spec = %self.name(), mode = ?self.mode, "running behavior spec");

        let engine = DecisionMatrix::new(self, reporter);
        let evaluated = match self.mode {
            ScenarioMode::DecisionMatrix => engine.run_decision_matrix(data),
            ScenarioMode::Linear => vec![engine.run_scenario(data)],
        };

        for Evaluated { result, case } in evaluated {
            record.scenarios.push(result);
            record.cases.push(case);
        }
        record.status = Status::rollup(record.scenarios.iter().map(|s| s.status));
        record.duration = started.elapsed();

        info!(
            spec = %self.name(),
            scenarios = record.scenarios.len(),
            status = %record.status,
            "finished behavior spec"
        );
        record
    }
}
