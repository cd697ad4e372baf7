//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures shared by the lifecycle controller,
//! the behavior-driven engine, the executor and the reporters. It includes the
//! status state machine, step and case records, scenarios and unit records.
//!
//! 此模块定义了生命周期控制器、行为驱动引擎、执行器和报告器共享的核心数据结构。
//! 它包括状态机、步骤与用例记录、场景以及执行单元记录。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// The opaque key/value bag handed from a suite to every case and step.
/// 从套件传递给每个用例和步骤的不透明键值数据包。
pub type TestData = serde_json::Map<String, Value>;

/// Execution status of a step, a case, a scenario or a whole unit.
///
/// `NotRun -> InProgress -> {Pass, Fail, Skipped}`; the last three are terminal.
///
/// 步骤、用例、场景或整个执行单元的执行状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    NotRun,
    InProgress,
    Pass,
    Fail,
    Skipped,
}

impl Status {
    /// Returns `true` for `Pass`, `Fail` and `Skipped`.
    /// 对于 `Pass`、`Fail` 和 `Skipped` 返回 `true`。
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Pass | Status::Fail | Status::Skipped)
    }

    pub fn is_failure(self) -> bool {
        self == Status::Fail
    }

    /// Combines two outcomes. A failure dominates, a pass outranks a skip,
    /// and a skip only survives when both sides were skipped.
    ///
    /// 合并两个结果。失败优先，通过高于跳过，只有双方都跳过时结果才为跳过。
    pub fn and(self, other: Status) -> Status {
        match (self, other) {
            (Status::Fail, _) | (_, Status::Fail) => Status::Fail,
            (Status::Skipped, Status::Skipped) => Status::Skipped,
            (Status::Skipped, other) => other,
            (this, Status::Skipped) => this,
            (Status::Pass, Status::Pass) => Status::Pass,
            (Status::NotRun, _) | (_, Status::NotRun) => Status::NotRun,
            _ => Status::InProgress,
        }
    }

    /// Rolls a sequence of statuses up with [`Status::and`].
    /// An empty sequence rolls up to `Pass`.
    pub fn rollup<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        let mut iter = statuses.into_iter();
        match iter.next() {
            Some(first) => iter.fold(first, Status::and),
            None => Status::Pass,
        }
    }

    /// Strict verdict over a set of outcomes: `Pass` only when every member
    /// passed, `Fail` when any failed, `Skipped` otherwise.
    ///
    /// 严格判定：全部通过才为 `Pass`，任一失败为 `Fail`，其余为 `Skipped`。
    pub fn strict<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        let mut verdict = Status::Pass;
        for status in statuses {
            match status {
                Status::Fail => return Status::Fail,
                Status::Pass => {}
                _ => verdict = Status::Skipped,
            }
        }
        verdict
    }

    /// Gets the display label, e.g. `PASS`.
    pub fn label(self) -> &'static str {
        match self {
            Status::NotRun => "NOT_RUN",
            Status::InProgress => "IN_PROGRESS",
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One recorded checkpoint: a soft validation inside a classic test body,
/// or one Given/When/Then execution in a behavior scenario.
///
/// 一个已记录的检查点：经典测试体中的软校验，或行为场景中一次 Given/When/Then 的执行。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub status: Status,
    /// Optional value produced by the step (e.g. the data state it returned).
    /// 步骤产生的可选值（例如它返回的数据状态）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::NotRun,
            artifact: None,
            error: None,
        }
    }

    pub fn passed(name: impl Into<String>, artifact: Option<Value>) -> Self {
        Self {
            status: Status::Pass,
            artifact,
            ..Self::new(name)
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            error: Some(error.into()),
            ..Self::new(name)
        }
    }
}

/// The record of one test method (or one iterated row) within a unit.
/// 执行单元中一个测试方法（或一个迭代数据行）的记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseRecord {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub duration: Duration,
}

impl TestCaseRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::NotRun,
            error: None,
            steps: Vec::new(),
            duration: Duration::ZERO,
        }
    }
}

/// Natural-language description of one behavior combination.
/// 一个行为组合的自然语言描述。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub given: String,
    pub when: String,
    pub then: String,
}

impl Scenario {
    pub fn new(given: impl Into<String>, when: impl Into<String>, then: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            when: when.into(),
            then: then.into(),
        }
    }

    /// Joins the three parts into one sentence, e.g.
    /// `GIVEN a user WHEN they log in THEN they see the dashboard`.
    pub fn narrative(&self) -> String {
        [self.given.as_str(), self.when.as_str(), self.then.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.narrative())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub status: Status,
    /// Set when the engine could not evaluate the scenario normally.
    /// 当引擎无法正常评估场景时设置。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// Which engine produced a [`TestRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// A lifecycle test (set up, cases, tear down). / 生命周期测试。
    Lifecycle,
    /// A behavior spec evaluated by the decision-matrix engine. / 行为规格。
    Behavior,
}

/// The record produced by one dispatch unit: a registered test with its cases,
/// or a behavior spec with its scenarios.
///
/// `status` is the logical AND of every phase and case outcome in the unit.
///
/// 一个调度单元产生的记录：带有用例的已注册测试，或带有场景的行为规格。
/// `status` 是该单元中所有阶段和用例结果的逻辑与。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    pub kind: UnitKind,
    /// External identifier, e.g. the case id in a test-management system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    pub status: Status,
    /// Errors from unit-level phases (set up, tear down) or the worker itself.
    /// 来自单元级阶段（set up、tear down）或工作线程本身的错误。
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub cases: Vec<TestCaseRecord>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioResult>,
    #[serde(default)]
    pub duration: Duration,
}

impl TestRecord {
    pub fn new(name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            name: name.into(),
            kind,
            test_id: None,
            status: Status::NotRun,
            errors: Vec::new(),
            cases: Vec::new(),
            scenarios: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Builds the FAIL record standing in for a unit whose worker never returned.
    /// 为工作线程未返回的单元构建替代的 FAIL 记录。
    pub fn worker_failure(name: impl Into<String>, kind: UnitKind, error: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            errors: vec![error.into()],
            ..Self::new(name, kind)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Gets the first error attached to the unit or to any of its cases.
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .first()
            .map(String::as_str)
            .or_else(|| self.cases.iter().find_map(|case| case.error.as_deref()))
    }
}
