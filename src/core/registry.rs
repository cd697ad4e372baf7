//! # Step/Case Registry / 步骤与用例注册表
//!
//! Explicit registration tables for lifecycle tests ([`StormTest`]) and
//! behavior specs ([`BehaviorSpec`]). Roles are attached by construction
//! rather than by tagging bare functions, and registration order is the
//! discovery order every engine follows.
//!
//! 生命周期测试（[`StormTest`]）和行为规格（[`BehaviorSpec`]）的显式注册表。
//! 角色在构造时附加，而不是给裸函数打标记；注册顺序即各引擎遵循的发现顺序。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::core::context::TestContext;
use crate::core::models::{Scenario, TestData};

/// A lifecycle hook. / 生命周期钩子。
pub type HookFn = Arc<dyn Fn(&mut TestContext) -> Result<()> + Send + Sync>;

/// A test case body. Receives the shared suite data when the suite has any.
/// 测试用例体。当套件有共享数据时接收该数据。
pub type CaseFn = Arc<dyn Fn(&mut TestContext, Option<&TestData>) -> Result<()> + Send + Sync>;

/// A Given/When/Then handler. Receives the current data state.
/// Given/When/Then 处理函数，接收当前数据状态。
pub type StepFn = Arc<dyn Fn(&TestData) -> Result<StepOutput> + Send + Sync>;

/// The role metadata a lifecycle callable can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    SetUp,
    TearDown,
    SetUpEach,
    TearDownEach,
}

/// One registered test case.
#[derive(Clone)]
pub struct CaseEntry {
    pub name: String,
    pub(crate) body: CaseFn,
}

impl fmt::Debug for CaseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A lifecycle test: optional hooks plus an ordered table of cases.
///
/// ```ignore
/// let test = StormTest::new("TestTheThing")
///     .set_up(|_| Ok(()))
///     .case("the thing works", |ctx, _data| {
///         ctx.validate("one plus one", 1 + 1 == 2, "arithmetic is broken");
///         Ok(())
///     });
/// ```
///
/// 生命周期测试：可选钩子加上有序的用例表。
#[derive(Clone, Default)]
pub struct StormTest {
    name: String,
    pub test_id: Option<String>,
    pub description: Option<String>,
    pub preconditions: Option<String>,
    pub postconditions: Option<String>,
    pub scenario: Option<Scenario>,
    set_up: Option<HookFn>,
    tear_down: Option<HookFn>,
    set_up_each: Option<HookFn>,
    tear_down_each: Option<HookFn>,
    cases: Vec<CaseEntry>,
}

impl StormTest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_test_id(mut self, id: impl Into<String>) -> Self {
        self.test_id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_conditions(
        mut self,
        preconditions: impl Into<String>,
        postconditions: impl Into<String>,
    ) -> Self {
        self.preconditions = Some(preconditions.into());
        self.postconditions = Some(postconditions.into());
        self
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = Some(scenario);
        self
    }

    /// Installs a hook. Installing the same kind again replaces the previous one.
    /// 安装一个钩子。再次安装同类钩子会替换之前的钩子。
    pub fn hook<F>(mut self, kind: HookKind, hook: F) -> Self
    where
        F: Fn(&mut TestContext) -> Result<()> + Send + Sync + 'static,
    {
        let hook: HookFn = Arc::new(hook);
        let slot = match kind {
            HookKind::SetUp => &mut self.set_up,
            HookKind::TearDown => &mut self.tear_down,
            HookKind::SetUpEach => &mut self.set_up_each,
            HookKind::TearDownEach => &mut self.tear_down_each,
        };
        *slot = Some(hook);
        self
    }

    pub fn set_up<F>(self, hook: F) -> Self
    where
        F: Fn(&mut TestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.hook(HookKind::SetUp, hook)
    }

    pub fn tear_down<F>(self, hook: F) -> Self
    where
        F: Fn(&mut TestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.hook(HookKind::TearDown, hook)
    }

    pub fn set_up_each<F>(self, hook: F) -> Self
    where
        F: Fn(&mut TestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.hook(HookKind::SetUpEach, hook)
    }

    pub fn tear_down_each<F>(self, hook: F) -> Self
    where
        F: Fn(&mut TestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.hook(HookKind::TearDownEach, hook)
    }

    /// Registers a test case. A second registration under the same name is ignored.
    /// 注册一个测试用例。同名的第二次注册会被忽略。
    pub fn case<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestContext, Option<&TestData>) -> Result<()> + Send + Sync + 'static,
    {
        self.push_case(name.into(), Arc::new(body));
        self
    }

    /// Expands one parameterized case into a case per data row, named
    /// `"<base> - <row-id>"`. Each body call receives its row and the suite data.
    ///
    /// 将一个参数化用例展开为每个数据行一个用例，命名为 `"<base> - <row-id>"`。
    pub fn iter_case<I, K, F>(mut self, base: &str, rows: I, body: F) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: fmt::Display,
        F: Fn(&mut TestContext, &Value, Option<&TestData>) -> Result<()> + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        for (row_id, row) in rows {
            let body = Arc::clone(&body);
            let case: CaseFn = Arc::new(move |ctx: &mut TestContext, data: Option<&TestData>| {
                body(ctx, &row, data)
            });
            self.push_case(format!("{base} - {row_id}"), case);
        }
        self
    }

    fn push_case(&mut self, name: String, body: CaseFn) {
        if self.cases.iter().any(|c| c.name == name) {
            tracing::debug!(test = %self.name, case = %name, "case already registered, ignoring");
            return;
        }
        self.cases.push(CaseEntry { name, body });
    }

    pub fn cases(&self) -> &[CaseEntry] {
        &self.cases
    }

    pub fn hook_fn(&self, kind: HookKind) -> Option<&HookFn> {
        match kind {
            HookKind::SetUp => self.set_up.as_ref(),
            HookKind::TearDown => self.tear_down.as_ref(),
            HookKind::SetUpEach => self.set_up_each.as_ref(),
            HookKind::TearDownEach => self.tear_down_each.as_ref(),
        }
    }
}

impl fmt::Debug for StormTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StormTest")
            .field("name", &self.name)
            .field("test_id", &self.test_id)
            .field("cases", &self.cases)
            .finish_non_exhaustive()
    }
}

/// Gherkin role of a behavior step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GherkinRole {
    Given,
    When,
    Then,
}

impl GherkinRole {
    pub fn keyword(self) -> &'static str {
        match self {
            GherkinRole::Given => "GIVEN",
            GherkinRole::When => "WHEN",
            GherkinRole::Then => "THEN",
        }
    }
}

impl fmt::Display for GherkinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// What a step handler hands back to the engine.
/// 步骤处理函数返回给引擎的内容。
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    /// Nothing to report; the data state is unchanged and the verdict is truthy.
    Unit,
    /// The next data state.
    Data(TestData),
    /// An explicit verdict, mostly returned by THEN steps.
    Verdict(bool),
}

impl From<()> for StepOutput {
    fn from(_: ()) -> Self {
        StepOutput::Unit
    }
}

impl From<bool> for StepOutput {
    fn from(verdict: bool) -> Self {
        StepOutput::Verdict(verdict)
    }
}

impl From<TestData> for StepOutput {
    fn from(data: TestData) -> Self {
        StepOutput::Data(data)
    }
}

/// A Given/When/Then step: its role, display name, exclusions and handler.
/// 一个 Given/When/Then 步骤：角色、显示名称、互斥关系和处理函数。
#[derive(Clone)]
pub struct GherkinStep {
    pub role: GherkinRole,
    /// Rendered name, e.g. `GIVEN a logged in user`.
    pub name: String,
    /// Rendered names of steps this one must never be combined with.
    pub skip_with: Vec<String>,
    /// A falsy verdict downgrades to SKIPPED instead of FAIL.
    pub can_fail: bool,
    pub(crate) handler: StepFn,
}

impl GherkinStep {
    pub fn new<F, O>(role: GherkinRole, name: &str, handler: F) -> Self
    where
        F: Fn(&TestData) -> Result<O> + Send + Sync + 'static,
        O: Into<StepOutput>,
    {
        Self {
            role,
            name: step_name(role, name),
            skip_with: Vec::new(),
            can_fail: false,
            handler: Arc::new(move |data: &TestData| handler(data).map(Into::into)),
        }
    }

    /// Checks whether either step declared the other as mutually exclusive.
    /// 检查任一步骤是否声明了与另一步骤互斥。
    pub fn excludes(&self, other: &GherkinStep) -> bool {
        self.skip_with.iter().any(|n| *n == other.name)
            || other.skip_with.iter().any(|n| *n == self.name)
    }
}

impl fmt::Debug for GherkinStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GherkinStep")
            .field("role", &self.role)
            .field("name", &self.name)
            .field("skip_with", &self.skip_with)
            .field("can_fail", &self.can_fail)
            .finish_non_exhaustive()
    }
}

/// Renders `GIVEN set_up_user` as `GIVEN set up user`. A name that already
/// starts with the role keyword is kept as is.
pub fn step_name(role: GherkinRole, name: &str) -> String {
    let name = name.trim().replace('_', " ");
    let keyword = role.keyword();
    if name.starts_with(&format!("{keyword} ")) {
        name
    } else {
        format!("{keyword} {name}")
    }
}

/// How a behavior spec is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioMode {
    /// Every compatible (Given, When) pair, each followed by its THEN steps.
    #[default]
    DecisionMatrix,
    /// Every step once, in role order, as a single scenario.
    Linear,
}

/// A behavior spec: ordered Given, When and Then tables.
///
/// 行为规格：有序的 Given、When 和 Then 步骤表。
#[derive(Clone, Default)]
pub struct BehaviorSpec {
    name: String,
    pub mode: ScenarioMode,
    givens: Vec<GherkinStep>,
    whens: Vec<GherkinStep>,
    thens: Vec<GherkinStep>,
}

impl BehaviorSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_mode(mut self, mode: ScenarioMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn given<F, O>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&TestData) -> Result<O> + Send + Sync + 'static,
        O: Into<StepOutput>,
    {
        self.step(GherkinStep::new(GherkinRole::Given, name, handler))
    }

    pub fn when<F, O>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&TestData) -> Result<O> + Send + Sync + 'static,
        O: Into<StepOutput>,
    {
        self.step(GherkinStep::new(GherkinRole::When, name, handler))
    }

    pub fn then<F, O>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&TestData) -> Result<O> + Send + Sync + 'static,
        O: Into<StepOutput>,
    {
        self.step(GherkinStep::new(GherkinRole::Then, name, handler))
    }

    /// Registers a prebuilt step. A step with the same role and name is only
    /// registered once.
    pub fn step(mut self, step: GherkinStep) -> Self {
        let table = self.table_mut(step.role);
        if table.iter().any(|s| s.name == step.name) {
            tracing::debug!(step = %step.name, "step already registered, ignoring");
        } else {
            table.push(step);
        }
        self
    }

    /// Marks the most recently registered step of `role` as can-fail.
    pub fn can_fail(mut self, role: GherkinRole) -> Self {
        if let Some(step) = self.table_mut(role).last_mut() {
            step.can_fail = true;
        }
        self
    }

    /// Declares the last registered step of `role` mutually exclusive with
    /// the step named `other` (`"GIVEN ..."`, `"WHEN ..."` or `"THEN ..."`).
    ///
    /// 声明 `role` 最后注册的步骤与名为 `other` 的步骤互斥。
    pub fn skip_with(mut self, role: GherkinRole, other: &str) -> Self {
        let other = other.trim().replace('_', " ");
        if let Some(step) = self.table_mut(role).last_mut() {
            if !step.skip_with.contains(&other) {
                step.skip_with.push(other);
            }
        }
        self
    }

    /// `(step, excluded name)` pairs whose excluded name matches no
    /// registered step, typically a name missing its role keyword.
    pub fn unmatched_exclusions(&self) -> Vec<(String, String)> {
        let all = || self.givens.iter().chain(&self.whens).chain(&self.thens);
        all()
            .flat_map(|step| step.skip_with.iter().map(move |other| (step, other)))
            .filter(|(_, other)| !all().any(|s| s.name == **other))
            .map(|(step, other)| (step.name.clone(), other.clone()))
            .collect()
    }

    pub fn steps(&self, role: GherkinRole) -> &[GherkinStep] {
        match role {
            GherkinRole::Given => &self.givens,
            GherkinRole::When => &self.whens,
            GherkinRole::Then => &self.thens,
        }
    }

    fn table_mut(&mut self, role: GherkinRole) -> &mut Vec<GherkinStep> {
        match role {
            GherkinRole::Given => &mut self.givens,
            GherkinRole::When => &mut self.whens,
            GherkinRole::Then => &mut self.thens,
        }
    }
}

impl fmt::Debug for BehaviorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorSpec")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("givens", &self.givens)
            .field("whens", &self.whens)
            .field("thens", &self.thens)
            .finish()
    }
}
