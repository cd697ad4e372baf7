//! # Suites and Runner / 套件与运行器
//!
//! A [`TestSuite`] groups runnable units with optional shared data; a
//! [`StormRunner`] runs its suites one after another through the
//! [`ParallelExecutor`] and collects a [`RunSummary`].
//!
//! [`TestSuite`] 将可运行单元与可选的共享数据组合在一起；
//! [`StormRunner`] 通过 [`ParallelExecutor`] 依次运行各个套件并收集 [`RunSummary`]。

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::core::aggregator::{RunSummary, SuiteReport, aggregate, unwrap_results};
use crate::core::executor::{ParallelExecutor, Runnable};
use crate::core::models::{TestData, TestRecord};
use crate::reporting::{NoopReporter, Reporter, notify};

/// Name of the suite wrapping loose tests handed straight to a runner.
pub const GENERIC_SUITE_NAME: &str = "Generic_Test_Suite";

pub struct TestSuite {
    name: String,
    units: Vec<Arc<dyn Runnable>>,
    test_data: Option<TestData>,
    results: Vec<TestRecord>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
            test_data: None,
            results: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_test<R>(mut self, unit: R) -> Self
    where
        R: Runnable + 'static,
    {
        self.units.push(Arc::new(unit));
        self
    }

    pub fn with_unit(mut self, unit: Arc<dyn Runnable>) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_units<I>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Runnable>>,
    {
        self.units.extend(units);
        self
    }

    pub fn with_test_data(mut self, data: TestData) -> Self {
        self.test_data = Some(data);
        self
    }

    pub fn units(&self) -> &[Arc<dyn Runnable>] {
        &self.units
    }

    pub fn test_data(&self) -> Option<&TestData> {
        self.test_data.as_ref()
    }

    /// Records of the most recent run. Empty until the suite has run.
    pub fn results(&self) -> &[TestRecord] {
        &self.results
    }

    /// Runs every unit and replaces `results` with this run's records.
    ///
    /// `data_override` takes precedence over the suite's own test data.
    ///
    /// 运行所有单元，并用本次运行的记录替换 `results`。
    pub async fn run(
        &mut self,
        executor: &ParallelExecutor,
        reporter: Arc<dyn Reporter>,
        data_override: Option<&TestData>,
    ) -> SuiteReport {
        info!(suite = %self.name, units = self.units.len(), jobs = executor.jobs(), "running test suite");
        notify("before_run", || reporter.before_run(&self.name));

        let started = Instant::now();
        let data = data_override.or(self.test_data.as_ref());
        let outcomes = executor.run(&self.units, data, Arc::clone(&reporter)).await;

        let descriptors: Vec<_> = self
            .units
            .iter()
            .map(|unit| (unit.name().to_string(), unit.kind()))
            .collect();
        self.results = unwrap_results(&descriptors, outcomes);

        let report = aggregate(&self.name, self.results.clone(), started.elapsed());
        info!(suite = %self.name, status = %report.status, "finished test suite");
        notify("after_run", || reporter.after_run(&report));
        report
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units: Vec<_> = self.units.iter().map(|u| u.name()).collect();
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("units", &units)
            .field("test_data", &self.test_data)
            .field("results", &self.results.len())
            .finish()
    }
}

/// Runs suites in order and collects their reports.
/// 按顺序运行套件并收集报告。
pub struct StormRunner {
    suites: Vec<TestSuite>,
    executor: ParallelExecutor,
    reporter: Arc<dyn Reporter>,
}

impl StormRunner {
    pub fn new(suites: Vec<TestSuite>) -> Self {
        Self {
            suites,
            executor: ParallelExecutor::default(),
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Wraps loose units into a single suite named [`GENERIC_SUITE_NAME`].
    pub fn with_tests<I>(units: I, data: Option<TestData>) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Runnable>>,
    {
        let mut suite = TestSuite::new(GENERIC_SUITE_NAME).with_units(units);
        suite.test_data = data;
        Self::new(vec![suite])
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.executor = ParallelExecutor::new(jobs);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn add_suite(&mut self, suite: TestSuite) {
        self.suites.push(suite);
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    /// Runs every suite. When `test_data` is given it overrides the data
    /// configured on each suite.
    ///
    /// 运行所有套件。若提供 `test_data`，它将覆盖每个套件配置的数据。
    pub async fn run_tests(&mut self, test_data: Option<TestData>) -> RunSummary {
        info!("starting test run");
        let mut summary = RunSummary::default();

        if self.suites.is_empty() {
            warn!("no test suites defined");
        }

        for suite in &mut self.suites {
            let report = suite
                .run(&self.executor, Arc::clone(&self.reporter), test_data.as_ref())
                .await;
            summary.suites.push(report);
        }

        info!(status = %summary.status(), "finished test run");
        summary
    }
}
