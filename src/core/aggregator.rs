//! # Result Aggregator / 结果聚合器
//!
//! Turns the executor's result sequence into suite reports: executor errors
//! become distinct FAIL records, statuses roll up per suite, and the summary
//! renders as suite, unit, case and step lines.
//!
//! 将执行器的结果序列转换为套件报告：执行器错误成为独立的 FAIL 记录，
//! 状态按套件汇总，摘要按套件、单元、用例和步骤逐行呈现。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::error;

use crate::core::error::ExecutorError;
use crate::core::models::{Status, TestRecord, UnitKind};

/// The rolled-up outcome of one suite run.
/// 一次套件运行的汇总结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub name: String,
    pub status: Status,
    pub records: Vec<TestRecord>,
    #[serde(default)]
    pub duration: Duration,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.count(Status::Pass)
    }

    pub fn failed(&self) -> usize {
        self.count(Status::Fail)
    }

    pub fn skipped(&self) -> usize {
        self.count(Status::Skipped)
    }

    fn count(&self, status: Status) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test result {}: {}", self.name, self.status)?;
        for record in &self.records {
            writeln!(f, "  {}: {}", record.name, record.status)?;
            for error in &record.errors {
                writeln!(f, "    ! {error}")?;
            }
            for case in &record.cases {
                writeln!(f, "    {}: {}", case.name.replace('\n', " "), case.status)?;
                for step in &case.steps {
                    writeln!(f, "      {}: {}", step.name, step.status)?;
                }
            }
        }
        Ok(())
    }
}

/// Unwraps executor results into records, in order.
///
/// `units` carries the name and kind of each dispatched unit so that a
/// worker failure can still be attributed to the right slot.
///
/// 按顺序将执行器结果展开为记录。
pub fn unwrap_results(
    units: &[(String, UnitKind)],
    results: Vec<Result<TestRecord, ExecutorError>>,
) -> Vec<TestRecord> {
    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "recording worker failure");
                let (name, kind) = units
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| (e.unit_name().to_string(), UnitKind::Lifecycle));
                TestRecord::worker_failure(name, kind, e.to_string())
            }
        })
        .collect()
}

/// Builds the suite report. The suite status is the AND of every record.
pub fn aggregate(name: &str, records: Vec<TestRecord>, duration: Duration) -> SuiteReport {
    SuiteReport {
        name: name.to_string(),
        status: Status::rollup(records.iter().map(|r| r.status)),
        records,
        duration,
    }
}

/// Totals across every suite of a run.
/// 一次运行中所有套件的合计。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub suites: Vec<SuiteReport>,
}

impl RunSummary {
    pub fn status(&self) -> Status {
        Status::rollup(self.suites.iter().map(|s| s.status))
    }

    pub fn has_failures(&self) -> bool {
        self.suites.iter().any(|s| s.status.is_failure())
    }

    pub fn records(&self) -> impl Iterator<Item = (&SuiteReport, &TestRecord)> {
        self.suites
            .iter()
            .flat_map(|suite| suite.records.iter().map(move |record| (suite, record)))
    }

    pub fn total(&self) -> usize {
        self.suites.iter().map(|s| s.records.len()).sum()
    }

    pub fn passed(&self) -> usize {
        self.suites.iter().map(SuiteReport::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.suites.iter().map(SuiteReport::failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.suites.iter().map(SuiteReport::skipped).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for suite in &self.suites {
            write!(f, "{suite}")?;
        }
        Ok(())
    }
}
