//! # Result Submission Module / 结果提交模块
//!
//! Turns a run summary into per-unit result records shaped for a test
//! management system's bulk-results endpoint, and hands them to a
//! [`ResultSink`]. The bundled sink writes them to a JSON file as
//! `{"results": [...]}`.
//!
//! 将运行摘要转换为适用于测试管理系统批量结果接口的逐单元结果记录，
//! 并交给 [`ResultSink`]。内置的输出端将其以 `{"results": [...]}` 形式写入 JSON 文件。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::aggregator::RunSummary;
use crate::core::models::{Status, TestData, TestRecord};

/// Identifies a unit that has no case id yet, so the receiving system can create it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseInfo {
    pub title: String,
    pub suite_title: String,
}

/// One step of a submitted result: a case of the unit, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionStep {
    pub position: usize,
    pub action: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<CaseInfo>,
    pub status: String,
    /// Duration in milliseconds.
    pub time: u64,
    pub defect: bool,
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub param: TestData,
    pub steps: Vec<SubmissionStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<u64>,
}

fn submission_status(status: Status) -> &'static str {
    match status {
        Status::Pass => "passed",
        Status::Fail => "failed",
        Status::Skipped | Status::NotRun | Status::InProgress => "skipped",
    }
}

fn to_submission(suite: &str, record: &TestRecord, author_id: Option<u64>) -> SubmissionRecord {
    let case = match record.test_id {
        Some(_) => None,
        None => Some(CaseInfo {
            title: record.name.clone(),
            suite_title: suite.to_string(),
        }),
    };
    let passed = record.cases.iter().filter(|c| c.status == Status::Pass).count();
    let steps = record
        .cases
        .iter()
        .enumerate()
        .map(|(i, c)| SubmissionStep {
            position: i + 1,
            action: c.name.clone(),
            status: submission_status(c.status).to_string(),
            comment: c.error.clone(),
        })
        .collect();

    SubmissionRecord {
        case_id: record.test_id.clone(),
        case,
        status: submission_status(record.status).to_string(),
        time: u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
        defect: false,
        attachments: Vec::new(),
        stacktrace: record.first_error().map(str::to_string),
        comment: Some(format!("{passed}/{} cases passed", record.cases.len())),
        param: TestData::new(),
        steps,
        author_id,
    }
}

/// Builds one submission record per unit of the run, in report order.
/// 为运行中的每个单元构建一条提交记录，按报告顺序排列。
pub fn build_submission(summary: &RunSummary, author_id: Option<u64>) -> Vec<SubmissionRecord> {
    summary
        .records()
        .map(|(suite, record)| to_submission(&suite.name, record, author_id))
        .collect()
}

/// Destination for submission records.
pub trait ResultSink {
    fn submit(&self, records: &[SubmissionRecord]) -> Result<()>;
}

#[derive(Serialize)]
struct BulkPayload<'a> {
    results: &'a [SubmissionRecord],
}

/// Writes records to a JSON file in bulk-payload form.
/// 以批量负载形式将记录写入 JSON 文件。
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonFileSink {
    fn submit(&self, records: &[SubmissionRecord]) -> Result<()> {
        let payload = serde_json::to_string_pretty(&BulkPayload { results: records })?;
        fs::write(&self.path, payload)
            .with_context(|| format!("Failed to write results file: {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), results = records.len(), "submitted results");
        Ok(())
    }
}
