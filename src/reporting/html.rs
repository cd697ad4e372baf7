//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders a [`RunSummary`] as a standalone HTML page with summary
//! statistics, one table per suite and collapsible case, step and error details.
//!
//! 此模块将 [`RunSummary`] 渲染为独立的 HTML 页面，包含汇总统计、
//! 每个套件一张表格，以及可折叠的用例、步骤和错误详情。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::aggregator::{RunSummary, SuiteReport};
use crate::core::models::{Status, TestRecord};
use crate::infra::t;
use crate::reporting::console::status_label;

const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292e; }
h1 { border-bottom: 1px solid #e1e4e8; padding-bottom: .3em; }
.summary-container { display: flex; gap: 1em; margin-bottom: 2em; }
.summary-item { border: 1px solid #e1e4e8; border-radius: 6px; padding: 1em 2em; text-align: center; }
.count { display: block; font-size: 2em; font-weight: bold; }
table { border-collapse: collapse; width: 100%; margin-bottom: 2em; }
th, td { border: 1px solid #e1e4e8; padding: .5em; text-align: left; vertical-align: top; }
.status-pass { color: #22863a; font-weight: bold; }
.status-fail { color: #cb2431; font-weight: bold; }
.status-skipped { color: #b08800; font-weight: bold; }
.status-not-run, .status-in-progress { color: #6a737d; }
pre { white-space: pre-wrap; margin: 0; }
details summary { cursor: pointer; }
"#;

fn status_class(status: Status) -> &'static str {
    match status {
        Status::Pass => "status-pass",
        Status::Fail => "status-fail",
        Status::Skipped => "status-skipped",
        Status::InProgress => "status-in-progress",
        Status::NotRun => "status-not-run",
    }
}

/// Renders the report page. Text is escaped by `maud`.
/// 渲染报告页面。文本由 `maud` 转义。
pub fn render_html_report(summary: &RunSummary, locale: &str) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                div class="summary-container" {
                    (summary_item(summary.total(), &t!("html_report.summary.total", locale = locale), ""))
                    (summary_item(summary.passed(), &t!("html_report.summary.passed", locale = locale), "status-pass"))
                    (summary_item(summary.failed(), &t!("html_report.summary.failed", locale = locale), "status-fail"))
                    (summary_item(summary.skipped(), &t!("html_report.summary.skipped", locale = locale), "status-skipped"))
                }
                @for suite in &summary.suites {
                    (suite_table(suite, locale))
                }
            }
        }
    }
}

fn summary_item(count: usize, label: &str, class: &str) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
        }
    }
}

fn suite_table(suite: &SuiteReport, locale: &str) -> Markup {
    html! {
        h2 {
            (suite.name) " "
            span class=(status_class(suite.status)) { (status_label(suite.status, locale)) }
        }
        table {
            thead {
                tr {
                    th { (t!("html_report.table.header.name", locale = locale)) }
                    th { (t!("html_report.table.header.status", locale = locale)) }
                    th { (t!("html_report.table.header.duration", locale = locale)) }
                    th { (t!("html_report.table.header.details", locale = locale)) }
                }
            }
            tbody {
                @for record in &suite.records {
                    (record_row(record, locale))
                }
            }
        }
    }
}

fn record_row(record: &TestRecord, locale: &str) -> Markup {
    html! {
        tr {
            td {
                (record.name)
                @if let Some(id) = &record.test_id {
                    " (" (id) ")"
                }
            }
            td class=(status_class(record.status)) { (status_label(record.status, locale)) }
            td { (format!("{:.2}s", record.duration.as_secs_f64())) }
            td {
                @for error in &record.errors {
                    pre class="status-fail" { (error) }
                }
                @if !record.cases.is_empty() {
                    details open[record.is_failure()] {
                        summary { (t!("html_report.toggle_output", locale = locale)) }
                        ul {
                            @for case in &record.cases {
                                li {
                                    span class=(status_class(case.status)) { (status_label(case.status, locale)) }
                                    " "
                                    pre { (case.name) }
                                    @if let Some(error) = &case.error {
                                        pre { (error) }
                                    }
                                    @if !case.steps.is_empty() {
                                        ul {
                                            @for step in &case.steps {
                                                li {
                                                    span class=(status_class(step.status)) { (status_label(step.status, locale)) }
                                                    " " (step.name)
                                                    @if let Some(error) = &step.error {
                                                        " : " (error)
                                                    }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Generates an HTML report from a run summary and writes it to `output_path`.
///
/// 从运行摘要生成 HTML 报告并写入 `output_path`。
///
/// # Errors / 错误
/// Fails when the file cannot be written.
pub fn generate_html_report(summary: &RunSummary, output_path: &Path, locale: &str) -> Result<()> {
    let page = render_html_report(summary, locale);
    fs::write(output_path, page.into_string())
        .with_context(|| format!("Failed to write HTML report: {}", output_path.display()))?;
    Ok(())
}
