//! # Console Reporting Module / 控制台报告模块
//!
//! This module handles the display of test progress and reports in the console.
//! It provides a live [`ConsoleReporter`] plus functions for printing colorful,
//! formatted summaries with internationalization support.
//!
//! 此模块处理控制台中测试进度和报告的显示。
//! 它提供实时的 [`ConsoleReporter`]，以及打印彩色格式化摘要的函数，支持国际化。

use anyhow::Result;
use colored::*;

use crate::core::aggregator::{RunSummary, SuiteReport};
use crate::core::models::{Status, Step, TestCaseRecord, TestRecord};
use crate::infra::t;
use crate::reporting::Reporter;

/// Colors a status label the way every console line does.
/// 按控制台统一方式为状态标签着色。
pub fn colored_status(status: Status, locale: &str) -> ColoredString {
    let label = status_label(status, locale);
    match status {
        Status::Pass => label.green(),
        Status::Fail => label.red(),
        Status::Skipped => label.yellow(),
        Status::InProgress => label.cyan(),
        Status::NotRun => label.dimmed(),
    }
}

/// Localized status label. / 本地化的状态标签。
pub fn status_label(status: Status, locale: &str) -> String {
    match status {
        Status::Pass => t!("status.pass", locale = locale),
        Status::Fail => t!("status.fail", locale = locale),
        Status::Skipped => t!("status.skipped", locale = locale),
        Status::InProgress => t!("status.in_progress", locale = locale),
        Status::NotRun => t!("status.not_run", locale = locale),
    }
    .to_string()
}

/// Prints live progress lines as suites, cases and steps start and finish.
///
/// 在套件、用例和步骤开始与结束时打印实时进度行。
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    locale: String,
    show_steps: bool,
}

impl ConsoleReporter {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            show_steps: false,
        }
    }

    /// Also print one line per recorded step.
    pub fn with_steps(mut self, show_steps: bool) -> Self {
        self.show_steps = show_steps;
        self
    }
}

impl Reporter for ConsoleReporter {
    fn before_run(&self, suite: &str) -> Result<()> {
        println!(
            "\n{}",
            t!("running_suite", locale = &self.locale, name = suite).bold()
        );
        Ok(())
    }

    fn after_run(&self, report: &SuiteReport) -> Result<()> {
        println!(
            "{} {}",
            t!("suite_finished", locale = &self.locale, name = &report.name),
            colored_status(report.status, &self.locale)
        );
        Ok(())
    }

    fn before_test(&self, case: &TestCaseRecord) -> Result<()> {
        println!(
            "  {} {}",
            t!("test_started", locale = &self.locale).cyan(),
            one_line(&case.name)
        );
        Ok(())
    }

    fn after_test(&self, case: &TestCaseRecord) -> Result<()> {
        println!(
            "  [{}] {} ({:.2?})",
            colored_status(case.status, &self.locale),
            one_line(&case.name),
            case.duration
        );
        Ok(())
    }

    fn after_step(&self, step: &Step) -> Result<()> {
        if self.show_steps {
            println!(
                "      - {} {}",
                colored_status(step.status, &self.locale),
                step.name.dimmed()
            );
        }
        Ok(())
    }
}

fn one_line(name: &str) -> String {
    name.replace('\n', " ")
}

/// Prints a formatted summary of a run to the console.
///
/// 在控制台打印格式化的运行摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Test Summary ---
///   - PASS               | Smoke / TestTheThing                     |     12.30ms
///   - FAIL               | Smoke / TestOtherThing                   |      1.20s
///
/// Total: 2, passed: 1, failed: 1, skipped: 0
/// ```
pub fn print_summary(summary: &RunSummary, locale: &str) {
    println!("\n{}", t!("test_summary_banner", locale = locale).bold());

    for (suite, record) in summary.records() {
        let name = format!("{} / {}", suite.name, record.name);
        println!(
            "  - {:<18} | {:<40} | {:>10}",
            colored_status(record.status, locale),
            name,
            format!("{:.2?}", record.duration)
        );
    }

    println!(
        "\n{}",
        t!(
            "summary_totals",
            locale = locale,
            total = summary.total(),
            passed = summary.passed(),
            failed = summary.failed(),
            skipped = summary.skipped()
        )
    );
}

/// Prints the errors behind every failed unit, case and step.
///
/// 打印每个失败的单元、用例和步骤背后的错误。
pub fn print_failure_details(summary: &RunSummary, locale: &str) {
    let failures: Vec<&TestRecord> = summary
        .records()
        .map(|(_, record)| record)
        .filter(|record| record.is_failure())
        .collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, record) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report_header_failure", locale = locale).red(),
            record.name.cyan()
        );
        for error in &record.errors {
            println!("  {error}");
        }
        for case in record.cases.iter().filter(|c| c.status.is_failure()) {
            println!("  {} {}", "x".red(), one_line(&case.name));
            if let Some(error) = &case.error {
                for line in error.lines() {
                    println!("      {line}");
                }
            }
        }
        for scenario in record.scenarios.iter().filter(|s| s.status.is_failure()) {
            if let Some(diagnostic) = &scenario.diagnostic {
                println!("  {} {}", "!".yellow(), diagnostic);
            }
        }
        println!("{}", "-".repeat(80));
    }
}
