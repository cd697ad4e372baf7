//! # Reporting Tests / 报告测试
//!
//! Reporter hook delivery, reporter fault tolerance, and the HTML and
//! submission outputs built from a run summary.
//!
//! 报告器钩子的投递、报告器容错，以及基于运行摘要生成的 HTML 和提交输出。

use anyhow::{Result, bail};
use std::sync::{Arc, Mutex};
use storm_runner::core::aggregator::{RunSummary, SuiteReport};
use storm_runner::core::models::{Status, Step, TestCaseRecord};
use storm_runner::core::registry::{BehaviorSpec, StormTest};
use storm_runner::core::suite::{StormRunner, TestSuite};
use storm_runner::reporting::Reporter;
use storm_runner::reporting::html::{generate_html_report, render_html_report};
use storm_runner::reporting::submission::{JsonFileSink, ResultSink, build_submission};
use tempfile::tempdir;

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn before_run(&self, suite: &str) -> Result<()> {
        self.push(format!("before_run {suite}"));
        Ok(())
    }

    fn after_run(&self, report: &SuiteReport) -> Result<()> {
        self.push(format!("after_run {} {}", report.name, report.status));
        Ok(())
    }

    fn before_test(&self, case: &TestCaseRecord) -> Result<()> {
        self.push(format!("before_test {}", case.name));
        Ok(())
    }

    fn after_test(&self, case: &TestCaseRecord) -> Result<()> {
        self.push(format!("after_test {} {}", case.name, case.status));
        Ok(())
    }

    fn after_step(&self, step: &Step) -> Result<()> {
        self.push(format!("after_step {}", step.name));
        Ok(())
    }
}

struct FailingReporter;

impl Reporter for FailingReporter {
    fn before_run(&self, _suite: &str) -> Result<()> {
        bail!("sink offline")
    }

    fn before_test(&self, _case: &TestCaseRecord) -> Result<()> {
        bail!("sink offline")
    }

    fn after_test(&self, _case: &TestCaseRecord) -> Result<()> {
        panic!("sink crashed")
    }

    fn after_step(&self, _step: &Step) -> Result<()> {
        panic!("sink crashed")
    }
}

fn sample_suite() -> TestSuite {
    TestSuite::new("Smoke")
        .with_test(
            StormTest::new("TestLogin")
                .with_test_id("C-7")
                .case("works", |ctx, _| {
                    ctx.step("logged in", None);
                    Ok(())
                }),
        )
        .with_test(StormTest::new("TestBroken").case("breaks", |_, _| bail!("it broke")))
        .with_test(
            BehaviorSpec::new("Spec")
                .given("g", |_| Ok(()))
                .when("w", |_| Ok(()))
                .then("t", |_| Ok(true)),
        )
}

async fn run_sample(reporter: Arc<dyn Reporter>) -> RunSummary {
    let mut runner = StormRunner::new(vec![sample_suite()])
        .with_jobs(1)
        .with_reporter(reporter);
    runner.run_tests(None).await
}

#[cfg(test)]
mod hook_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hooks_fire_around_runs_tests_and_steps() {
        let reporter = Arc::new(RecordingReporter::default());

        run_sample(reporter.clone()).await;
        let events = reporter.events();

        assert_eq!(events.first().map(String::as_str), Some("before_run Smoke"));
        assert_eq!(events.last().map(String::as_str), Some("after_run Smoke FAIL"));
        assert!(events.contains(&"before_test works".to_string()));
        assert!(events.contains(&"after_step logged in".to_string()));
        assert!(events.contains(&"after_test works PASS".to_string()));
        assert!(events.contains(&"after_test breaks FAIL".to_string()));
        assert!(events.contains(&"after_test GIVEN g WHEN w THEN t PASS".to_string()));
    }

    /// Sequential runs notify each case's start before its end.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_case_start_precedes_its_end() {
        let reporter = Arc::new(RecordingReporter::default());

        run_sample(reporter.clone()).await;
        let events = reporter.events();
        let position = |needle: &str| events.iter().position(|e| e == needle).unwrap();

        assert!(position("before_test works") < position("after_test works PASS"));
        assert!(position("before_test breaks") < position("after_test breaks FAIL"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_hooks_fire_once_per_suite() {
        let reporter = Arc::new(RecordingReporter::default());
        let other = TestSuite::new("Extra").with_test(StormTest::new("TestOk").case("ok", |_, _| Ok(())));
        let mut runner = StormRunner::new(vec![sample_suite(), other])
            .with_jobs(1)
            .with_reporter(reporter.clone());

        runner.run_tests(None).await;
        let run_events: Vec<_> = reporter
            .events()
            .into_iter()
            .filter(|e| e.contains("_run "))
            .collect();

        assert_eq!(
            run_events,
            vec![
                "before_run Smoke",
                "after_run Smoke FAIL",
                "before_run Extra",
                "after_run Extra PASS",
            ]
        );
    }

    #[test]
    fn test_skipped_set_up_still_pairs_case_notifications() {
        use storm_runner::core::error::Skip;
        use storm_runner::core::executor::Runnable;

        let reporter = Arc::new(RecordingReporter::default());
        let test = StormTest::new("TestOffline")
            .set_up(|_| Err(Skip::new("backend offline").into()))
            .case("first", |_, _| Ok(()))
            .case("second", |_, _| Ok(()));

        let record = test.run(None, reporter.clone());

        assert_eq!(record.status, Status::Skipped);
        assert_eq!(
            reporter.events(),
            vec![
                "before_test first",
                "after_test first SKIPPED",
                "before_test second",
                "after_test second SKIPPED",
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failing_reporter_does_not_change_results() {
        let quiet = run_sample(Arc::new(RecordingReporter::default())).await;
        let noisy = run_sample(Arc::new(FailingReporter)).await;

        let statuses = |summary: &RunSummary| {
            summary
                .records()
                .map(|(_, record)| record.status)
                .collect::<Vec<_>>()
        };
        assert_eq!(statuses(&quiet), statuses(&noisy));
        assert_eq!(
            statuses(&noisy),
            vec![Status::Pass, Status::Fail, Status::Pass]
        );
    }
}

#[cfg(test)]
mod output_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_html_report_lists_every_unit() {
        let summary = run_sample(Arc::new(RecordingReporter::default())).await;

        let page = render_html_report(&summary, "en").into_string();

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Storm Test Report"));
        assert!(page.contains("TestLogin (C-7)"));
        assert!(page.contains("TestBroken"));
        assert!(page.contains("it broke"));
        assert!(page.contains("status-fail"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_html_report_escapes_names() {
        let suite = TestSuite::new("Escaping")
            .with_test(StormTest::new("<script>alert(1)</script>").case("c", |_, _| Ok(())));
        let summary = StormRunner::new(vec![suite]).run_tests(None).await;

        let page = render_html_report(&summary, "en").into_string();

        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_html_report_is_written_to_disk() {
        let summary = run_sample(Arc::new(RecordingReporter::default())).await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.html");

        generate_html_report(&summary, &path, "zh-CN").unwrap();

        let page = std::fs::read_to_string(&path).unwrap();
        assert!(page.contains("TestBroken"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submission_records_follow_the_report() {
        let summary = run_sample(Arc::new(RecordingReporter::default())).await;

        let records = build_submission(&summary, Some(3));

        assert_eq!(records.len(), 3);

        assert_eq!(records[0].case_id.as_deref(), Some("C-7"));
        assert!(records[0].case.is_none());
        assert_eq!(records[0].status, "passed");
        assert_eq!(records[0].comment.as_deref(), Some("1/1 cases passed"));
        assert_eq!(records[0].author_id, Some(3));

        let broken = &records[1];
        assert_eq!(broken.status, "failed");
        assert_eq!(broken.case.as_ref().map(|c| c.suite_title.as_str()), Some("Smoke"));
        assert_eq!(broken.stacktrace.as_deref(), Some("it broke"));
        assert_eq!(broken.steps[0].action, "breaks");
        assert_eq!(broken.steps[0].position, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_json_sink_writes_bulk_payload() {
        let summary = run_sample(Arc::new(RecordingReporter::default())).await;
        let dir = tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("results.json"));

        sink.submit(&build_submission(&summary, None)).unwrap();

        let payload: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(sink.path()).unwrap()).unwrap();
        let results = payload["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].get("author_id").is_none());
        assert_eq!(results[1]["status"], "failed");
    }
}
