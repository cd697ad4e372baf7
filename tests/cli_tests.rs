//! # CLI Integration Tests / CLI 集成测试
//!
//! Runs the `storm-runner` binary against small `Storm.toml` files written
//! into temporary directories.
//!
//! 针对写入临时目录的小型 `Storm.toml` 文件运行 `storm-runner` 可执行文件。

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const PASSING: &str = r#"
jobs = 2

[[suites]]
name = "Smoke"
test_data = { env = "dev" }

[[suites.tests]]
name = "TestTrue"
cases = [{ name = "ok", command = "true" }]

[[suites.behaviors]]
name = "SpecTrue"
steps = [
    { role = "given", name = "g", command = "true" },
    { role = "when", name = "w", command = "true" },
    { role = "then", name = "t", command = "true" },
]
"#;

const FAILING: &str = r#"
[[suites]]
name = "Broken"

[[suites.tests]]
name = "TestFalse"
cases = [{ name = "nope", command = "false" }]
"#;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("Storm.toml");
    fs::write(&path, content).unwrap();
    path
}

fn storm() -> Command {
    let mut cmd = Command::cargo_bin("storm-runner").unwrap();
    cmd.arg("--lang").arg("en");
    cmd
}

/// A config whose commands all succeed exits zero and says so.
#[cfg(unix)]
#[test]
fn test_successful_run() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), PASSING);

    storm()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("TestTrue"))
        .stdout(predicate::str::contains("All tests passed!"));
}

/// A failing case makes the process exit non-zero and lists the failure.
#[cfg(unix)]
#[test]
fn test_failing_run() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), FAILING);

    storm()
        .arg("run")
        .arg("-c")
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::contains("TestFalse"))
        .stderr(predicate::str::contains("1 test unit(s) failed."));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempdir().unwrap();

    storm()
        .arg("run")
        .arg("--config")
        .arg(dir.path().join("nowhere.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_zero_jobs_is_rejected_by_the_parser() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), PASSING);

    storm()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--jobs")
        .arg("0")
        .assert()
        .failure();
}

#[cfg(unix)]
#[test]
fn test_jobs_flag_overrides_the_config() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), PASSING);

    storm()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--jobs")
        .arg("3")
        .assert()
        .success()
        .stdout(predicate::str::contains("Running with 3 parallel job(s)"));
}

#[test]
fn test_empty_config_has_nothing_to_run() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");

    storm()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to run"));
}

#[cfg(unix)]
#[test]
fn test_html_report_and_results_file_are_written() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), PASSING);
    let html = dir.path().join("report.html");
    let results = dir.path().join("results.json");

    storm()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--html")
        .arg(&html)
        .arg("--submit")
        .arg(&results)
        .arg("--author-id")
        .arg("7")
        .assert()
        .success();

    let page = fs::read_to_string(&html).unwrap();
    assert!(page.contains("Storm Test Report"));
    assert!(page.contains("TestTrue"));
    assert!(page.contains("SpecTrue"));

    let payload: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&results).unwrap()).unwrap();
    let records = payload["results"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["status"], "passed");
    assert_eq!(records[0]["case"]["suite_title"], "Smoke");
    assert_eq!(records[0]["author_id"], 7);
}

#[test]
fn test_init_non_interactive_writes_a_loadable_config() {
    let dir = tempdir().unwrap();

    storm()
        .current_dir(dir.path())
        .arg("init")
        .arg("--non-interactive")
        .assert()
        .success();

    let written = fs::read_to_string(dir.path().join("Storm.toml")).unwrap();
    let config = storm_runner::core::config::parse_config(&written).unwrap();
    assert!(!config.suites.is_empty());
    assert!(config.jobs >= 1);
}

#[test]
fn test_subcommand_is_required() {
    storm().assert().failure();
}

/// Ctrl-C kills the command that is running and skips the rest, so no child
/// process outlives the runner.
#[cfg(unix)]
#[test]
fn test_interrupt_kills_the_running_command() {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    const SLEEPING: &str = r#"
jobs = 1

[[suites]]
name = "Slow"

[[suites.tests]]
name = "TestSleeps"
cases = [
    { name = "sleeps", command = "sh sleeper.sh" },
    { name = "sleeps again", command = "sh sleeper.sh" },
]
"#;

    fn wait_for<T>(timeout: Duration, mut check: impl FnMut() -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(value) = check() {
                return Some(value);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        None
    }

    fn is_alive(pid: &str) -> bool {
        Command::new("kill")
            .arg("-0")
            .arg(pid)
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("sleeper.sh"),
        "echo $$ >> child.pid\nexec sleep 20\n",
    )
    .unwrap();
    let config = write_config(dir.path(), SLEEPING);

    let mut runner = storm()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let pid_file = dir.path().join("child.pid");
    let child_pid = wait_for(Duration::from_secs(10), || {
        let text = fs::read_to_string(&pid_file).ok()?;
        text.lines().next().map(|line| line.trim().to_string())
    })
    .expect("the first case never started");
    std::thread::sleep(Duration::from_millis(300));
    assert!(is_alive(&child_pid));

    let started = Instant::now();
    let sent = Command::new("kill")
        .arg("-INT")
        .arg(runner.id().to_string())
        .status()
        .unwrap();
    assert!(sent.success());

    let status = wait_for(Duration::from_secs(10), || runner.try_wait().unwrap());
    let Some(status) = status else {
        let _ = runner.kill();
        panic!("runner did not stop after SIGINT");
    };
    assert!(!status.success());
    assert!(started.elapsed() < Duration::from_secs(10));

    let output = runner.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Run interrupted"), "stderr: {stderr}");

    assert!(!is_alive(&child_pid), "child {child_pid} outlived the runner");
    // The second case never spawned its own sleeper.
    let pids = fs::read_to_string(&pid_file).unwrap();
    assert_eq!(pids.lines().count(), 1);
}
