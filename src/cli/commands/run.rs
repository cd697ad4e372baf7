//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command: load `Storm.toml`, build the
//! suites, run them with live console output, then print the summary and
//! write the optional HTML report and results file.
//!
//! 此模块实现 `run` 命令：加载 `Storm.toml`，构建套件，带实时控制台输出运行它们，
//! 然后打印摘要，并写入可选的 HTML 报告和结果文件。

use anyhow::{Context, Result};
use colored::*;
use std::{fs, path::Path, path::PathBuf, sync::Arc};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{self, StormConfig},
        suite::StormRunner,
    },
    infra::{logging, t},
    reporting::{
        ConsoleReporter, generate_html_report, print_failure_details, print_summary,
        submission::{JsonFileSink, ResultSink, build_submission},
    },
};

/// Arguments of the `run` command.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub config: PathBuf,
    pub jobs: Option<usize>,
    pub html: Option<PathBuf>,
    pub submit: Option<PathBuf>,
    pub author_id: Option<u64>,
    pub show_steps: bool,
    /// Explicit `--lang`; otherwise the config's language is used.
    pub language: Option<String>,
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// An error when the config cannot be loaded or when any unit failed.
pub async fn execute(args: RunArgs) -> Result<()> {
    let (storm_config, config_path) = setup_and_parse_config(&args.config)?;
    let locale = args
        .language
        .clone()
        .unwrap_or_else(|| crate::resolve_locale(&storm_config.language));
    rust_i18n::set_locale(&locale);

    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Some(log_path) = logging::init(&storm_config.logging, &base_dir)? {
        println!(
            "{}",
            t!("log_file_created", locale = &locale, path = log_path.display())
        );
    }

    println!(
        "{}",
        t!("loading_config", locale = &locale, path = config_path.display())
    );

    let stop_token = setup_signal_handler(&locale);
    let suites = storm_config
        .build_suites_with_cancellation(&base_dir, &stop_token)
        .with_context(|| t!("suite_build_failed", locale = &locale).to_string())?;
    if suites.is_empty() {
        println!("{}", t!("no_suites_to_run", locale = &locale).green());
        return Ok(());
    }

    let jobs = args.jobs.unwrap_or(storm_config.jobs);
    println!(
        "{}",
        t!("running_with_jobs", locale = &locale, jobs = jobs).cyan()
    );

    let reporter = ConsoleReporter::new(locale.as_str()).with_steps(args.show_steps);
    let mut runner = StormRunner::new(suites)
        .with_jobs(jobs)
        .with_reporter(Arc::new(reporter));

    // Ctrl-C kills running children and skips the rest; the run is still awaited.
    let summary = runner.run_tests(None).await;

    print_summary(&summary, &locale);

    if stop_token.is_cancelled() {
        anyhow::bail!(t!("run_interrupted", locale = &locale).to_string());
    }

    if let Some(report_path) = &args.html {
        println!(
            "\n{}",
            t!("generating_html_report", locale = &locale, path = report_path.display())
        );
        if let Err(e) = generate_html_report(&summary, report_path, &locale) {
            eprintln!("{} {:#}", t!("html_report_failed", locale = &locale).red(), e);
        }
    }

    if let Some(results_path) = &args.submit {
        let records = build_submission(&summary, args.author_id);
        JsonFileSink::new(results_path)
            .submit(&records)
            .with_context(|| t!("submit_failed", locale = &locale).to_string())?;
        println!(
            "{}",
            t!("results_written", locale = &locale, count = records.len(), path = results_path.display())
        );
    }

    if summary.has_failures() {
        print_failure_details(&summary, &locale);
        anyhow::bail!(t!("tests_failed", locale = &locale, count = summary.failed()).to_string());
    }

    println!("\n{}", t!("all_tests_passed", locale = &locale).green().bold());
    Ok(())
}

/// Sets up and parses the configuration file.
fn setup_and_parse_config(config_path_arg: &Path) -> Result<(StormConfig, PathBuf)> {
    // The config's own language is not known yet.
    let locale = rust_i18n::locale().to_string();
    let config_path = fs::canonicalize(config_path_arg).with_context(|| {
        t!("config_read_failed_path", locale = &locale, path = config_path_arg.display()).to_string()
    })?;

    let storm_config = config::load_config(&config_path)
        .with_context(|| t!("config_parse_failed", locale = &locale).to_string())?;

    Ok((storm_config, config_path))
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
                token_clone.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    token
}
