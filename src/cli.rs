//! # Command-Line Interface / 命令行接口
//!
//! Builds the `storm-runner` command tree and dispatches to the `run` and
//! `init` commands. The interface language is settled before the CLI is built
//! so that help texts are localized too.
//!
//! 构建 `storm-runner` 命令树并分派到 `run` 和 `init` 命令。
//! 界面语言在构建 CLI 之前确定，因此帮助文本也会被本地化。

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::t;

pub mod commands {
    pub mod init;
    pub mod run;
}

/// Finds an explicit `--lang <VALUE>` (or `--lang=<VALUE>`) on the command line.
fn explicit_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang="))
        .map(str::to_string)
}

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// Falls back to the system language.
///
/// 预解析命令行参数以找到语言设置，使 i18n 能在构建完整 CLI 之前初始化。
fn pre_parse_language() -> String {
    let requested = explicit_language()
        .or_else(sys_locale::get_locale)
        .unwrap_or_else(|| "en".to_string());
    crate::resolve_locale(&requested)
}

fn build_cli(locale: &str) -> Command {
    Command::new("storm-runner")
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cmd_run_about", locale = locale).to_string())
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("arg_config", locale = locale).to_string())
                        .value_name("CONFIG")
                        .default_value(DEFAULT_CONFIG_FILE)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("arg_jobs", locale = locale).to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("submit")
                        .long("submit")
                        .help(t!("arg_submit", locale = locale).to_string())
                        .value_name("RESULTS_JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("author-id")
                        .long("author-id")
                        .help(t!("arg_author_id", locale = locale).to_string())
                        .value_name("AUTHOR_ID")
                        .value_parser(clap::value_parser!(u64))
                        .requires("submit")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("steps")
                        .long("steps")
                        .help(t!("arg_steps", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn run_args(matches: &ArgMatches) -> commands::run::RunArgs {
    commands::run::RunArgs {
        config: matches
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        jobs: matches
            .get_one::<u64>("jobs")
            .map(|&jobs| usize::try_from(jobs).unwrap_or(usize::MAX)),
        html: matches.get_one::<PathBuf>("html").cloned(),
        submit: matches.get_one::<PathBuf>("submit").cloned(),
        author_id: matches.get_one::<u64>("author-id").copied(),
        show_steps: matches.get_flag("steps"),
        language: explicit_language().map(|lang| crate::resolve_locale(&lang)),
    }
}

/// Parses the command line and runs the selected command.
/// 解析命令行并运行所选命令。
pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let language = pre_parse_language();
    rust_i18n::set_locale(&language);

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(run_args(run_matches)).await?;
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");
            if explicit_language().is_none() {
                println!(
                    "{}",
                    t!("system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::run_init_wizard(&language, non_interactive)?;
        }
        // `subcommand_required` makes clap print help and exit first.
        _ => {}
    }
    Ok(())
}
