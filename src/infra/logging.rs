//! # Logging Setup / 日志设置
//!
//! Installs the global `tracing` subscriber: a console layer filtered by the
//! configured level, plus an optional file layer writing one log per run
//! (`storm_test_<YYYYmmddHHMMSS>.log`).
//!
//! 安装全局 `tracing` 订阅器：按配置级别过滤的控制台层，
//! 以及可选的文件层，每次运行写入一个日志文件。

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::core::config::LoggingConfig;

/// Builds the per-run log file name for `now`.
pub fn log_file_name(now: chrono::DateTime<Local>) -> String {
    format!("storm_test_{}.log", now.format("%Y%m%d%H%M%S"))
}

/// Installs the global subscriber. Returns the log file path when a log
/// directory is configured.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this twice
/// is harmless; the second call leaves the first subscriber in place.
///
/// 安装全局订阅器。配置了日志目录时返回日志文件路径。
pub fn init(config: &LoggingConfig, base_dir: &Path) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, log_path) = match &config.directory {
        Some(dir) => {
            let dir = crate::infra::fs::resolve(base_dir, dir);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let path = dir.join(log_file_name(Local::now()));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let layer = fmt::layer().with_ansi(false).with_writer(Arc::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
    if installed.is_err() {
        tracing::debug!("a global subscriber is already installed");
    }
    Ok(log_path)
}
