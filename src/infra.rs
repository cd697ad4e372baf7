//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Storm Runner,
//! including shell command execution, test data loading, logging setup and
//! i18n support.
//!
//! 此模块为 Storm Runner 提供基础设施服务，
//! 包括 shell 命令执行、测试数据加载、日志设置和国际化支持。

pub mod command;
pub mod fs;
pub mod logging;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
