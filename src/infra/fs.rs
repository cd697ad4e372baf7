//! # File System Operations Module / 文件系统操作模块
//!
//! Loading test data from JSON files and resolving paths relative to the
//! configuration file.
//!
//! 从 JSON 文件加载测试数据，并解析相对于配置文件的路径。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::ConfigError;
use crate::core::models::TestData;

/// Reads a JSON object from `path` as test data.
///
/// # Errors
/// Fails if the file cannot be read, is not JSON, or holds anything other
/// than a top-level object.
pub fn load_test_data(path: &Path) -> Result<TestData> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read test data file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test data file: {}", path.display()))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ConfigError::TestDataNotObject {
            path: path.display().to_string(),
        }
        .into()),
    }
}

/// Overlays `overlay` onto `base`; keys from `overlay` win.
pub fn merge_test_data(mut base: TestData, overlay: TestData) -> TestData {
    for (key, value) in overlay {
        if base.contains_key(&key) {
            tracing::warn!(%key, "test data key overwritten by data file");
        }
        base.insert(key, value);
    }
    base
}

/// Resolves `path` against `base_dir` unless it is already absolute.
pub fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
