//! Pool state file
//!
//! The file holds the configuration and the full `PoolState` as JSON. Writes
//! go to a sibling temp file first and are renamed over the original, so a
//! crash never leaves a half-written pool behind.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use twamm::{PoolConfig, PoolState, TwammPool};

#[derive(Serialize, Deserialize)]
struct PoolFile {
    config: PoolConfig,
    state: PoolState,
}

pub fn load_pool(path: &Path) -> Result<TwammPool> {
    if !path.exists() {
        anyhow::bail!(
            "Pool state not found: {}\n\
             Create one with: twamm init",
            path.display()
        );
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pool state: {}", path.display()))?;
    let file: PoolFile = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse pool state: {}", path.display()))?;

    TwammPool::from_parts(file.config, file.state)
        .with_context(|| format!("Invalid pool config in: {}", path.display()))
}

pub fn save_pool(path: &Path, pool: &TwammPool) -> Result<()> {
    let file = PoolFile {
        config: pool.config().clone(),
        state: pool.state().clone(),
    };
    let data = serde_json::to_string_pretty(&file).context("Failed to serialize pool state")?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).with_context(|| format!("Failed to write: {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace: {}", path.display()))?;

    log::debug!("saved pool state to {}", path.display());
    Ok(())
}

/// Load, apply `operation`, and save only if it succeeded
pub fn update_pool<T>(path: &Path, operation: impl FnOnce(&mut TwammPool) -> Result<T>) -> Result<T> {
    let mut pool = load_pool(path)?;
    let output = operation(&mut pool)?;
    save_pool(path, &pool)?;
    Ok(output)
}
