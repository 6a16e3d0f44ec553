use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

pub fn file_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Format a filesystem timestamp the way the history table shows it.
pub fn format_generated_on(at: SystemTime) -> String {
    let local: DateTime<Local> = at.into();
    local.format("%d/%m/%Y %H:%M").to_string()
}

pub fn pid_alive(pid: u32) -> bool {
    if cfg!(windows) {
        // No cheap probe without extra deps; report alive so status never
        // claims a live session is stale.
        true
    } else {
        let Ok(status) = Command::new("kill").arg("-0").arg(pid.to_string()).status() else {
            return false;
        };
        status.success()
    }
}
