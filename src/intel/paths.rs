use anyhow::Result;
use std::env;
use std::path::PathBuf;

pub const MARKER_FILE: &str = "current_session.lock";
pub const STOP_FILE: &str = "STOP";

#[derive(Debug, Clone)]
pub struct IntelPaths {
    pub intel_home: PathBuf,
    pub live_report: PathBuf,
    pub history_dir: PathBuf,
    pub marker_file: PathBuf,
    pub stop_file: PathBuf,
    pub logs_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<IntelPaths> {
    let home = required_home_dir()?;
    let intel_home = env_or_default_path("INTEL_REPORT_HOME", home.join("goodwing"));

    let live_report = env_or_default_path(
        "INTEL_REPORT_LIVE",
        intel_home.join("Goodwing-Timetabler/Outputs/intelligence_report.txt"),
    );
    let history_dir = env_or_default_path(
        "INTEL_REPORT_HISTORY_DIR",
        intel_home.join("Frontend/Intelligence-Report/Reports-History"),
    );
    let logs_dir = env_or_default_path("INTEL_REPORT_LOGS_DIR", intel_home.join("logs"));

    Ok(IntelPaths {
        marker_file: history_dir.join(MARKER_FILE),
        stop_file: history_dir.join(STOP_FILE),
        intel_home,
        live_report,
        history_dir,
        logs_dir,
    })
}
