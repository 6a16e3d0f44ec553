use anyhow::Result;

use crate::commands::CommandReport;
use crate::intel::workspace;

pub fn run() -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("release");
    report.detail(format!("marker={}", ws.guard.path().display()));

    match ws.guard.release() {
        Ok(true) => report.detail("removed session marker"),
        Ok(false) => report.detail("no session marker present"),
        Err(err) => report.issue(format!("[{}] {err}", err.code().as_str())),
    }
    Ok(report)
}
