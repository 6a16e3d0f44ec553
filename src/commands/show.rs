use anyhow::Result;
use serde_json::json;

use crate::commands::CommandReport;
use crate::intel::source::{ReportSource, load_report};
use crate::intel::workspace;

pub fn run(source: ReportSource) -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("show");

    let loaded = load_report(&ws.paths.live_report, &ws.store, source)?;
    report.detail(format!("### {} ({})", loaded.label(), loaded.path.display()));
    for line in loaded.text.lines() {
        report.detail(line);
    }
    report.set_data(json!({
        "source": loaded.label(),
        "path": loaded.path.display().to_string(),
        "text": loaded.text,
    }));
    Ok(report)
}
