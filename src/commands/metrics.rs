use anyhow::Result;
use serde_json::json;

use crate::commands::CommandReport;
use crate::intel::metrics::extract_from_text;
use crate::intel::source::{ReportSource, load_report};
use crate::intel::workspace;

pub fn run(source: ReportSource) -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("metrics");

    let loaded = load_report(&ws.paths.live_report, &ws.store, source)?;
    report.detail(format!("source={}", loaded.label()));

    match extract_from_text(&loaded.text) {
        Ok(Some(sample)) => {
            report.detail(format!(
                "computational_time_secs={}",
                sample.computational_time_secs
            ));
            report.detail(format!("best_objective={}", sample.best_objective));
            report.detail(format!("total_solutions={}", sample.total_solutions));
            report.set_data(json!({ "source": loaded.label(), "metrics": sample }));
        }
        Ok(None) => {
            report.detail("metrics incomplete");
            report.set_data(json!({ "source": loaded.label(), "metrics": null }));
        }
        Err(err) => report.issue(format!("[{}] {err}", err.code().as_str())),
    }

    Ok(report)
}
