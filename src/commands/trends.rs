use anyhow::Result;
use serde_json::json;

use crate::commands::CommandReport;
use crate::intel::trends::collect_trends;
use crate::intel::workspace;

pub fn run() -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("trends");

    let trends = collect_trends(&ws.store)?;
    for point in &trends.points {
        report.detail(format!(
            "{}\ttime={}s\tobjective={}\tsolutions={}",
            point.label,
            point.sample.computational_time_secs,
            point.sample.best_objective,
            point.sample.total_solutions
        ));
    }
    for skipped in &trends.skipped {
        report.detail(format!(
            "skipped v{} ({:?}): {}",
            skipped.version, skipped.kind, skipped.reason
        ));
    }
    if trends.points.is_empty() {
        report.detail("no complete metric samples in history");
    }

    report.set_data(json!({
        "labels": trends.labels(),
        "computational_time_secs": trends.computational_times(),
        "best_objective": trends.objective_values(),
        "total_solutions": trends.solution_counts(),
        "points": trends.points,
        "skipped": trends.skipped,
    }));
    Ok(report)
}
