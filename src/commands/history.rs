use anyhow::Result;
use serde_json::json;
use std::time::UNIX_EPOCH;

use crate::commands::CommandReport;
use crate::intel::store::SortOrder;
use crate::intel::util::format_generated_on;
use crate::intel::workspace;

#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    pub ascending: bool,
}

pub fn run(opts: &HistoryOptions) -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("history");

    let order = if opts.ascending {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    };
    let entries = ws.store.list_versions(order)?;
    if entries.is_empty() {
        report.detail(format!(
            "no previous reports found in {}",
            ws.store.dir().display()
        ));
    }

    let mut rows = Vec::with_capacity(entries.len());
    for entry in &entries {
        let generated_on = format_generated_on(entry.created_at);
        report.detail(format!(
            "v{}\t{}\t{}",
            entry.version, entry.file_name, generated_on
        ));
        rows.push(json!({
            "version": entry.version,
            "file_name": entry.file_name,
            "generated_on": generated_on,
            "created_at_epoch_secs": entry
                .created_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }));
    }
    report.set_data(json!({ "reports": rows }));

    Ok(report)
}
