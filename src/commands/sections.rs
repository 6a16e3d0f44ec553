use anyhow::Result;
use serde_json::json;

use crate::commands::CommandReport;
use crate::intel::sections::parse;
use crate::intel::source::{ReportSource, load_report};
use crate::intel::workspace;

#[derive(Debug, Clone, Default)]
pub struct SectionsOptions {
    pub source: ReportSource,
    pub section: Option<String>,
}

pub fn run(opts: &SectionsOptions) -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("sections");

    let wanted = match opts.section.as_deref() {
        Some(key) => match ws.config.section_by_key(key) {
            Some(spec) => vec![spec.clone()],
            None => {
                let known: Vec<&str> = ws.config.sections.iter().map(|s| s.key.as_str()).collect();
                report.issue(format!(
                    "unknown section `{key}`; known sections: {}",
                    known.join(", ")
                ));
                return Ok(report);
            }
        },
        None => ws.config.sections.clone(),
    };

    let loaded = load_report(&ws.paths.live_report, &ws.store, opts.source)?;
    let parsed = parse(&loaded.text, &ws.config.headers());

    let mut rows = Vec::new();
    for spec in &wanted {
        match parsed.get(&spec.header) {
            Some(lines) => {
                report.detail(format!("### {}", spec.title));
                for line in lines {
                    report.detail(line.clone());
                }
                rows.push(json!({
                    "key": spec.key,
                    "title": spec.title,
                    "header": spec.header,
                    "lines": lines,
                }));
            }
            None if opts.section.is_some() => {
                report.detail(format!(
                    "section `{}` not present in {} report",
                    spec.key,
                    loaded.label()
                ));
            }
            None => {}
        }
    }

    report.set_data(json!({
        "source": loaded.label(),
        "path": loaded.path.display().to_string(),
        "sections": rows,
    }));
    Ok(report)
}
