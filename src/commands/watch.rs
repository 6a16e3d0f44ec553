use anyhow::{Context, Result};
use std::fs;
use std::time::Duration;

use crate::commands::CommandReport;
use crate::commands::archive::{StepLog, run_archive_step};
use crate::intel::guard::SessionScope;
use crate::intel::sections::parse;
use crate::intel::shutdown::Shutdown;
use crate::intel::source::{ReportSource, load_report};
use crate::intel::workspace::{self, Workspace};

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub cycles: Option<u64>,
    pub interval_secs: Option<u64>,
    pub echo: bool,
}

fn consume_stop_file(ws: &Workspace) -> Result<bool> {
    let stop = &ws.paths.stop_file;
    if !stop.exists() {
        return Ok(false);
    }
    fs::remove_file(stop).with_context(|| format!("failed to remove {}", stop.display()))?;
    Ok(true)
}

fn summarize_live(ws: &Workspace) -> Result<String> {
    let loaded = load_report(&ws.paths.live_report, &ws.store, ReportSource::Live)?;
    let parsed = parse(&loaded.text, &ws.config.headers());
    let counts: Vec<String> = ws
        .config
        .sections
        .iter()
        .filter_map(|spec| {
            parsed
                .get(&spec.header)
                .map(|lines| format!("{}={}", spec.key, lines.len()))
        })
        .collect();
    Ok(format!("sections={} [{}]", parsed.len(), counts.join(",")))
}

/// Display session: archive once at start, then keep re-reading the live
/// report until the cycle budget runs out, a STOP file appears, or Ctrl-C /
/// SIGTERM arrives. Every exit path returns normally so the marker is cleared.
pub fn run(opts: &WatchOptions) -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("watch");

    let interval_secs = opts
        .interval_secs
        .unwrap_or(ws.config.watch.poll_interval_secs)
        .max(1);
    let max_cycles = opts.cycles.unwrap_or(ws.config.watch.max_cycles);
    report.detail(format!("poll_interval_secs={interval_secs}"));
    report.detail(format!(
        "max_cycles={}",
        if max_cycles == 0 {
            "unbounded".to_string()
        } else {
            max_cycles.to_string()
        }
    ));

    let shutdown = Shutdown::install()?;
    let _scope = SessionScope::enter(ws.guard.clone());
    let mut log = StepLog::default();
    run_archive_step(&ws, &mut report, &mut log);

    let mut cycle = 0u64;
    let mut last_line = None;
    loop {
        if shutdown.requested() {
            report.detail(format!("interrupted after {cycle} cycles"));
            break;
        }
        if consume_stop_file(&ws)? {
            report.detail(format!("stop file detected after {cycle} cycles"));
            break;
        }
        cycle += 1;

        run_archive_step(&ws, &mut report, &mut log);

        let line = match summarize_live(&ws) {
            Ok(summary) => format!("cycle={cycle} {summary}"),
            Err(err) => format!("cycle={cycle} live report unavailable: {err:#}"),
        };
        if opts.echo {
            println!("{line}");
        } else {
            last_line = Some(line);
        }

        if max_cycles != 0 && cycle >= max_cycles {
            break;
        }
        if shutdown.sleep(Duration::from_secs(interval_secs)) {
            report.detail(format!("interrupted after {cycle} cycles"));
            break;
        }
    }

    if let Some(line) = last_line {
        report.detail(line);
    }
    report.detail(format!("cycles_completed={cycle}"));
    Ok(report)
}
