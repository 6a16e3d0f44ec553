use anyhow::Result;

use crate::commands::CommandReport;
use crate::intel::archiver::ArchiveRunOutcome;
use crate::intel::audit;
use crate::intel::guard::SessionScope;
use crate::intel::warn::{self, WarnEvent};
use crate::intel::workspace::{self, Workspace};

fn audit_or_warn(ws: &Workspace, status: &str, message: &str) {
    if let Err(err) = audit::append_event(&ws.paths, "archive", status, message) {
        warn::emit(WarnEvent {
            code: "AUDIT_WRITE_FAILED",
            stage: "archive",
            action: "append-audit-event",
            version: None,
            path: &ws.paths.logs_dir.display().to_string(),
            retry: "next-event",
            reason: "audit-log-unwritable",
            err: &format!("{err:#}"),
        });
    }
}

/// Last outcome recorded by `run_archive_step`, so a polling session audits
/// and reports each change once instead of once per cycle.
#[derive(Debug, Default)]
pub struct StepLog {
    last: Option<String>,
}

impl StepLog {
    fn is_repeat(&mut self, message: &str) -> bool {
        if self.last.as_deref() == Some(message) {
            return true;
        }
        self.last = Some(message.to_string());
        false
    }
}

/// Run the archiver once and record the outcome. Failures become issues on
/// `report`; history stays readable either way.
pub fn run_archive_step(
    ws: &Workspace,
    report: &mut CommandReport,
    log: &mut StepLog,
) -> Option<ArchiveRunOutcome> {
    let live = ws.paths.live_report.display().to_string();
    match ws.archiver().run(&ws.paths.live_report) {
        Ok(outcome) => {
            // Our own marker: this session already recorded its archive.
            if matches!(outcome, ArchiveRunOutcome::AlreadyArchived) && ws.guard.owns_marker() {
                return Some(outcome);
            }
            let message = match &outcome {
                ArchiveRunOutcome::Archived(out) => format!(
                    "archived version=v{} path={} bytes={}",
                    out.version,
                    out.path.display(),
                    out.bytes
                ),
                ArchiveRunOutcome::AlreadyArchived => format!(
                    "session already archived; marker={}",
                    ws.guard.path().display()
                ),
                ArchiveRunOutcome::Unchanged { version } => {
                    format!("live report unchanged since v{version}; no new version")
                }
            };
            if log.is_repeat(&message) {
                return Some(outcome);
            }
            let status = if outcome.archived_version().is_some() {
                "ok"
            } else {
                "skipped"
            };
            audit_or_warn(ws, status, &message);
            report.detail(message);
            Some(outcome)
        }
        Err(err) => {
            let message = format!("archive failed [{}]: {err}", err.code().as_str());
            if log.is_repeat(&message) {
                return None;
            }
            warn::emit(WarnEvent {
                code: err.code().as_str(),
                stage: "archive",
                action: "archive-live-report",
                version: None,
                path: &live,
                retry: "next-session",
                reason: "archive-step-failed",
                err: &err.to_string(),
            });
            audit_or_warn(ws, "failed", &message);
            report.issue(message);
            None
        }
    }
}

pub fn run() -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("archive");
    report.detail(format!("live_report={}", ws.paths.live_report.display()));
    report.detail(format!("history_dir={}", ws.paths.history_dir.display()));

    let _scope = SessionScope::enter(ws.guard.clone());
    run_archive_step(&ws, &mut report, &mut StepLog::default());
    Ok(report)
}
