use anyhow::Result;
use std::env;
use std::fs;

use crate::commands::CommandReport;
use crate::intel::store::SortOrder;
use crate::intel::util::pid_alive;
use crate::intel::workspace;

include!(concat!(env!("OUT_DIR"), "/intel_env_allowlist.rs"));

const ENV_PREFIX: &str = "INTEL_REPORT_";

fn unknown_env_keys<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = keys
        .into_iter()
        .filter(|k| k.starts_with(ENV_PREFIX))
        .filter(|k| !GENERATED_INTEL_ENV_ALLOWLIST.contains(&k.as_str()))
        .collect();
    out.sort();
    out
}

fn marker_pid(body: &str) -> Option<u32> {
    body.lines()
        .filter_map(|line| line.trim().strip_prefix("pid:"))
        .find_map(|v| v.trim().parse::<u32>().ok())
}

pub fn run() -> Result<CommandReport> {
    let ws = workspace::open()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_id={}", env!("BUILD_UUID")));
    report.detail(format!("intel_home={}", ws.paths.intel_home.display()));
    report.detail(format!("live_report={}", ws.paths.live_report.display()));
    report.detail(format!("history_dir={}", ws.paths.history_dir.display()));
    report.detail(format!("logs_dir={}", ws.paths.logs_dir.display()));
    report.detail(format!("marker_file={}", ws.paths.marker_file.display()));
    report.detail(format!("archive.file_prefix={}", ws.config.archive.file_prefix));
    report.detail(format!(
        "archive.skip_unchanged={}",
        ws.config.archive.skip_unchanged
    ));
    report.detail(format!("sections={}", ws.config.sections.len()));

    if !ws.paths.live_report.is_file() {
        report.issue(format!(
            "missing live report ({}); archiving will fail until the scheduler writes it",
            ws.paths.live_report.display()
        ));
    }

    let versions = ws.store.list_versions(SortOrder::Ascending)?;
    report.detail(format!("archived_versions={}", versions.len()));
    report.detail(format!("next_version=v{}", ws.store.next_version()?));

    if ws.guard.is_held() {
        let body = fs::read_to_string(ws.guard.path()).unwrap_or_default();
        match marker_pid(&body) {
            Some(pid) if pid_alive(pid) => {
                report.detail(format!("session marker held by running pid {pid}"));
            }
            Some(pid) => report.issue(format!(
                "stale session marker from pid {pid} suppresses the next archive; clear it with `intel-report release`"
            )),
            None => report.issue(format!(
                "session marker {} has no owner pid; clear it with `intel-report release` if no session is running",
                ws.guard.path().display()
            )),
        }
    } else {
        report.detail("session marker absent");
    }

    for key in unknown_env_keys(env::vars().map(|(k, _)| k)) {
        report.issue(format!("unrecognised environment variable {key}"));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_covers_path_variables() {
        assert!(GENERATED_INTEL_ENV_ALLOWLIST.contains(&"INTEL_REPORT_HOME"));
        assert!(GENERATED_INTEL_ENV_ALLOWLIST.contains(&"INTEL_REPORT_HISTORY_DIR"));
    }

    #[test]
    fn unknown_keys_only_flag_prefixed_typos() {
        let typo = format!("{ENV_PREFIX}HISTROY_DIR");
        let keys = vec![
            "INTEL_REPORT_HOME".to_string(),
            typo.clone(),
            "PATH".to_string(),
        ];
        assert_eq!(unknown_env_keys(keys), vec![typo]);
    }

    #[test]
    fn marker_pid_reads_owner_line() {
        assert_eq!(marker_pid("Session Report Version: 3\npid: 4242\n"), Some(4242));
        assert_eq!(marker_pid("Session Report Version: 3\n"), None);
    }
}
