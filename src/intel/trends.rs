use crate::error::ErrorCode;
use crate::intel::metrics::{MetricSample, extract_from_text};
use crate::intel::store::{SortOrder, VersionStore};
use crate::intel::warn::{self, WarnEvent};
use anyhow::Result;
use serde::Serialize;
use std::fs;

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub version: u64,
    pub label: String,
    pub sample: MetricSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    Incomplete,
    Malformed,
    Unreadable,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedVersion {
    pub version: u64,
    pub kind: SkipKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendReport {
    pub points: Vec<TrendPoint>,
    pub skipped: Vec<SkippedVersion>,
}

impl TrendReport {
    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn computational_times(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.sample.computational_time_secs)
            .collect()
    }

    pub fn objective_values(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.sample.best_objective).collect()
    }

    pub fn solution_counts(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.sample.total_solutions).collect()
    }
}

/// Re-scan every archived version, oldest first. One bad file only drops its
/// own sample.
pub fn collect_trends(store: &VersionStore) -> Result<TrendReport> {
    let mut report = TrendReport::default();

    for entry in store.list_versions(SortOrder::Ascending)? {
        let path = entry.path.display().to_string();
        let text = match fs::read_to_string(&entry.path) {
            Ok(text) => text,
            Err(err) => {
                warn::emit(WarnEvent {
                    code: ErrorCode::E008ReportUnreadable.as_str(),
                    stage: "trends",
                    action: "read-archived-report",
                    version: Some(entry.version),
                    path: &path,
                    retry: "none",
                    reason: "archived-report-unreadable",
                    err: &err.to_string(),
                });
                report.skipped.push(SkippedVersion {
                    version: entry.version,
                    kind: SkipKind::Unreadable,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        match extract_from_text(&text) {
            Ok(Some(sample)) => report.points.push(TrendPoint {
                version: entry.version,
                label: format!("v{}", entry.version),
                sample,
            }),
            Ok(None) => report.skipped.push(SkippedVersion {
                version: entry.version,
                kind: SkipKind::Incomplete,
                reason: "metrics incomplete".to_string(),
            }),
            Err(err) => {
                warn::emit(WarnEvent {
                    code: err.code().as_str(),
                    stage: "trends",
                    action: "extract-metrics",
                    version: Some(entry.version),
                    path: &path,
                    retry: "none",
                    reason: "metric-line-malformed",
                    err: &err.to_string(),
                });
                report.skipped.push(SkippedVersion {
                    version: entry.version,
                    kind: SkipKind::Malformed,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::config::ArchiveConfig;
    use tempfile::tempdir;

    fn report(time: &str, objective: &str, solutions: &str) -> String {
        format!(
            "==== END OF INTELLIGENCE REPORT ====\nComputational time: {time}\nBest objective value: {objective}\nTotal solutions found: {solutions}\n"
        )
    }

    #[test]
    fn bad_versions_are_skipped_not_fatal() {
        let tmp = tempdir().expect("tempdir");
        let store = VersionStore::new(tmp.path(), &ArchiveConfig::default());
        fs::write(store.path_for(1), report("10.0s", "400", "3")).expect("v1");
        fs::write(store.path_for(2), "no metrics here\n").expect("v2");
        fs::write(store.path_for(3), report("9.5s", "bad", "4")).expect("v3");
        fs::write(store.path_for(10), report("8.25s", "350", "6")).expect("v10");

        let trends = collect_trends(&store).expect("trends");
        assert_eq!(trends.labels(), vec!["v1", "v10"]);
        assert_eq!(trends.computational_times(), vec![10.0, 8.25]);
        assert_eq!(trends.objective_values(), vec![400, 350]);
        assert_eq!(trends.solution_counts(), vec![3, 6]);

        let skipped: Vec<(u64, SkipKind)> =
            trends.skipped.iter().map(|s| (s.version, s.kind)).collect();
        assert_eq!(
            skipped,
            vec![(2, SkipKind::Incomplete), (3, SkipKind::Malformed)]
        );
    }

    #[test]
    fn empty_store_has_no_points() {
        let tmp = tempdir().expect("tempdir");
        let store = VersionStore::new(tmp.path().join("none"), &ArchiveConfig::default());
        let trends = collect_trends(&store).expect("trends");
        assert!(trends.points.is_empty());
        assert!(trends.skipped.is_empty());
    }

    #[test]
    fn non_utf8_report_is_unreadable() {
        let tmp = tempdir().expect("tempdir");
        let store = VersionStore::new(tmp.path(), &ArchiveConfig::default());
        fs::write(store.path_for(1), b"\xff\xfe\xfd").expect("v1");
        fs::write(store.path_for(2), report("1s", "1", "1")).expect("v2");

        let trends = collect_trends(&store).expect("trends");
        assert_eq!(trends.labels(), vec!["v2"]);
        assert_eq!(trends.skipped[0].kind, SkipKind::Unreadable);
    }
}
