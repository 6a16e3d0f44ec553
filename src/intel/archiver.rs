use crate::error::{ArchiveError, ErrorCode, GuardError};
use crate::intel::guard::SessionGuard;
use crate::intel::store::{ArchivedVersion, VersionStore};
use crate::intel::util::file_hash;
use crate::intel::warn::{self, WarnEvent};
use std::io;
use std::path::Path;

#[derive(Debug, Clone)]
pub enum ArchiveRunOutcome {
    /// The session marker was already present; nothing was written.
    AlreadyArchived,
    Archived(ArchivedVersion),
    /// `skip_unchanged` matched the live report against this stored version.
    Unchanged { version: u64 },
}

impl ArchiveRunOutcome {
    pub fn archived_version(&self) -> Option<u64> {
        match self {
            Self::Archived(out) => Some(out.version),
            _ => None,
        }
    }
}

fn store_failure(store: &VersionStore, err: anyhow::Error) -> ArchiveError {
    ArchiveError::Write {
        path: store.dir().to_path_buf(),
        source: io::Error::other(format!("{err:#}")),
    }
}

/// Archives the live report at most once per session.
///
/// The marker is claimed before the copy is written and dropped again if the
/// copy fails, so a failed attempt leaves the session free to retry.
pub struct Archiver<'a> {
    store: &'a VersionStore,
    guard: &'a SessionGuard,
    skip_unchanged: bool,
}

impl<'a> Archiver<'a> {
    pub fn new(store: &'a VersionStore, guard: &'a SessionGuard) -> Self {
        Self {
            store,
            guard,
            skip_unchanged: false,
        }
    }

    pub fn skip_unchanged(mut self, enabled: bool) -> Self {
        self.skip_unchanged = enabled;
        self
    }

    pub fn run(&self, live_report: &Path) -> Result<ArchiveRunOutcome, ArchiveError> {
        if self.guard.is_held() {
            return Ok(ArchiveRunOutcome::AlreadyArchived);
        }
        if !live_report.is_file() {
            return Err(ArchiveError::SourceMissing {
                path: live_report.to_path_buf(),
            });
        }

        let _lock = self.store.lock()?;

        if self.skip_unchanged {
            if let Some(version) = self.unchanged_version(live_report)? {
                if !self.claim(version)? {
                    return Ok(ArchiveRunOutcome::AlreadyArchived);
                }
                return Ok(ArchiveRunOutcome::Unchanged { version });
            }
        }

        let next = self
            .store
            .next_version()
            .map_err(|err| store_failure(self.store, err))?;
        if !self.claim(next)? {
            return Ok(ArchiveRunOutcome::AlreadyArchived);
        }

        match self.store.archive(live_report, next) {
            Ok(out) => Ok(ArchiveRunOutcome::Archived(out)),
            Err(err) => {
                self.release_after_failure(next);
                Err(err)
            }
        }
    }

    /// Returns `false` when the marker could not be removed and stays set.
    fn release_after_failure(&self, version: u64) -> bool {
        let Err(err) = self.guard.release() else {
            return true;
        };
        warn::emit(WarnEvent {
            code: ErrorCode::E006MarkerIo.as_str(),
            stage: "archive",
            action: "release-marker-after-failure",
            version: Some(version),
            path: &self.guard.path().display().to_string(),
            retry: "manual-release",
            reason: "marker-left-set",
            err: &err.to_string(),
        });
        false
    }

    /// Returns `false` when another session claimed the marker first.
    fn claim(&self, version: u64) -> Result<bool, ArchiveError> {
        match self.guard.acquire(version) {
            Ok(()) => Ok(true),
            Err(GuardError::AlreadyHeld { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn unchanged_version(&self, live_report: &Path) -> Result<Option<u64>, ArchiveError> {
        let Some(latest) = self
            .store
            .latest()
            .map_err(|err| store_failure(self.store, err))?
        else {
            return Ok(None);
        };
        let live_hash = file_hash(live_report).map_err(|err| ArchiveError::Write {
            path: live_report.to_path_buf(),
            source: io::Error::other(format!("{err:#}")),
        })?;
        let stored_hash = file_hash(&latest.path).map_err(|err| store_failure(self.store, err))?;
        Ok((live_hash == stored_hash).then_some(latest.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::config::ArchiveConfig;
    use crate::intel::store::SortOrder;
    use std::fs;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::tempdir;

    struct Fixture {
        _tmp: tempfile::TempDir,
        live: std::path::PathBuf,
        store: VersionStore,
        guard: SessionGuard,
    }

    fn fixture(body: &str) -> Fixture {
        let tmp = tempdir().expect("tempdir");
        let live = tmp.path().join("Outputs/intelligence_report.txt");
        fs::create_dir_all(live.parent().expect("parent")).expect("mkdir outputs");
        fs::write(&live, body).expect("write live");
        let history = tmp.path().join("Reports-History");
        let store = VersionStore::new(&history, &ArchiveConfig::default());
        let guard = SessionGuard::new(history.join("current_session.lock"));
        Fixture {
            _tmp: tmp,
            live,
            store,
            guard,
        }
    }

    fn versions(store: &VersionStore) -> Vec<u64> {
        store
            .list_versions(SortOrder::Ascending)
            .expect("list")
            .iter()
            .map(|e| e.version)
            .collect()
    }

    #[test]
    fn repeated_runs_in_one_session_archive_once() {
        let fx = fixture("report body\n");
        let archiver = Archiver::new(&fx.store, &fx.guard);

        let first = archiver.run(&fx.live).expect("first run");
        assert_eq!(first.archived_version(), Some(1));
        for _ in 0..5 {
            let again = archiver.run(&fx.live).expect("rerun");
            assert!(matches!(again, ArchiveRunOutcome::AlreadyArchived));
        }
        assert_eq!(versions(&fx.store), vec![1]);
        assert!(fx.guard.is_held());
    }

    #[test]
    fn each_new_session_mints_the_next_version() {
        let fx = fixture("same body\n");
        fs::create_dir_all(fx.store.dir()).expect("mkdir");
        fs::write(fx.store.path_for(4), "older\n").expect("seed v4");

        for expected in [5, 6] {
            let out = Archiver::new(&fx.store, &fx.guard)
                .run(&fx.live)
                .expect("run");
            assert_eq!(out.archived_version(), Some(expected));
            fx.guard.release().expect("end session");
        }
        assert_eq!(versions(&fx.store), vec![4, 5, 6]);
    }

    #[test]
    fn archived_copy_matches_live_bytes() {
        let fx = fixture("==== SCHEDULING INTELLIGENCE REPORT ====\n  Computational time: 3.2s\n");
        let out = Archiver::new(&fx.store, &fx.guard)
            .run(&fx.live)
            .expect("run");
        let ArchiveRunOutcome::Archived(archived) = out else {
            panic!("expected archived outcome");
        };
        assert_eq!(
            fs::read(&archived.path).expect("read archived"),
            fs::read(&fx.live).expect("read live")
        );
    }

    #[test]
    fn missing_live_report_touches_nothing() {
        let fx = fixture("x\n");
        fs::remove_file(&fx.live).expect("remove live");

        let err = Archiver::new(&fx.store, &fx.guard)
            .run(&fx.live)
            .expect_err("missing source");
        assert!(matches!(err, ArchiveError::SourceMissing { .. }));
        assert!(!fx.guard.is_held());
        assert!(!fx.store.dir().exists());
    }

    #[test]
    fn held_marker_short_circuits_before_source_check() {
        let fx = fixture("x\n");
        fx.guard.acquire(9).expect("stale marker");
        fs::remove_file(&fx.live).expect("remove live");

        let out = Archiver::new(&fx.store, &fx.guard)
            .run(&fx.live)
            .expect("no-op");
        assert!(matches!(out, ArchiveRunOutcome::AlreadyArchived));
        assert!(versions(&fx.store).is_empty());
    }

    #[test]
    fn write_failure_leaves_marker_unset_for_retry() {
        let tmp = tempdir().expect("tempdir");
        let live = tmp.path().join("live.txt");
        fs::write(&live, "body\n").expect("write live");
        let blocked = tmp.path().join("history");
        fs::write(&blocked, "not a directory").expect("block history dir");
        let store = VersionStore::new(&blocked, &ArchiveConfig::default());
        let guard = SessionGuard::new(tmp.path().join("current_session.lock"));

        let err = Archiver::new(&store, &guard)
            .run(&live)
            .expect_err("store unwritable");
        assert!(matches!(err, ArchiveError::Write { .. }));
        assert!(!guard.is_held());

        fs::remove_file(&blocked).expect("unblock");
        let out = Archiver::new(&store, &guard).run(&live).expect("retry");
        assert_eq!(out.archived_version(), Some(1));
    }

    #[test]
    fn skip_unchanged_reuses_latest_version() {
        let fx = fixture("stable\n");
        let first = Archiver::new(&fx.store, &fx.guard)
            .skip_unchanged(true)
            .run(&fx.live)
            .expect("first");
        assert_eq!(first.archived_version(), Some(1));
        fx.guard.release().expect("end session");

        let second = Archiver::new(&fx.store, &fx.guard)
            .skip_unchanged(true)
            .run(&fx.live)
            .expect("second");
        assert!(matches!(second, ArchiveRunOutcome::Unchanged { version: 1 }));
        assert!(fx.guard.is_held());
        fx.guard.release().expect("end session");

        fs::write(&fx.live, "changed\n").expect("rewrite live");
        let third = Archiver::new(&fx.store, &fx.guard)
            .skip_unchanged(true)
            .run(&fx.live)
            .expect("third");
        assert_eq!(third.archived_version(), Some(2));
        assert_eq!(versions(&fx.store), vec![1, 2]);
    }

    #[test]
    fn unremovable_marker_after_failure_is_reported_as_still_set() {
        let fx = fixture("x\n");
        fs::create_dir_all(fx.guard.path().join("occupied")).expect("marker path as dir");

        let archiver = Archiver::new(&fx.store, &fx.guard);
        assert!(!archiver.release_after_failure(1));
        assert!(fx.guard.is_held());

        fs::remove_dir_all(fx.guard.path()).expect("clear dir");
        fx.guard.acquire(1).expect("claim");
        assert!(archiver.release_after_failure(1));
        assert!(!fx.guard.is_held());
    }

    #[test]
    fn concurrent_sessions_on_one_store_write_one_version() {
        let fx = fixture("shared body\n");
        let marker = fx.guard.path().to_path_buf();
        let barrier = Arc::new(Barrier::new(2));

        let outcomes: Vec<ArchiveRunOutcome> = thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let barrier = barrier.clone();
                    let marker = marker.clone();
                    let store = &fx.store;
                    let live = &fx.live;
                    scope.spawn(move || {
                        let guard = SessionGuard::new(marker);
                        barrier.wait();
                        Archiver::new(store, &guard).run(live).expect("run")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("join"))
                .collect()
        });

        let archived: Vec<u64> = outcomes
            .iter()
            .filter_map(ArchiveRunOutcome::archived_version)
            .collect();
        assert_eq!(archived, vec![1]);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, ArchiveRunOutcome::AlreadyArchived))
                .count(),
            1
        );
        assert_eq!(versions(&fx.store), vec![1]);
    }
}
