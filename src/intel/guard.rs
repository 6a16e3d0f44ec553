use crate::error::GuardError;
use crate::intel::warn::{self, WarnEvent};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-session marker file recording which report version this session
/// archived. Creation is an exclusive create, so of several processes racing
/// for the same marker exactly one wins.
///
/// Clones share ownership state: a clone sees a marker acquired through any
/// other clone as owned.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    path: PathBuf,
    owned: Arc<AtomicBool>,
}

impl SessionGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the current marker was created through this guard.
    pub fn owns_marker(&self) -> bool {
        self.owned.load(Ordering::SeqCst)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }

    pub fn acquire(&self, version: u64) -> Result<(), GuardError> {
        let io_err = |source: std::io::Error| GuardError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut file = match OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(GuardError::AlreadyHeld {
                    path: self.path.clone(),
                });
            }
            Err(err) => return Err(io_err(err)),
        };

        let body = format!(
            "Session Report Version: {version}\npid: {}\n",
            std::process::id()
        );
        if let Err(err) = file.write_all(body.as_bytes()) {
            drop(file);
            let _ = fs::remove_file(&self.path);
            return Err(io_err(err));
        }
        self.owned.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Remove the marker. Returns whether a marker was present.
    pub fn release(&self) -> Result<bool, GuardError> {
        self.owned.store(false, Ordering::SeqCst);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(GuardError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Process-lifetime finalizer: releases the session marker this process
/// created when dropped, including during panic unwinding. Markers left by
/// other sessions are not touched. Long-running commands turn Ctrl-C into a
/// normal return (see `shutdown`); SIGKILL still skips the finalizer and
/// leaves a stale marker behind.
#[derive(Debug)]
pub struct SessionScope {
    guard: SessionGuard,
}

impl SessionScope {
    pub fn enter(guard: SessionGuard) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        if !self.guard.owns_marker() {
            return;
        }
        if let Err(err) = self.guard.release() {
            warn::emit(WarnEvent {
                code: err.code().as_str(),
                stage: "session",
                action: "release-marker",
                version: None,
                path: &self.guard.path().display().to_string(),
                retry: "manual-release",
                reason: "marker-remove-failed",
                err: &err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn acquire_records_version_and_release_removes() {
        let tmp = tempdir().expect("tempdir");
        let guard = SessionGuard::new(tmp.path().join("history/current_session.lock"));
        assert!(!guard.is_held());

        guard.acquire(5).expect("acquire");
        assert!(guard.is_held());
        let body = fs::read_to_string(guard.path()).expect("read marker");
        assert!(body.starts_with("Session Report Version: 5\n"));

        assert!(guard.release().expect("release"));
        assert!(!guard.is_held());
    }

    #[test]
    fn second_acquire_reports_already_held() {
        let tmp = tempdir().expect("tempdir");
        let guard = SessionGuard::new(tmp.path().join("current_session.lock"));
        guard.acquire(1).expect("first acquire");
        let err = guard.acquire(2).expect_err("second acquire");
        assert!(matches!(err, GuardError::AlreadyHeld { .. }));
        let body = fs::read_to_string(guard.path()).expect("read marker");
        assert!(body.contains("Version: 1"));
    }

    #[test]
    fn release_is_idempotent() {
        let tmp = tempdir().expect("tempdir");
        let guard = SessionGuard::new(tmp.path().join("current_session.lock"));
        assert!(!guard.release().expect("release empty"));
        guard.acquire(1).expect("acquire");
        assert!(guard.release().expect("release held"));
        assert!(!guard.release().expect("release again"));
    }

    #[test]
    fn racing_acquires_have_exactly_one_winner() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("current_session.lock");
        let contenders = 8;
        let barrier = Arc::new(Barrier::new(contenders));

        let handles: Vec<_> = (0..contenders)
            .map(|i| {
                let guard = SessionGuard::new(path.clone());
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    guard.acquire(i as u64 + 1)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let held = results
            .iter()
            .filter(|r| matches!(r, Err(GuardError::AlreadyHeld { .. })))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(held, contenders - 1);
    }

    #[test]
    fn scope_drop_clears_marker() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("current_session.lock");
        {
            let scope = SessionScope::enter(SessionGuard::new(&path));
            scope.guard().acquire(3).expect("acquire");
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn scope_leaves_foreign_marker_alone() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("current_session.lock");
        let other_session = SessionGuard::new(&path);
        other_session.acquire(2).expect("other session acquires");
        {
            let scope = SessionScope::enter(SessionGuard::new(&path));
            assert!(scope.guard().is_held());
            assert!(!scope.guard().owns_marker());
        }
        assert!(path.exists());
    }

    #[test]
    fn clones_share_ownership() {
        let tmp = tempdir().expect("tempdir");
        let guard = SessionGuard::new(tmp.path().join("current_session.lock"));
        let scope = SessionScope::enter(guard.clone());
        guard.acquire(1).expect("acquire");
        assert!(scope.guard().owns_marker());
        drop(scope);
        assert!(!guard.is_held());
    }

    #[test]
    fn scope_drop_runs_during_unwind() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("current_session.lock");
        let inner = path.clone();
        let outcome = std::panic::catch_unwind(move || {
            let scope = SessionScope::enter(SessionGuard::new(inner));
            scope.guard().acquire(1).expect("acquire");
            panic!("display session crashed");
        });
        assert!(outcome.is_err());
        assert!(!path.exists());
    }
}
