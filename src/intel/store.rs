use crate::error::ArchiveError;
use crate::intel::config::ArchiveConfig;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const STORE_LOCK_FILE: &str = ".store.lock";
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub version: u64,
    pub file_name: String,
    pub path: PathBuf,
    pub created_at: SystemTime,
}

#[derive(Debug, Clone)]
pub struct ArchivedVersion {
    pub version: u64,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Exclusive hold on the version store. Released when dropped.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Directory of immutable archived reports named `<prefix><N>.<ext>`.
///
/// Nothing is cached: every query re-reads the directory so files added or
/// removed by other processes are always seen.
#[derive(Debug, Clone)]
pub struct VersionStore {
    dir: PathBuf,
    prefix: String,
    extension: String,
    lock_wait: Duration,
}

impl VersionStore {
    pub fn new(dir: impl Into<PathBuf>, cfg: &ArchiveConfig) -> Self {
        Self {
            dir: dir.into(),
            prefix: cfg.file_prefix.clone(),
            extension: cfg.file_extension.clone(),
            lock_wait: Duration::from_millis(cfg.lock_wait_ms),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name_for(&self, version: u64) -> String {
        format!("{}{}.{}", self.prefix, version, self.extension)
    }

    pub fn path_for(&self, version: u64) -> PathBuf {
        self.dir.join(self.file_name_for(version))
    }

    /// Version embedded in a canonical archive file name. Leading zeros,
    /// zero, and non-digit payloads are not canonical and yield `None`.
    pub fn parse_version(&self, file_name: &str) -> Option<u64> {
        let digits = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;
        if digits.is_empty() || digits.starts_with('0') {
            return None;
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u64>().ok()
    }

    fn scan(&self) -> io::Result<Vec<VersionEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut out = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let Some(file_name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
                continue;
            };
            let Some(version) = self.parse_version(&file_name) else {
                continue;
            };
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let created_at = meta
                .created()
                .or_else(|_| meta.modified())
                .unwrap_or(UNIX_EPOCH);
            out.push(VersionEntry {
                version,
                file_name,
                path: entry.path(),
                created_at,
            });
        }
        out.sort_by_key(|e| e.version);
        Ok(out)
    }

    pub fn list_versions(&self, order: SortOrder) -> Result<Vec<VersionEntry>> {
        let mut entries = self
            .scan()
            .with_context(|| format!("failed to list {}", self.dir.display()))?;
        if order == SortOrder::Descending {
            entries.reverse();
        }
        Ok(entries)
    }

    pub fn latest(&self) -> Result<Option<VersionEntry>> {
        Ok(self.list_versions(SortOrder::Descending)?.into_iter().next())
    }

    pub fn next_version(&self) -> Result<u64> {
        let max = self
            .list_versions(SortOrder::Descending)?
            .first()
            .map(|e| e.version)
            .unwrap_or(0);
        max.checked_add(1).context("version counter exhausted")
    }

    pub fn load(&self, version: u64) -> Result<String> {
        let path = self.path_for(version);
        if !path.is_file() {
            anyhow::bail!("report version v{version} not found in {}", self.dir.display());
        }
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
    }

    /// Take the store-wide advisory lock, polling until `lock_wait` elapses.
    pub fn lock(&self) -> Result<StoreLock, ArchiveError> {
        fs::create_dir_all(&self.dir).map_err(|source| ArchiveError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(STORE_LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| ArchiveError::Write {
                path: path.clone(),
                source,
            })?;

        let started = Instant::now();
        loop {
            if file.try_lock_exclusive().is_ok() {
                return Ok(StoreLock { file });
            }
            if started.elapsed() >= self.lock_wait {
                return Err(ArchiveError::StoreBusy { path });
            }
            thread::sleep(LOCK_RETRY_DELAY);
        }
    }

    /// Copy the live report's bytes into a new file for `version`.
    ///
    /// The copy is staged in a temp file inside the store and published with
    /// no-clobber semantics, so readers never see a partial version and an
    /// existing version is never replaced.
    pub fn archive(
        &self,
        live_report: &Path,
        version: u64,
    ) -> Result<ArchivedVersion, ArchiveError> {
        let target = self.path_for(version);
        if target.exists() {
            return Err(ArchiveError::VersionExists {
                version,
                path: target,
            });
        }

        let raw = fs::read(live_report).map_err(|source| ArchiveError::Write {
            path: live_report.to_path_buf(),
            source,
        })?;

        fs::create_dir_all(&self.dir).map_err(|source| ArchiveError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let write_err = |source: io::Error| ArchiveError::Write {
            path: target.clone(),
            source,
        };
        let mut staged = tempfile::Builder::new()
            .prefix(".incoming-")
            .tempfile_in(&self.dir)
            .map_err(write_err)?;
        staged.write_all(&raw).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;

        match staged.persist_noclobber(&target) {
            Ok(_) => Ok(ArchivedVersion {
                version,
                path: target.clone(),
                bytes: raw.len(),
            }),
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                Err(ArchiveError::VersionExists {
                    version,
                    path: target.clone(),
                })
            }
            Err(err) => Err(write_err(err.error)),
        }
    }
}
