use crate::intel::archiver::Archiver;
use crate::intel::config::{IntelConfig, load_config};
use crate::intel::guard::SessionGuard;
use crate::intel::paths::{IntelPaths, resolve_paths};
use crate::intel::store::VersionStore;
use anyhow::Result;

/// Resolved paths and config with the store and guard built from them.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub paths: IntelPaths,
    pub config: IntelConfig,
    pub store: VersionStore,
    pub guard: SessionGuard,
}

impl Workspace {
    pub fn new(paths: IntelPaths, config: IntelConfig) -> Self {
        let store = VersionStore::new(&paths.history_dir, &config.archive);
        let guard = SessionGuard::new(&paths.marker_file);
        Self {
            paths,
            config,
            store,
            guard,
        }
    }

    pub fn archiver(&self) -> Archiver<'_> {
        Archiver::new(&self.store, &self.guard).skip_unchanged(self.config.archive.skip_unchanged)
    }
}

pub fn open() -> Result<Workspace> {
    Ok(Workspace::new(resolve_paths()?, load_config()?))
}
