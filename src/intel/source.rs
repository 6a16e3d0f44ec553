use crate::intel::store::VersionStore;
use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportSource {
    #[default]
    Live,
    Latest,
    Version(u64),
}

impl FromStr for ReportSource {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "live" | "current" => return Ok(Self::Live),
            "latest" => return Ok(Self::Latest),
            _ => {}
        }
        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        match digits.parse::<u64>() {
            Ok(version) if version > 0 => Ok(Self::Version(version)),
            _ => Err(anyhow!(
                "invalid report source `{raw}`: use `live`, `latest`, or `v<N>`"
            )),
        }
    }
}

impl fmt::Display for ReportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Latest => write!(f, "latest"),
            Self::Version(v) => write!(f, "v{v}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedReport {
    pub version: Option<u64>,
    pub path: PathBuf,
    pub text: String,
}

impl LoadedReport {
    pub fn label(&self) -> String {
        match self.version {
            Some(v) => format!("v{v}"),
            None => "live".to_string(),
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn load_report(
    live_report: &Path,
    store: &VersionStore,
    source: ReportSource,
) -> Result<LoadedReport> {
    match source {
        ReportSource::Live => {
            if !live_report.is_file() {
                anyhow::bail!("live report not found: {}", live_report.display());
            }
            Ok(LoadedReport {
                version: None,
                path: live_report.to_path_buf(),
                text: read_text(live_report)?,
            })
        }
        ReportSource::Latest => {
            let Some(entry) = store.latest()? else {
                anyhow::bail!("no archived reports in {}", store.dir().display());
            };
            Ok(LoadedReport {
                version: Some(entry.version),
                text: read_text(&entry.path)?,
                path: entry.path,
            })
        }
        ReportSource::Version(version) => Ok(LoadedReport {
            version: Some(version),
            text: store.load(version)?,
            path: store.path_for(version),
        }),
    }
}
