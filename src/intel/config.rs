use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub file_prefix: String,
    pub file_extension: String,
    pub skip_unchanged: bool,
    pub lock_wait_ms: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            file_prefix: "intelligence_report_v".to_string(),
            file_extension: "txt".to_string(),
            skip_unchanged: false,
            lock_wait_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_secs: u64,
    pub max_cycles: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_cycles: 0,
        }
    }
}

/// One entry of the section catalog: a stable key for the CLI, a display
/// title, and the exact header line the scheduling engine writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub key: String,
    pub title: String,
    pub header: String,
}

impl SectionSpec {
    fn new(key: &str, title: &str, header: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            header: header.to_string(),
        }
    }
}

pub fn default_sections() -> Vec<SectionSpec> {
    vec![
        SectionSpec::new(
            "overview",
            "Overview",
            "==== SCHEDULING INTELLIGENCE REPORT ====",
        ),
        SectionSpec::new("conflicts", "Conflict Analysis", "1. CONFLICT ANALYSIS"),
        SectionSpec::new(
            "resources",
            "Resource Utilization",
            "2. RESOURCE UTILIZATION",
        ),
        SectionSpec::new(
            "timeslots",
            "Timeslot Distribution",
            "3. TIMESLOT DISTRIBUTION",
        ),
        SectionSpec::new("penalties", "Penalty Breakdown", "4. PENALTY BREAKDOWN"),
        SectionSpec::new(
            "transitions",
            "Online-Physical Transitions",
            "5. ONLINE-PHYSICAL TRANSITIONS",
        ),
        SectionSpec::new(
            "late-timeslots",
            "Late Timeslot Analysis",
            "6. LATE TIMESLOT ANALYSIS",
        ),
        SectionSpec::new("summary", "Summary", "==== END OF INTELLIGENCE REPORT ===="),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelConfig {
    pub archive: ArchiveConfig,
    pub watch: WatchConfig,
    pub sections: Vec<SectionSpec>,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            archive: ArchiveConfig::default(),
            watch: WatchConfig::default(),
            sections: default_sections(),
        }
    }
}

impl IntelConfig {
    pub fn headers(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.header.as_str()).collect()
    }

    pub fn section_by_key(&self, key: &str) -> Option<&SectionSpec> {
        self.sections
            .iter()
            .find(|s| s.key.eq_ignore_ascii_case(key.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialIntelConfig {
    archive: Option<ArchiveConfig>,
    watch: Option<WatchConfig>,
    sections: Option<Vec<SectionSpec>>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => {
            let trimmed = v.trim();
            match trimmed {
                "1" | "true" | "TRUE" | "yes" | "on" => true,
                "0" | "false" | "FALSE" | "no" | "off" => false,
                _ => fallback,
            }
        }
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &IntelConfig) -> Result<()> {
    let prefix = &cfg.archive.file_prefix;
    if prefix.trim().is_empty() {
        return Err(anyhow!("invalid archive file prefix: cannot be empty"));
    }
    if prefix.contains('/') || prefix.contains('\\') {
        return Err(anyhow!(
            "invalid archive file prefix: must not contain path separators"
        ));
    }
    let ext = &cfg.archive.file_extension;
    if ext.trim().is_empty() || ext.contains('.') || ext.contains('/') {
        return Err(anyhow!(
            "invalid archive file extension: use a bare extension such as `txt`"
        ));
    }
    if cfg.watch.poll_interval_secs == 0 {
        return Err(anyhow!("invalid watch poll interval: must be >= 1 second"));
    }
    if cfg.sections.is_empty() {
        return Err(anyhow!("invalid section catalog: at least one section required"));
    }

    let mut keys = BTreeSet::new();
    let mut headers = BTreeSet::new();
    for section in &cfg.sections {
        if section.key.trim().is_empty() || section.header.trim().is_empty() {
            return Err(anyhow!(
                "invalid section catalog: key and header cannot be empty"
            ));
        }
        if section.header.trim() != section.header {
            return Err(anyhow!(
                "invalid section header {:?}: surrounding whitespace never matches a trimmed line",
                section.header
            ));
        }
        if !keys.insert(section.key.to_ascii_lowercase()) {
            return Err(anyhow!("duplicate section key: {}", section.key));
        }
        if !headers.insert(section.header.as_str()) {
            return Err(anyhow!("duplicate section header: {}", section.header));
        }
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("INTEL_REPORT_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".intel-report").join("config.toml"))
}

fn merge_toml(base: &mut IntelConfig, raw: &str, origin: &str) -> Result<()> {
    let parsed: PartialIntelConfig = toml::from_str(raw)
        .map_err(|err| anyhow!("failed to parse intel-report config {origin}: {err}"))?;
    if let Some(archive) = parsed.archive {
        base.archive = archive;
    }
    if let Some(watch) = parsed.watch {
        base.watch = watch;
    }
    if let Some(sections) = parsed.sections {
        base.sections = sections;
    }
    Ok(())
}

fn merge_file_config(base: &mut IntelConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw, &path.display().to_string())
}

fn apply_env_overrides(cfg: &mut IntelConfig) {
    cfg.archive.file_prefix = env_or_string("INTEL_REPORT_FILE_PREFIX", &cfg.archive.file_prefix);
    cfg.archive.skip_unchanged =
        env_or_bool("INTEL_REPORT_SKIP_UNCHANGED", cfg.archive.skip_unchanged);
    cfg.archive.lock_wait_ms = env_or_u64("INTEL_REPORT_LOCK_WAIT_MS", cfg.archive.lock_wait_ms);
    cfg.watch.poll_interval_secs = env_or_u64(
        "INTEL_REPORT_POLL_INTERVAL_SECS",
        cfg.watch.poll_interval_secs,
    );
    cfg.watch.max_cycles = env_or_u64("INTEL_REPORT_MAX_CYCLES", cfg.watch.max_cycles);
}

pub fn load_config() -> Result<IntelConfig> {
    let mut cfg = IntelConfig::default();
    merge_file_config(&mut cfg)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}
