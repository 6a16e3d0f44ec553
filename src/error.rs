use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("live report not found: {}", path.display())]
    SourceMissing { path: PathBuf },
    #[error("failed to archive report to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("version {version} already archived at {}; refusing to overwrite", path.display())]
    VersionExists { version: u64, path: PathBuf },
    #[error("version store busy: could not lock {}", path.display())]
    StoreBusy { path: PathBuf },
    #[error(transparent)]
    Guard(#[from] GuardError),
}

impl ArchiveError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SourceMissing { .. } => ErrorCode::E002SourceMissing,
            Self::Write { .. } => ErrorCode::E003ArchiveWrite,
            Self::VersionExists { .. } => ErrorCode::E004VersionExists,
            Self::StoreBusy { .. } => ErrorCode::E005StoreBusy,
            Self::Guard(err) => err.code(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("session marker already held: {}", path.display())]
    AlreadyHeld { path: PathBuf },
    #[error("session marker io failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GuardError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyHeld { .. } => ErrorCode::E001SessionHeld,
            Self::Io { .. } => ErrorCode::E006MarkerIo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    ComputationalTime,
    BestObjective,
    TotalSolutions,
}

impl MetricField {
    pub fn label(self) -> &'static str {
        match self {
            Self::ComputationalTime => "Computational time",
            Self::BestObjective => "Best objective value",
            Self::TotalSolutions => "Total solutions found",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("malformed `{}` on line {line_number}: {reason} (line: {line:?})", field.label())]
pub struct MetricParseError {
    pub line_number: usize,
    pub line: String,
    pub field: MetricField,
    pub reason: String,
}

impl MetricParseError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::E007MetricMalformed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    E001SessionHeld,
    E002SourceMissing,
    E003ArchiveWrite,
    E004VersionExists,
    E005StoreBusy,
    E006MarkerIo,
    E007MetricMalformed,
    E008ReportUnreadable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001SessionHeld => "E001_SESSION_HELD",
            Self::E002SourceMissing => "E002_SOURCE_MISSING",
            Self::E003ArchiveWrite => "E003_ARCHIVE_WRITE",
            Self::E004VersionExists => "E004_VERSION_EXISTS",
            Self::E005StoreBusy => "E005_STORE_BUSY",
            Self::E006MarkerIo => "E006_MARKER_IO",
            Self::E007MetricMalformed => "E007_METRIC_MALFORMED",
            Self::E008ReportUnreadable => "E008_REPORT_UNREADABLE",
        }
    }
}
