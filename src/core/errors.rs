//! Error taxonomy for the detect→fix→validate→rollback pipeline.
//!
//! Per-file and per-fix failures are isolated: a parse error skips one
//! file, a `FixError` aborts one fix with the target file restored, and
//! a `RollbackError` must be surfaced loudly because the file may be
//! left in a partially-fixed state.

use crate::core::{FixStatus, IssueKind};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading or parsing a source file. Fatal for that
/// file only; the surrounding run continues.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("syntax error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalyzerError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors from the fix engine. Any of these leaves the target file in
/// its pre-fix state.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("no automated fix is applicable to {0} issues")]
    NotApplicable(IssueKind),

    #[error("invalid line range {line_start}..{line_end} for {path} ({file_lines} lines)")]
    InvalidLineRange {
        path: PathBuf,
        line_start: usize,
        line_end: usize,
        file_lines: usize,
    },

    #[error("backing up {path} failed: {message}")]
    BackupFailed { path: PathBuf, message: String },

    #[error("writing {path} failed: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("gofmt rejected {path}: {message}")]
    FormatFailed { path: PathBuf, message: String },

    #[error("fix status may not move from {from} to {to}")]
    InvalidTransition { from: FixStatus, to: FixStatus },

    #[error("generating code changes failed: {0}")]
    Generation(String),
}

/// Errors from an explicit rollback request.
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("fix has no recorded backup")]
    MissingBackup,

    #[error("a {from} fix cannot be rolled back")]
    InvalidState { from: FixStatus },

    #[error("backup {path} is unreadable: {source}")]
    UnreadableBackup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("restoring {path} failed: {source}")]
    RestoreFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors from the mock synthesizer's interface lookup.
#[derive(Debug, Error)]
pub enum MockError {
    #[error("interface {interface} not found in {package}")]
    InterfaceNotFound { interface: String, package: PathBuf },

    #[error("failed to scan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {path} while searching for interfaces")]
    Parse { path: PathBuf },
}

/// Infrastructure failures inside the validation engine. Interface
/// incompatibility and failing tests are *not* errors; they are recorded
/// in the `ValidationResult`.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("go toolchain not found on PATH")]
    GoMissing,

    #[error("failed to launch test run in {package}: {source}")]
    Spawn {
        package: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("test run exceeded the {0:?} bound")]
    TimedOut(Duration),
}
