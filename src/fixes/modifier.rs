//! File mutation with backup discipline.
//!
//! Invariant: a verified-readable backup exists before the original
//! file is overwritten, and any failure between backup and commit
//! restores the original bytes. Apply is all-or-nothing per file.

use crate::config::FixConfig;
use crate::core::errors::{FixError, RollbackError};
use crate::core::CodeChange;
use crate::parser::go;
use chrono::Utc;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use which::which;

pub struct CodeModifier {
    config: FixConfig,
}

impl CodeModifier {
    pub fn new(config: FixConfig) -> Self {
        Self { config }
    }

    /// Copy `file` into the backup directory under a timestamped name
    /// and verify the copy is readable before returning it.
    pub fn create_backup(&self, file: &Path) -> Result<PathBuf, FixError> {
        let dir = match &self.config.backup_dir {
            Some(dir) => dir.clone(),
            None => file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(".testmedic_backups"),
        };
        fs::create_dir_all(&dir).map_err(|e| FixError::BackupFailed {
            path: file.to_path_buf(),
            message: format!("creating {}: {e}", dir.display()),
        })?;

        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FixError::BackupFailed {
                path: file.to_path_buf(),
                message: "target has no file name".to_string(),
            })?;
        let stamp = Utc::now().format("%Y%m%d%H%M%S%.3f");
        let backup = dir.join(format!("{file_name}.{stamp}.bak"));

        fs::copy(file, &backup).map_err(|e| FixError::BackupFailed {
            path: file.to_path_buf(),
            message: e.to_string(),
        })?;
        // Verify before the original is touched.
        let original = fs::read(file).map_err(|e| FixError::BackupFailed {
            path: file.to_path_buf(),
            message: e.to_string(),
        })?;
        let copied = fs::read(&backup).map_err(|e| FixError::BackupFailed {
            path: backup.clone(),
            message: format!("backup unreadable: {e}"),
        })?;
        if original != copied {
            return Err(FixError::BackupFailed {
                path: backup,
                message: "backup does not match the original".to_string(),
            });
        }
        debug!("backed up {} to {}", file.display(), backup.display());
        Ok(backup)
    }

    /// Apply one change: a line-range splice, or a new-file write when
    /// the change carries the new-file shape. Reformats the result.
    pub fn apply_change(&self, change: &CodeChange) -> Result<(), FixError> {
        if change.is_new_file() && !change.file.exists() {
            self.write_new_file(change)?;
        } else {
            self.splice(change)?;
        }
        self.reformat(&change.file)
    }

    fn splice(&self, change: &CodeChange) -> Result<(), FixError> {
        let source = fs::read_to_string(&change.file).map_err(|e| FixError::WriteFailed {
            path: change.file.clone(),
            source: e,
        })?;
        let lines: Vec<&str> = source.lines().collect();
        if change.line_start == 0
            || change.line_start > change.line_end
            || change.line_end > lines.len()
        {
            return Err(FixError::InvalidLineRange {
                path: change.file.clone(),
                line_start: change.line_start,
                line_end: change.line_end,
                file_lines: lines.len(),
            });
        }

        let mut out: Vec<&str> = Vec::with_capacity(lines.len());
        out.extend(&lines[..change.line_start - 1]);
        out.extend(change.new_code.lines());
        out.extend(&lines[change.line_end..]);
        let mut text = out.join("\n");
        if source.ends_with('\n') {
            text.push('\n');
        }

        fs::write(&change.file, text).map_err(|e| FixError::WriteFailed {
            path: change.file.clone(),
            source: e,
        })
    }

    fn write_new_file(&self, change: &CodeChange) -> Result<(), FixError> {
        let mut code = change.new_code.clone();
        if !code.contains("package ") {
            let package = change
                .file
                .parent()
                .and_then(infer_package)
                .unwrap_or_else(|| "main".to_string());
            code = format!("package {package}\n\n{code}");
        }
        if let Some(parent) = change.file.parent() {
            fs::create_dir_all(parent).map_err(|e| FixError::WriteFailed {
                path: change.file.clone(),
                source: e,
            })?;
        }
        fs::write(&change.file, code).map_err(|e| FixError::WriteFailed {
            path: change.file.clone(),
            source: e,
        })
    }

    /// Run `gofmt -w` when enabled and present on PATH; absence is a
    /// warning, a rejection is an error.
    fn reformat(&self, file: &Path) -> Result<(), FixError> {
        if !self.config.reformat {
            return Ok(());
        }
        let gofmt = match which("gofmt") {
            Ok(path) => path,
            Err(_) => {
                warn!("gofmt not on PATH; skipping reformat of {}", file.display());
                return Ok(());
            }
        };
        let output = Command::new(gofmt)
            .arg("-w")
            .arg(file)
            .output()
            .map_err(|e| FixError::FormatFailed {
                path: file.to_path_buf(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(FixError::FormatFailed {
                path: file.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

/// Restore `target` from `backup`.
pub fn restore(backup: &Path, target: &Path) -> Result<(), RollbackError> {
    let data = fs::read(backup).map_err(|source| RollbackError::UnreadableBackup {
        path: backup.to_path_buf(),
        source,
    })?;
    fs::write(target, data).map_err(|source| RollbackError::RestoreFailed {
        path: target.to_path_buf(),
        source,
    })
}

/// Package clause of the first parseable `.go` file in `dir`, or the
/// directory name.
fn infer_package(dir: &Path) -> Option<String> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("go"))
        .collect();
    files.sort();
    for file in files {
        let Ok(source) = fs::read_to_string(&file) else {
            continue;
        };
        let Ok(tree) = go::parse_source(&source) else {
            continue;
        };
        if let Some(package) = go::package_name(&tree, &source) {
            return Some(package);
        }
    }
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
}

/// Restores the target from its backup on drop unless committed.
pub struct BackupGuard<'a> {
    backup: &'a Path,
    target: &'a Path,
    committed: bool,
}

impl<'a> BackupGuard<'a> {
    pub fn new(backup: &'a Path, target: &'a Path) -> Self {
        Self {
            backup,
            target,
            committed: false,
        }
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for BackupGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = restore(self.backup, self.target) {
            warn!(
                "could not restore {} from {}: {err}",
                self.target.display(),
                self.backup.display()
            );
        }
    }
}
