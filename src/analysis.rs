//! The analysis runner: discover test files, parse and detect in
//! parallel, then apply/validate/rollback fixes serially.
//!
//! Per-file failures are isolated; a file that fails to read or parse
//! is counted as skipped and the run continues. The fix phase is
//! serialized because fixes mutate shared files and validation re-runs
//! the package's tests, which would race under concurrent mutation.

use crate::config::AnalyzerConfig;
use crate::core::errors::AnalyzerError;
use crate::core::{
    AnalysisReport, CancelToken, FileSummary, FixStatus, PerformanceIssue, TestFile,
};
use crate::detectors::DetectionEngine;
use crate::fixes::FixEngine;
use crate::parser;
use crate::validation::ValidationEngine;
use anyhow::Context;
use chrono::Utc;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Apply the automated fix for every fixable issue found.
    pub apply_fixes: bool,
    /// Run `go test` validation after each applied fix and roll back
    /// fixes that fail it. Ignored unless `apply_fixes` is set.
    pub validate: bool,
    /// Bound on each validation test run.
    pub test_timeout: Option<Duration>,
}

pub struct Analyzer {
    config: AnalyzerConfig,
    cancel: CancelToken,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig, cancel: CancelToken) -> Self {
        Self { config, cancel }
    }

    /// Analyze every `*_test.go` under `root` and produce the run
    /// report.
    pub fn run(&self, root: &Path, options: &AnalysisOptions) -> anyhow::Result<AnalysisReport> {
        let started = Instant::now();
        let targets = collect_test_files(root)
            .with_context(|| format!("scanning {}", root.display()))?;
        info!("found {} test files under {}", targets.len(), root.display());

        let engine = DetectionEngine::new(self.config.detectors.clone());
        let results: Vec<Result<TestFile, AnalyzerError>> = targets
            .par_iter()
            .map(|path| {
                let mut file = parser::parse_file(path, &self.config.detectors, &self.cancel)?;
                engine.annotate_file(&mut file);
                Ok(file)
            })
            .collect();

        let mut files = Vec::new();
        let mut skipped = 0usize;
        for result in results {
            match result {
                Ok(file) => files.push(file),
                Err(AnalyzerError::Cancelled) => skipped += 1,
                Err(err) => {
                    warn!("skipping file: {err}");
                    skipped += 1;
                }
            }
        }

        let (fixes_applied, fixes_failed) =
            if options.apply_fixes && !self.cancel.is_cancelled() {
                self.fix_phase(&files, options)
            } else {
                (0, 0)
            };

        let mut report = summarize(&files);
        report.files_skipped = skipped;
        report.fixes_applied = fixes_applied;
        report.fixes_failed = fixes_failed;
        report.execution_time_ms = started.elapsed().as_millis() as u64;
        report.generated_at = Some(Utc::now());
        Ok(report)
    }

    /// Apply fixes one file at a time, bottom-up within each file so a
    /// splice never shifts the line range of a fix still to come.
    fn fix_phase(&self, files: &[TestFile], options: &AnalysisOptions) -> (usize, usize) {
        let fix_engine = FixEngine::new(self.config.fixes.clone());
        let validator = if options.validate {
            match ValidationEngine::new(options.test_timeout) {
                Ok(engine) => Some(engine),
                Err(err) => {
                    warn!("fix validation disabled: {err}");
                    None
                }
            }
        } else {
            None
        };

        let mut applied = 0usize;
        let mut failed = 0usize;
        for file in files {
            if self.cancel.is_cancelled() {
                break;
            }
            let mut issues: Vec<&PerformanceIssue> = file
                .functions
                .iter()
                .flat_map(|f| f.issues.iter())
                .filter(|issue| issue.fixable)
                .collect();
            issues.sort_by(|a, b| b.location.line_start.cmp(&a.location.line_start));

            for issue in issues {
                if self.cancel.is_cancelled() {
                    break;
                }
                let mut fix = match fix_engine.apply_fix(issue) {
                    Ok(fix) => fix,
                    Err(err) => {
                        debug!("fix not applied for {} issue: {err}", issue.kind);
                        failed += 1;
                        continue;
                    }
                };
                let Some(validator) = &validator else {
                    applied += 1;
                    continue;
                };
                match validator.validate_fix(&mut fix, None) {
                    Ok(_) if fix.status == FixStatus::Validated => applied += 1,
                    Ok(result) => {
                        warn!(
                            "fix on {} failed validation: {}",
                            issue.location.file.display(),
                            result.errors.join("; ")
                        );
                        if let Err(err) = fix_engine.rollback_fix(&mut fix) {
                            warn!("rollback failed, file may be partially fixed: {err}");
                        }
                        failed += 1;
                    }
                    Err(err) => {
                        warn!("validation infrastructure error: {err}");
                        if let Err(err) = fix_engine.rollback_fix(&mut fix) {
                            warn!("rollback failed, file may be partially fixed: {err}");
                        }
                        failed += 1;
                    }
                }
            }
        }
        (applied, failed)
    }
}

/// Issue counters and per-file summaries; everything except the
/// fix-phase and timing fields.
fn summarize(files: &[TestFile]) -> AnalysisReport {
    let mut report = AnalysisReport::default();
    let mut packages: HashSet<&str> = HashSet::new();

    for file in files {
        packages.insert(file.package.as_str());
        report.files_analyzed += 1;
        report.functions_analyzed += file.functions.len();

        let issues: Vec<PerformanceIssue> = file
            .functions
            .iter()
            .flat_map(|f| f.issues.iter().cloned())
            .collect();
        for issue in &issues {
            report.issues_found += 1;
            *report.issues_by_kind.entry(issue.kind).or_default() += 1;
            *report.issues_by_severity.entry(issue.severity).or_default() += 1;
            *report
                .issues_by_package
                .entry(file.package.clone())
                .or_default() += 1;
        }
        report.files.push(FileSummary {
            path: file.path.clone(),
            package: file.package.clone(),
            functions: file.functions.len(),
            issues,
        });
    }
    report.packages_analyzed = packages.len();
    report
}

/// All `*_test.go` files under `root`, skipping hidden directories,
/// `vendor/`, `testdata/` and backup directories.
fn collect_test_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    // depth 0 is the root itself; a hidden root is still analyzable
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded_dir(e))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.ends_with("_test.go") {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "vendor"
        || name == "testdata"
        || name == ".testmedic_backups"
        || (name.starts_with('.') && name.len() > 1)
}
