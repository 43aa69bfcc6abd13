//! The fix engine: resolve an issue to its fix kind, generate changes,
//! apply them under backup discipline, and roll back on request.

pub mod generators;
pub mod modifier;

pub use modifier::{BackupGuard, CodeModifier};

use crate::config::FixConfig;
use crate::core::errors::{FixError, RollbackError};
use crate::core::{Fix, FixKind, FixStatus, IssueKind, PerformanceIssue};
use chrono::Utc;
use log::{debug, info};

pub struct FixEngine {
    config: FixConfig,
    modifier: CodeModifier,
}

impl FixEngine {
    pub fn new(config: FixConfig) -> Self {
        let modifier = CodeModifier::new(config.clone());
        Self { config, modifier }
    }

    /// The fixed 1:1 issue→fix table. `HighConcurrency` is flagged
    /// fixable by its detector but has no automated rewrite, so it
    /// lands here as not applicable.
    pub fn determine_fix_kind(issue: &PerformanceIssue) -> Result<FixKind, FixError> {
        match issue.kind {
            IssueKind::InfiniteLoop => Ok(FixKind::AddLoopExit),
            IssueKind::MissingTimeout => Ok(FixKind::AddTimeout),
            IssueKind::LargeIteration => Ok(FixKind::ReduceIterations),
            IssueKind::SleepDelay => Ok(FixKind::OptimizeSleep),
            IssueKind::ActualImplementationUsage => Ok(FixKind::ReplaceWithMock),
            IssueKind::MixedMockRealUsage => Ok(FixKind::ReplaceWithMock),
            IssueKind::MissingMock => Ok(FixKind::CreateMock),
            IssueKind::HighConcurrency | IssueKind::BenchmarkHelperUsage | IssueKind::Other => {
                Err(FixError::NotApplicable(issue.kind))
            }
        }
    }

    /// Generate and apply the fix for one issue. On success the
    /// returned fix is `Applied` with a recorded backup; on any failure
    /// the target file keeps its original bytes.
    pub fn apply_fix(&self, issue: &PerformanceIssue) -> Result<Fix, FixError> {
        let kind = Self::determine_fix_kind(issue)?;
        let changes = generators::generate(issue, kind, &self.config)?;

        let backup = self.modifier.create_backup(&issue.location.file)?;
        let guard = BackupGuard::new(&backup, &issue.location.file);
        for change in &changes {
            debug!("applying to {}: {}", change.file.display(), change.description);
            self.modifier.apply_change(change)?;
        }
        guard.commit();

        let mut fix = Fix::proposed(issue.clone(), kind, changes);
        fix.backup_path = Some(backup);
        fix.applied_at = Some(Utc::now());
        fix.transition(FixStatus::Applied)?;
        info!(
            "applied {kind} to {}:{}",
            issue.location.file.display(),
            issue.location.line_start
        );
        Ok(fix)
    }

    /// Restore the fixed file from its backup. Requires a recorded
    /// backup path and an `Applied` or `Failed` fix; new files created
    /// by the fix are left in place for review.
    pub fn rollback_fix(&self, fix: &mut Fix) -> Result<(), RollbackError> {
        let from = fix.status;
        if !from.can_transition_to(FixStatus::RolledBack) {
            return Err(RollbackError::InvalidState { from });
        }
        let backup = fix.backup_path.as_deref().ok_or(RollbackError::MissingBackup)?;
        modifier::restore(backup, &fix.issue.location.file)?;
        fix.transition(FixStatus::RolledBack)
            .map_err(|_| RollbackError::InvalidState { from })?;
        info!("rolled back {} from backup", fix.issue.location.file.display());
        Ok(())
    }
}
