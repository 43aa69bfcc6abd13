pub mod ast;
pub mod errors;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::errors::FixError;

/// Classification of a collected test function.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TestKind {
    Unit,
    Integration,
    Load,
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(TestKind, &str)] = &[
            (TestKind::Unit, "Unit"),
            (TestKind::Integration, "Integration"),
            (TestKind::Load, "Load"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(k, _)| k == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");

        write!(f, "{display_str}")
    }
}

/// The nine detector verdict kinds, plus `Other` for issues carried in
/// from external tooling. The fix table matches exhaustively over this.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IssueKind {
    InfiniteLoop,
    MissingTimeout,
    LargeIteration,
    HighConcurrency,
    SleepDelay,
    ActualImplementationUsage,
    MixedMockRealUsage,
    MissingMock,
    BenchmarkHelperUsage,
    Other,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(IssueKind, &str)] = &[
            (IssueKind::InfiniteLoop, "InfiniteLoop"),
            (IssueKind::MissingTimeout, "MissingTimeout"),
            (IssueKind::LargeIteration, "LargeIteration"),
            (IssueKind::HighConcurrency, "HighConcurrency"),
            (IssueKind::SleepDelay, "SleepDelay"),
            (
                IssueKind::ActualImplementationUsage,
                "ActualImplementationUsage",
            ),
            (IssueKind::MixedMockRealUsage, "MixedMockRealUsage"),
            (IssueKind::MissingMock, "MissingMock"),
            (IssueKind::BenchmarkHelperUsage, "BenchmarkHelperUsage"),
            (IssueKind::Other, "Other"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(k, _)| k == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");

        write!(f, "{display_str}")
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(Severity, &str)] = &[
            (Severity::Low, "Low"),
            (Severity::Medium, "Medium"),
            (Severity::High, "High"),
            (Severity::Critical, "Critical"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(s, _)| s == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");

        write!(f, "{display_str}")
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FixKind {
    AddTimeout,
    AddLoopExit,
    ReduceIterations,
    OptimizeSleep,
    ReplaceWithMock,
    CreateMock,
}

impl std::fmt::Display for FixKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(FixKind, &str)] = &[
            (FixKind::AddTimeout, "AddTimeout"),
            (FixKind::AddLoopExit, "AddLoopExit"),
            (FixKind::ReduceIterations, "ReduceIterations"),
            (FixKind::OptimizeSleep, "OptimizeSleep"),
            (FixKind::ReplaceWithMock, "ReplaceWithMock"),
            (FixKind::CreateMock, "CreateMock"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(k, _)| k == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");

        write!(f, "{display_str}")
    }
}

/// Strict forward state machine; `RolledBack` is the only backward-ish
/// transition and is reachable from `Applied` or `Failed`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FixStatus {
    Proposed,
    Applied,
    Validated,
    Failed,
    RolledBack,
}

impl FixStatus {
    pub fn can_transition_to(self, next: FixStatus) -> bool {
        use FixStatus::*;
        matches!(
            (self, next),
            (Proposed, Applied)
                | (Applied, Validated)
                | (Applied, Failed)
                | (Applied, RolledBack)
                | (Failed, RolledBack)
        )
    }
}

impl std::fmt::Display for FixStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(FixStatus, &str)] = &[
            (FixStatus::Proposed, "Proposed"),
            (FixStatus::Applied, "Applied"),
            (FixStatus::Validated, "Validated"),
            (FixStatus::Failed, "Failed"),
            (FixStatus::RolledBack, "RolledBack"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(s, _)| s == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");

        write!(f, "{display_str}")
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MockStatus {
    Template,
    Complete,
    Validated,
}

impl std::fmt::Display for MockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(MockStatus, &str)] = &[
            (MockStatus::Template, "Template"),
            (MockStatus::Complete, "Complete"),
            (MockStatus::Validated, "Validated"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(s, _)| s == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");

        write!(f, "{display_str}")
    }
}

/// A parsed test source file and the functions collected from it.
/// Immutable after parsing; owned by the analysis run.
#[derive(Clone, Debug, Serialize)]
pub struct TestFile {
    pub path: PathBuf,
    pub package: String,
    pub is_integration_suite: bool,
    #[serde(skip)]
    pub source: String,
    pub functions: Vec<TestFunction>,
}

/// One collected test function. Created by the parser; the detection
/// engine appends to `issues`.
#[derive(Clone, Debug, Serialize)]
pub struct TestFunction {
    pub name: String,
    pub kind: TestKind,
    /// Back-reference to the owning file, by path.
    pub file: PathBuf,
    pub package: String,
    pub is_integration_suite: bool,
    pub line_start: usize,
    pub line_end: usize,
    pub has_timeout: bool,
    #[serde(skip)]
    pub timeout_duration: Option<Duration>,
    pub uses_real_implementation: bool,
    pub uses_mocks: bool,
    pub mixed_usage: bool,
    #[serde(skip)]
    pub body: Vec<ast::Stmt>,
    pub issues: Vec<PerformanceIssue>,
}

impl TestFunction {
    pub fn location(&self) -> Location {
        Location {
            file: self.file.clone(),
            function: self.name.clone(),
            line_start: self.line_start,
            line_end: self.line_end,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub function: String,
    pub line_start: usize,
    pub line_end: usize,
}

/// A single detector finding. Immutable once produced; `context` holds
/// detector-specific evidence (counts, durations, matched names).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub location: Location,
    pub description: String,
    pub context: HashMap<String, serde_json::Value>,
    pub fixable: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CodeChange {
    pub file: PathBuf,
    pub line_start: usize,
    pub line_end: usize,
    pub old_code: String,
    pub new_code: String,
    pub description: String,
}

impl CodeChange {
    /// A change with `line_start == line_end == 1` and empty old text
    /// denotes "create a new file".
    pub fn is_new_file(&self) -> bool {
        self.line_start == 1 && self.line_end == 1 && self.old_code.is_empty()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Fix {
    pub issue: PerformanceIssue,
    pub kind: FixKind,
    pub changes: Vec<CodeChange>,
    pub status: FixStatus,
    pub backup_path: Option<PathBuf>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl Fix {
    pub fn proposed(issue: PerformanceIssue, kind: FixKind, changes: Vec<CodeChange>) -> Self {
        Self {
            issue,
            kind,
            changes,
            status: FixStatus::Proposed,
            backup_path: None,
            applied_at: None,
        }
    }

    /// Advance the status, rejecting transitions outside the state
    /// machine.
    pub fn transition(&mut self, next: FixStatus) -> Result<(), FixError> {
        if !self.status.can_transition_to(next) {
            return Err(FixError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationResult {
    pub fix_kind: FixKind,
    pub target: PathBuf,
    pub interface_compatible: bool,
    pub tests_pass: bool,
    pub execution_time_improved: bool,
    #[serde(with = "duration_ms")]
    pub original_execution_time: Duration,
    #[serde(with = "duration_ms")]
    pub new_execution_time: Duration,
    pub errors: Vec<String>,
    pub test_output: String,
    pub validated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnValue {
    pub name: String,
    pub type_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub returns: Vec<ReturnValue>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MockImplementation {
    pub component_name: String,
    pub interface_name: String,
    pub package: String,
    pub file_path: PathBuf,
    pub code: String,
    pub interface_methods: Vec<MethodSignature>,
    pub status: MockStatus,
    pub requires_manual_completion: bool,
    pub generated_at: DateTime<Utc>,
}

/// Run-level summary handed to external report renderers. The core has
/// no knowledge of output formats; this is just serializable data.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AnalysisReport {
    pub packages_analyzed: usize,
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub functions_analyzed: usize,
    pub issues_found: usize,
    pub issues_by_kind: HashMap<IssueKind, usize>,
    pub issues_by_severity: HashMap<Severity, usize>,
    pub issues_by_package: HashMap<String, usize>,
    pub fixes_applied: usize,
    pub fixes_failed: usize,
    pub files: Vec<FileSummary>,
    pub execution_time_ms: u64,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub package: String,
    pub functions: usize,
    pub issues: Vec<PerformanceIssue>,
}

/// Cooperative cancellation signal, checked between files and between
/// functions during parsing and extraction. Detectors are non-blocking
/// pure computations and do not check it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::SeqCst)
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
