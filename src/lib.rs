//! testmedic analyzes Go test suites for performance problems and can
//! apply validated automated fixes.
//!
//! The pipeline: [`parser`] lowers `*_test.go` files through
//! tree-sitter into a small Go IR, [`detectors`] runs the heuristic
//! detectors over each collected test function, [`fixes`] rewrites
//! flagged code under backup discipline, [`validation`] re-runs the
//! affected package's tests to confirm a fix, and [`mocks`] synthesizes
//! test doubles for interfaces that lack one. [`analysis`] wires the
//! stages into a run over a whole module tree.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod detectors;
pub mod fixes;
pub mod mocks;
pub mod parser;
pub mod report;
pub mod validation;

pub use analysis::{AnalysisOptions, Analyzer};
pub use config::{AnalyzerConfig, DetectorConfig, FixConfig};
pub use core::{
    AnalysisReport, CancelToken, Fix, FixKind, FixStatus, IssueKind, PerformanceIssue, Severity,
    TestFile, TestFunction, TestKind,
};
