//! The detection engine: nine stateless detectors run against each test
//! function's syntax subtree; results are concatenated with no
//! cross-detector de-duplication. Detectors never error; anything they
//! cannot resolve statically degrades to "no issues".

pub mod benchmark_helper;
pub mod concurrency;
pub mod infinite_loop;
pub mod iteration;
pub mod mock_usage;
pub mod sleep;
pub mod timeout;

pub use benchmark_helper::BenchmarkHelperUsageDetector;
pub use concurrency::HighConcurrencyDetector;
pub use infinite_loop::InfiniteLoopDetector;
pub use iteration::LargeIterationDetector;
pub use mock_usage::{
    ActualImplementationUsageDetector, MissingMockDetector, MixedMockRealUsageDetector,
};
pub use sleep::SleepDelayDetector;
pub use timeout::MissingTimeoutDetector;

use crate::config::DetectorConfig;
use crate::core::ast::{self, ForStmt, Stmt};
use crate::core::{PerformanceIssue, TestFile, TestFunction};

pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, func: &TestFunction) -> Vec<PerformanceIssue>;
}

pub struct DetectionEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectionEngine {
    pub fn new(config: DetectorConfig) -> Self {
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(InfiniteLoopDetector::new()),
            Box::new(MissingTimeoutDetector::new()),
            Box::new(LargeIterationDetector::new(config.clone())),
            Box::new(HighConcurrencyDetector::new(config.clone())),
            Box::new(SleepDelayDetector::new(config.clone())),
            Box::new(ActualImplementationUsageDetector::new(config.clone())),
            Box::new(MixedMockRealUsageDetector::new(config.clone())),
            Box::new(MissingMockDetector::new(config.clone())),
            Box::new(BenchmarkHelperUsageDetector::new(config)),
        ];
        Self { detectors }
    }

    /// Run every detector against one function and concatenate findings.
    pub fn detect_all(&self, func: &TestFunction) -> Vec<PerformanceIssue> {
        self.detectors
            .iter()
            .flat_map(|d| d.detect(func))
            .collect()
    }

    /// Populate `issues` on every function of a parsed file. This is
    /// the only mutation `TestFunction` sees after parsing.
    pub fn annotate_file(&self, file: &mut TestFile) {
        for func in &mut file.functions {
            let issues = self.detect_all(func);
            func.issues.extend(issues);
        }
    }
}

/// All loops in a body, outermost first.
pub(crate) fn collect_loops(body: &[Stmt]) -> Vec<&ForStmt> {
    let mut loops = Vec::new();
    ast::walk_stmts(body, &mut |stmt| {
        if let Stmt::For(fs) = stmt {
            loops.push(fs);
        }
    });
    loops
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::config::DetectorConfig;
    use crate::core::{CancelToken, TestFunction};
    use crate::parser;
    use std::path::Path;

    /// Parse a single-function Go source into a `TestFunction` for
    /// detector unit tests.
    pub fn function(file_name: &str, source: &str) -> TestFunction {
        let file = parser::parse_source(
            Path::new(file_name),
            source,
            &DetectorConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        file.functions.into_iter().next().expect("no test function")
    }

    pub fn functions(file_name: &str, source: &str) -> Vec<TestFunction> {
        parser::parse_source(
            Path::new(file_name),
            source,
            &DetectorConfig::default(),
            &CancelToken::new(),
        )
        .unwrap()
        .functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IssueKind, Severity};
    use indoc::indoc;

    #[test]
    fn detect_all_concatenates_without_cross_detector_dedup() {
        let func = testutil::function(
            "demo_test.go",
            indoc! {r#"
                package demo

                func TestBusy(t *testing.T) {
                    client := NewHTTPClient()
                    _ = client
                    for {
                    }
                }
            "#},
        );
        let engine = DetectionEngine::new(DetectorConfig::default());
        let issues = engine.detect_all(&func);

        let kinds: Vec<IssueKind> = issues.iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&IssueKind::InfiniteLoop));
        assert!(kinds.contains(&IssueKind::MissingTimeout));
        assert!(kinds.contains(&IssueKind::ActualImplementationUsage));
    }

    #[test]
    fn annotate_file_appends_issues() {
        let mut file = crate::parser::parse_source(
            std::path::Path::new("demo_test.go"),
            "package demo\n\nfunc TestBare(t *testing.T) {\n\t_ = 1\n}\n",
            &DetectorConfig::default(),
            &crate::core::CancelToken::new(),
        )
        .unwrap();
        let engine = DetectionEngine::new(DetectorConfig::default());
        engine.annotate_file(&mut file);
        assert_eq!(file.functions[0].issues.len(), 1);
        assert_eq!(file.functions[0].issues[0].kind, IssueKind::MissingTimeout);
        assert_eq!(file.functions[0].issues[0].severity, Severity::High);
    }
}
