use std::fs;
use std::path::Path;
use tempfile::TempDir;
use testmedic::core::{CancelToken, IssueKind, Severity};
use testmedic::{AnalysisOptions, Analyzer, AnalyzerConfig};

fn write_test_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn analyze(dir: &Path, config: AnalyzerConfig) -> testmedic::AnalysisReport {
    Analyzer::new(config, CancelToken::new())
        .run(dir, &AnalysisOptions::default())
        .unwrap()
}

fn issues_of_kind(
    report: &testmedic::AnalysisReport,
    kind: IssueKind,
) -> Vec<testmedic::PerformanceIssue> {
    report
        .files
        .iter()
        .flat_map(|f| f.issues.iter())
        .filter(|i| i.kind == kind)
        .cloned()
        .collect()
}

#[test]
fn bare_infinite_loop_is_critical_and_fixable() {
    let dir = TempDir::new().unwrap();
    write_test_file(
        dir.path(),
        "spin_test.go",
        r#"package demo

func TestSpin(t *testing.T) {
	for {
	}
}
"#,
    );

    let report = analyze(dir.path(), AnalyzerConfig::default());
    let loops = issues_of_kind(&report, IssueKind::InfiniteLoop);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].severity, Severity::Critical);
    assert!(loops[0].fixable);
    assert_eq!(loops[0].location.function, "TestSpin");
}

#[test]
fn thousand_iteration_loop_reports_bound_and_threshold() {
    let dir = TempDir::new().unwrap();
    write_test_file(
        dir.path(),
        "busy_test.go",
        r#"package demo

func TestBusy(t *testing.T) {
	for i := 0; i < 1000; i++ {
		_ = i
	}
}
"#,
    );

    let report = analyze(dir.path(), AnalyzerConfig::default());
    let issues = issues_of_kind(&report, IssueKind::LargeIteration);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Medium);
    assert_eq!(issues[0].context["iterations"], 1000);
    assert_eq!(issues[0].context["threshold"], 100);
}

#[test]
fn sleep_totals_accumulate_across_calls() {
    let dir = TempDir::new().unwrap();
    write_test_file(
        dir.path(),
        "slow_test.go",
        r#"package demo

func TestSlow(t *testing.T) {
	time.Sleep(50 * time.Millisecond)
	doWork()
	time.Sleep(30 * time.Millisecond)
	time.Sleep(40 * time.Millisecond)
}
"#,
    );

    let report = analyze(dir.path(), AnalyzerConfig::default());
    let issues = issues_of_kind(&report, IssueKind::SleepDelay);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].context["total_sleep"], "120ms");
    assert_eq!(issues[0].context["sleep_count"], 3);

    // the same file is clean under a 150ms threshold
    let mut lenient = AnalyzerConfig::default();
    lenient.detectors.sleep_threshold_ms = 150;
    let report = analyze(dir.path(), lenient);
    assert!(issues_of_kind(&report, IssueKind::SleepDelay).is_empty());
}

#[test]
fn integration_suite_timeout_issue_is_medium() {
    let dir = TempDir::new().unwrap();
    write_test_file(
        dir.path(),
        "api_integration_test.go",
        r#"package demo

func TestEndToEnd(t *testing.T) {
	runPipeline()
}
"#,
    );

    let report = analyze(dir.path(), AnalyzerConfig::default());
    let issues = issues_of_kind(&report, IssueKind::MissingTimeout);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Medium);
    assert_eq!(issues[0].context["test_kind"], "Integration");
}

#[test]
fn mock_usage_issues_only_fire_on_unit_tests() {
    let dir = TempDir::new().unwrap();
    write_test_file(
        dir.path(),
        "client_test.go",
        r#"package demo

func TestFetch(t *testing.T) {
	client := NewHTTPClient()
	_ = client.Get("http://example.com")
}

func BenchmarkFetch(b *testing.B) {
	client := NewHTTPClient()
	_ = client
}
"#,
    );

    let report = analyze(dir.path(), AnalyzerConfig::default());
    let issues = issues_of_kind(&report, IssueKind::ActualImplementationUsage);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].location.function, "TestFetch");
    assert_eq!(issues[0].context["component_name"], "HTTPClient");
}

#[test]
fn report_counters_cover_the_whole_run() {
    let dir = TempDir::new().unwrap();
    write_test_file(
        dir.path(),
        "a_test.go",
        "package demo\n\nfunc TestA(t *testing.T) {\n\tfor {\n\t}\n}\n",
    );
    write_test_file(
        dir.path(),
        "helper.go",
        "package demo\n\nfunc helper() {}\n",
    );

    let report = analyze(dir.path(), AnalyzerConfig::default());
    assert_eq!(report.files_analyzed, 1);
    assert_eq!(report.files_skipped, 0);
    assert_eq!(report.packages_analyzed, 1);
    assert_eq!(report.functions_analyzed, 1);
    // InfiniteLoop plus MissingTimeout
    assert_eq!(report.issues_found, 2);
    assert_eq!(report.issues_by_package["demo"], 2);
    assert!(report.generated_at.is_some());
}
