use std::fs;
use std::path::Path;
use tempfile::TempDir;
use testmedic::config::FixConfig;
use testmedic::core::{CancelToken, FixStatus, IssueKind};
use testmedic::detectors::DetectionEngine;
use testmedic::fixes::FixEngine;
use testmedic::parser;
use testmedic::AnalyzerConfig;

fn parse_and_detect(path: &Path, config: &AnalyzerConfig) -> testmedic::TestFile {
    let mut file = parser::parse_file(path, &config.detectors, &CancelToken::new()).unwrap();
    DetectionEngine::new(config.detectors.clone()).annotate_file(&mut file);
    file
}

fn fix_engine() -> FixEngine {
    FixEngine::new(FixConfig {
        reformat: false,
        ..FixConfig::default()
    })
}

#[test]
fn added_timeout_clears_the_issue_on_reanalysis() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wait_test.go");
    fs::write(
        &path,
        "package demo\n\nfunc TestWait(t *testing.T) {\n\tdoWork()\n}\n",
    )
    .unwrap();

    let config = AnalyzerConfig::default();
    let file = parse_and_detect(&path, &config);
    let issue = file.functions[0]
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::MissingTimeout)
        .cloned()
        .unwrap();

    let fix = fix_engine().apply_fix(&issue).unwrap();
    assert_eq!(fix.status, FixStatus::Applied);

    let reanalyzed = parse_and_detect(&path, &config);
    assert!(reanalyzed.functions[0].has_timeout);
    assert!(reanalyzed.functions[0]
        .issues
        .iter()
        .all(|i| i.kind != IssueKind::MissingTimeout));
}

#[test]
fn reduced_iterations_fall_under_the_threshold() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("busy_test.go");
    fs::write(
        &path,
        "package demo\n\nfunc TestBusy(t *testing.T) {\n\tfor i := 0; i < 1000; i++ {\n\t\t_ = i\n\t}\n}\n",
    )
    .unwrap();

    let config = AnalyzerConfig::default();
    let file = parse_and_detect(&path, &config);
    let issue = file.functions[0]
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::LargeIteration)
        .cloned()
        .unwrap();

    fix_engine().apply_fix(&issue).unwrap();

    let mutated = fs::read_to_string(&path).unwrap();
    assert!(mutated.contains("i < 100"));

    let reanalyzed = parse_and_detect(&path, &config);
    assert!(reanalyzed.functions[0]
        .issues
        .iter()
        .all(|i| i.kind != IssueKind::LargeIteration));
}

#[test]
fn rollback_restores_the_exact_original_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wait_test.go");
    let original = "package demo\n\nfunc TestWait(t *testing.T) {\n\tdoWork()\n}\n";
    fs::write(&path, original).unwrap();

    let config = AnalyzerConfig::default();
    let file = parse_and_detect(&path, &config);
    let issue = file.functions[0]
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::MissingTimeout)
        .cloned()
        .unwrap();

    let engine = fix_engine();
    let mut fix = engine.apply_fix(&issue).unwrap();
    assert_ne!(fs::read_to_string(&path).unwrap(), original);

    engine.rollback_fix(&mut fix).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    assert_eq!(fix.status, FixStatus::RolledBack);

    // backups survive the rollback for later inspection
    assert!(fix.backup_path.unwrap().exists());
}

#[test]
fn missing_mock_fix_writes_a_sibling_mock_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("store.go"),
        "package demo\n\ntype UserStore interface {\n\tGet(key string) (string, error)\n}\n",
    )
    .unwrap();
    let path = dir.path().join("store_test.go");
    fs::write(
        &path,
        "package demo\n\nfunc TestGet(t *testing.T) {\n\tstore := NewUserStore()\n\t_ = store\n}\n",
    )
    .unwrap();

    let config = AnalyzerConfig::default();
    let file = parse_and_detect(&path, &config);
    let issue = file.functions[0]
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::MissingMock)
        .cloned()
        .unwrap();

    fix_engine().apply_fix(&issue).unwrap();

    let mock_path = dir.path().join("store_mock.go");
    let mock_source = fs::read_to_string(&mock_path).unwrap();
    assert!(mock_source.contains("type MockUserStore struct"));
    assert!(mock_source.contains("func NewMockUserStore("));
    assert!(mock_source.contains("func (m *MockUserStore) Get("));
}

#[test]
fn detector_config_drives_the_fix_threshold_interplay() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loop_test.go");
    fs::write(
        &path,
        "package demo\n\nfunc TestLoop(t *testing.T) {\n\tfor i := 0; i < 60; i++ {\n\t\tresp := http.Get(url)\n\t\t_ = resp\n\t}\n}\n",
    )
    .unwrap();

    // weight > 1 (the http call plus nothing else keeps weight 1, so
    // tighten the cutoff to make the loop complex)
    let mut config = AnalyzerConfig::default();
    config.detectors.complex_weight_cutoff = 0;
    let file = parse_and_detect(&path, &config);
    let kinds: Vec<IssueKind> = file.functions[0].issues.iter().map(|i| i.kind).collect();
    assert!(kinds.contains(&IssueKind::LargeIteration));
    assert!(kinds.contains(&IssueKind::HighConcurrency));

    // HighConcurrency is flagged fixable but has no automated rewrite
    let concurrency = file.functions[0]
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::HighConcurrency)
        .unwrap();
    assert!(fix_engine().apply_fix(concurrency).is_err());
}
