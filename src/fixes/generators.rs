//! Code-change generators, one per fix kind. Generators are pure with
//! respect to the target file: they read it, never write it. The
//! produced `CodeChange`s are applied (with backup) by the modifier.

use crate::config::FixConfig;
use crate::core::ast::format_go_duration;
use crate::core::errors::FixError;
use crate::core::{CodeChange, FixKind, PerformanceIssue};
use crate::mocks;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static SLEEP_MUL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*\*\s*time\.(Nanosecond|Microsecond|Millisecond|Second|Minute|Hour)")
        .unwrap()
});
static SLEEP_MUL_FLIPPED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time\.(Nanosecond|Microsecond|Millisecond|Second|Minute|Hour)\s*\*\s*(\d+)")
        .unwrap()
});
static SLEEP_BARE_UNIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time\.(Millisecond|Second|Minute|Hour)").unwrap());
static GO_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(ns|µs|us|ms|s|m|h)$").unwrap());

/// Generate the changes for one issue under an already-resolved fix
/// kind.
pub fn generate(
    issue: &PerformanceIssue,
    kind: FixKind,
    config: &FixConfig,
) -> Result<Vec<CodeChange>, FixError> {
    match kind {
        FixKind::AddTimeout => add_timeout(issue, config),
        FixKind::AddLoopExit => add_loop_exit(issue, config),
        FixKind::ReduceIterations => reduce_iterations(issue, config),
        FixKind::OptimizeSleep => optimize_sleep(issue, config),
        FixKind::ReplaceWithMock => replace_with_mock(issue),
        FixKind::CreateMock => create_mock(issue),
    }
}

fn add_timeout(issue: &PerformanceIssue, config: &FixConfig) -> Result<Vec<CodeChange>, FixError> {
    let old_code = issue_lines(issue)?;
    let timeout = context_duration(issue, "timeout_duration").unwrap_or(config.default_timeout());

    let mut lines = old_code.lines();
    let signature = lines.next().ok_or_else(|| {
        FixError::Generation(format!("empty source range for {}", issue.location.function))
    })?;
    let mut new_code = String::from(signature);
    new_code.push_str(&format!(
        "\n\tctx, cancel := context.WithTimeout(context.Background(), {})\n\tdefer cancel()\n\t_ = ctx\n",
        duration_literal(timeout)
    ));
    for line in lines {
        new_code.push_str(line);
        new_code.push('\n');
    }
    let new_code = new_code.trim_end_matches('\n').to_string();

    Ok(vec![splice_change(
        issue,
        old_code,
        new_code,
        format!("Add timeout to {}", issue.location.function),
    )])
}

fn add_loop_exit(issue: &PerformanceIssue, config: &FixConfig) -> Result<Vec<CodeChange>, FixError> {
    let old_code = issue_lines(issue)?;
    let timeout = context_duration(issue, "timeout_duration").unwrap_or(config.default_timeout());

    let lines: Vec<&str> = old_code.lines().collect();
    if lines.len() < 2 {
        return Err(FixError::Generation(format!(
            "loop at {}:{} is too short to rewrite",
            issue.location.file.display(),
            issue.location.line_start
        )));
    }
    let indent: String = lines[0]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect();
    // Everything between the loop header and its closing brace keeps
    // its text, pushed two levels deeper into the select's default arm.
    let body: String = lines[1..lines.len() - 1]
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::from("\n")
            } else {
                format!("{indent}\t\t{}\n", line.trim_start_matches([' ', '\t']))
            }
        })
        .collect();

    let new_code = format!(
        "{indent}ctx, cancel := context.WithCancel(context.Background())\n\
         {indent}defer cancel()\n\
         {indent}deadline := time.After({lit})\n\
         {indent}for {{\n\
         {indent}\tselect {{\n\
         {indent}\tcase <-ctx.Done():\n\
         {indent}\t\treturn\n\
         {indent}\tcase <-deadline:\n\
         {indent}\t\tt.Fatal(\"test loop timed out\")\n\
         {indent}\tdefault:\n\
         {body}\
         {indent}\t}}\n\
         {indent}}}",
        lit = duration_literal(timeout),
    );

    Ok(vec![splice_change(
        issue,
        old_code,
        new_code,
        format!(
            "Add exit condition to infinite loop in {}",
            issue.location.function
        ),
    )])
}

fn reduce_iterations(
    issue: &PerformanceIssue,
    config: &FixConfig,
) -> Result<Vec<CodeChange>, FixError> {
    let old_code = issue_lines(issue)?;
    let old_count = issue
        .context
        .get("iterations")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| FixError::Generation("issue context carries no iteration count".into()))?;
    let new_count = (old_count / config.iteration_divisor).max(config.iteration_floor);

    // The comparison form is tried first so an unrelated occurrence of
    // the number elsewhere on the line is left alone.
    let mut new_code = old_code.clone();
    for (from, to) in [
        (format!("< {old_count}"), format!("< {new_count}")),
        (format!("<= {old_count}"), format!("<= {new_count}")),
        (format!("{old_count}"), format!("{new_count}")),
    ] {
        if new_code.contains(&from) {
            new_code = new_code.replacen(&from, &to, 1);
            break;
        }
    }
    if new_code == old_code {
        return Err(FixError::Generation(format!(
            "iteration bound {old_count} not found in source range"
        )));
    }

    Ok(vec![splice_change(
        issue,
        old_code,
        new_code,
        format!(
            "Reduce iterations from {old_count} to {new_count} in {}",
            issue.location.function
        ),
    )])
}

fn optimize_sleep(
    issue: &PerformanceIssue,
    config: &FixConfig,
) -> Result<Vec<CodeChange>, FixError> {
    let old_code = issue_lines(issue)?;
    let divisor = config.sleep_divisor;

    let new_code: String = old_code
        .lines()
        .map(|line| {
            if line.contains("time.Sleep") {
                let mut rewritten = rewrite_sleep_line(line, divisor);
                rewritten.push('\n');
                rewritten
            } else {
                format!("{line}\n")
            }
        })
        .collect::<String>()
        .trim_end_matches('\n')
        .to_string();

    if new_code == old_code {
        return Err(FixError::Generation(
            "no rewritable sleep duration found in source range".into(),
        ));
    }

    Ok(vec![splice_change(
        issue,
        old_code,
        new_code,
        format!("Optimize sleep durations in {}", issue.location.function),
    )])
}

/// Literal-substitution strategies, first match wins per line:
/// `N * time.Unit`, `time.Unit * N`, then a bare unit constant.
fn rewrite_sleep_line(line: &str, divisor: u32) -> String {
    let reduce = |d: Duration| duration_literal((d / divisor).max(Duration::from_millis(1)));

    if SLEEP_MUL_RE.is_match(line) {
        return SLEEP_MUL_RE
            .replace_all(line, |caps: &Captures| {
                let n: u32 = caps[1].parse().unwrap_or(1);
                reduce(unit_duration(&caps[2]) * n)
            })
            .into_owned();
    }
    if SLEEP_MUL_FLIPPED_RE.is_match(line) {
        return SLEEP_MUL_FLIPPED_RE
            .replace_all(line, |caps: &Captures| {
                let n: u32 = caps[2].parse().unwrap_or(1);
                reduce(unit_duration(&caps[1]) * n)
            })
            .into_owned();
    }
    SLEEP_BARE_UNIT_RE
        .replace_all(line, |caps: &Captures| reduce(unit_duration(&caps[1])))
        .into_owned()
}

fn replace_with_mock(issue: &PerformanceIssue) -> Result<Vec<CodeChange>, FixError> {
    let old_code = issue_lines(issue)?;
    let component = context_string(issue, "component_name")
        .ok_or_else(|| FixError::Generation("issue context carries no component name".into()))?;

    let real_constructor = format!("New{component}(");
    let mock_constructor = format!("NewMock{component}(");
    if !old_code.contains(&real_constructor) {
        return Err(FixError::Generation(format!(
            "constructor {real_constructor} not found in source range"
        )));
    }
    let new_code = old_code.replace(&real_constructor, &mock_constructor);

    Ok(vec![splice_change(
        issue,
        old_code,
        new_code,
        format!(
            "Replace {component} with mock in {}",
            issue.location.function
        ),
    )])
}

fn create_mock(issue: &PerformanceIssue) -> Result<Vec<CodeChange>, FixError> {
    let component = context_string(issue, "component_name")
        .ok_or_else(|| FixError::Generation("issue context carries no component name".into()))?;
    let interface = context_string(issue, "interface_name").unwrap_or_else(|| component.clone());
    let package_dir = context_string(issue, "package_path")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| issue.location.file.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let mock = mocks::synthesize_or_template(&component, &interface, &package_dir);

    Ok(vec![CodeChange {
        file: mock_target_file(&issue.location.file)?,
        line_start: 1,
        line_end: 1,
        old_code: String::new(),
        new_code: mock.code,
        description: format!("Create mock for {component}"),
    }])
}

/// `store_test.go` → `store_mock.go`, sibling of the test file.
fn mock_target_file(test_file: &Path) -> Result<PathBuf, FixError> {
    let name = test_file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let Some(stem) = name.strip_suffix("_test.go") else {
        return Err(FixError::Generation(format!(
            "{} is not a test file",
            test_file.display()
        )));
    };
    Ok(test_file.with_file_name(format!("{stem}_mock.go")))
}

fn splice_change(
    issue: &PerformanceIssue,
    old_code: String,
    new_code: String,
    description: String,
) -> CodeChange {
    CodeChange {
        file: issue.location.file.clone(),
        line_start: issue.location.line_start,
        line_end: issue.location.line_end,
        old_code,
        new_code,
        description,
    }
}

/// The issue's inclusive line range, read from the target file.
fn issue_lines(issue: &PerformanceIssue) -> Result<String, FixError> {
    let source = fs::read_to_string(&issue.location.file).map_err(|e| {
        FixError::Generation(format!("reading {}: {e}", issue.location.file.display()))
    })?;
    let lines: Vec<&str> = source.lines().collect();
    let (start, end) = (issue.location.line_start, issue.location.line_end);
    if start == 0 || start > end || end > lines.len() {
        return Err(FixError::InvalidLineRange {
            path: issue.location.file.clone(),
            line_start: start,
            line_end: end,
            file_lines: lines.len(),
        });
    }
    Ok(lines[start - 1..end].join("\n"))
}

fn context_string(issue: &PerformanceIssue, key: &str) -> Option<String> {
    issue
        .context
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn context_duration(issue: &PerformanceIssue, key: &str) -> Option<Duration> {
    context_string(issue, key).and_then(|s| parse_go_duration(&s))
}

/// `"5s"`, `"100ms"`, `"2m"` → a Duration; compound forms are not
/// needed by the context keys that carry durations.
fn parse_go_duration(s: &str) -> Option<Duration> {
    let caps = GO_DURATION_RE.captures(s.trim())?;
    let n: u64 = caps[1].parse().ok()?;
    let unit = match &caps[2] {
        "ns" => Duration::from_nanos(1),
        "µs" | "us" => Duration::from_micros(1),
        "ms" => Duration::from_millis(1),
        "s" => Duration::from_secs(1),
        "m" => Duration::from_secs(60),
        "h" => Duration::from_secs(3600),
        _ => return None,
    };
    Some(unit * u32::try_from(n).ok()?)
}

fn unit_duration(unit: &str) -> Duration {
    match unit {
        "Nanosecond" => Duration::from_nanos(1),
        "Microsecond" => Duration::from_micros(1),
        "Millisecond" => Duration::from_millis(1),
        "Second" => Duration::from_secs(1),
        "Minute" => Duration::from_secs(60),
        _ => Duration::from_secs(3600),
    }
}

/// Render a duration as a Go source literal, preferring the largest
/// whole unit.
fn duration_literal(d: Duration) -> String {
    let nanos = d.as_nanos();
    for (unit_nanos, unit) in [
        (1_000_000_000, "time.Second"),
        (1_000_000, "time.Millisecond"),
        (1_000, "time.Microsecond"),
    ] {
        if nanos >= unit_nanos && nanos % unit_nanos == 0 {
            let n = nanos / unit_nanos;
            return if n == 1 {
                unit.to_string()
            } else {
                format!("{n}*{unit}")
            };
        }
    }
    format!("{nanos}*time.Nanosecond")
}
