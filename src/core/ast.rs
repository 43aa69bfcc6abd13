//! Typed, immutable representation of the Go syntax the detectors
//! pattern-match over.
//!
//! The lowering from raw tree-sitter nodes lives in `crate::parser`;
//! everything here is plain data. Statement and expression kinds we do
//! not model are kept as `Other` with their children lowered, so walks
//! still reach constructs nested inside them.

use std::time::Duration;

/// A top-level Go function declaration (plain or with a receiver).
#[derive(Debug, Clone, PartialEq)]
pub struct GoFunction {
    pub name: String,
    pub has_receiver: bool,
    pub line_start: usize,
    pub line_end: usize,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    For(ForStmt),
    Select(SelectStmt),
    If(IfStmt),
    Block(Vec<Stmt>),
    Return,
    Break,
    Continue,
    Go(Expr),
    Defer(Expr),
    /// Channel send (`ch <- v`).
    Send { value: Box<Expr>, line: usize },
    Assign {
        targets: Vec<String>,
        values: Vec<Expr>,
        line: usize,
    },
    Expr(Expr),
    /// Unmodeled statement kind; children are lowered so walks descend.
    Other(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub header: ForHeader,
    pub body: Vec<Stmt>,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForHeader {
    /// `for {`
    Infinite,
    /// `for cond {`
    While(Expr),
    /// `for i := 0; i < n; i++ {`; `bound` is set when the condition
    /// compares against an integer literal.
    Counted { bound: Option<u64> },
    /// `for range ... {`
    Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub then_branch: Vec<Stmt>,
    pub else_branch: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub cases: Vec<SelectCase>,
    pub has_default: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectCase {
    /// True when the communication clause receives (`case <-ch:` or
    /// `case v := <-ch:`), false for sends and the default case.
    pub is_receive: bool,
    /// The communication expression, e.g. the `<-time.After(d)` of a
    /// receive case. `None` for the default case.
    pub comm: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call(CallExpr),
    /// `<-ch`
    Receive(Box<Expr>),
    BoolLit(bool),
    IntLit(i64),
    /// Identifier or selector path, e.g. `done` or `time.Second`.
    Ident(String),
    /// Composite literal construction, e.g. `http.Client{}`.
    Composite { type_name: String, line: usize },
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    Unary { op: String, operand: Box<Expr> },
    /// Function literal; the body is lowered so detectors see through
    /// closures, but closures are never collected as test functions.
    Func(Vec<Stmt>),
    /// Unmodeled expression kind; children are lowered.
    Other(Vec<Expr>),
}

/// A call expression. `path` is the source text of the callee, e.g.
/// `time.Sleep`, `NewMockStore` or `b.ResetTimer`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub path: String,
    pub args: Vec<Expr>,
    pub line: usize,
}

impl CallExpr {
    /// Last path segment: `time.Sleep` → `Sleep`, `NewStore` → `NewStore`.
    pub fn base_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Leading path segment, if the callee is a selector.
    pub fn qualifier(&self) -> Option<&str> {
        let (head, _) = self.path.rsplit_once('.')?;
        Some(head)
    }
}

/// Recursively visit every statement, descending into loop bodies,
/// branches, select cases and function literals.
pub fn walk_stmts<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        f(stmt);
        match stmt {
            Stmt::For(fs) => walk_stmts(&fs.body, f),
            Stmt::Select(sel) => {
                for case in &sel.cases {
                    if let Some(comm) = &case.comm {
                        walk_expr_stmts(comm, f);
                    }
                    walk_stmts(&case.body, f);
                }
            }
            Stmt::If(is) => {
                walk_stmts(&is.then_branch, f);
                walk_stmts(&is.else_branch, f);
            }
            Stmt::Block(inner) | Stmt::Other(inner) => walk_stmts(inner, f),
            Stmt::Go(e) | Stmt::Defer(e) | Stmt::Expr(e) => walk_expr_stmts(e, f),
            Stmt::Assign { values, .. } => {
                for v in values {
                    walk_expr_stmts(v, f);
                }
            }
            Stmt::Send { value, .. } => walk_expr_stmts(value, f),
            Stmt::Return | Stmt::Break | Stmt::Continue => {}
        }
    }
}

fn walk_expr_stmts<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Stmt)) {
    match expr {
        Expr::Func(body) => walk_stmts(body, f),
        Expr::Call(call) => {
            for arg in &call.args {
                walk_expr_stmts(arg, f);
            }
        }
        Expr::Receive(inner) | Expr::Unary { operand: inner, .. } => walk_expr_stmts(inner, f),
        Expr::Binary { left, right, .. } => {
            walk_expr_stmts(left, f);
            walk_expr_stmts(right, f);
        }
        Expr::Other(children) => {
            for c in children {
                walk_expr_stmts(c, f);
            }
        }
        _ => {}
    }
}

/// Recursively visit every expression reachable from `stmts`.
pub fn walk_exprs<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Expr)) {
    walk_stmts(stmts, &mut |stmt| {
        let exprs: Vec<&Expr> = match stmt {
            Stmt::Go(e) | Stmt::Defer(e) | Stmt::Expr(e) => vec![e],
            Stmt::Send { value, .. } => vec![value.as_ref()],
            Stmt::Assign { values, .. } => values.iter().collect(),
            Stmt::For(fs) => match &fs.header {
                ForHeader::While(cond) => vec![cond],
                _ => vec![],
            },
            Stmt::Select(sel) => sel.cases.iter().filter_map(|c| c.comm.as_ref()).collect(),
            _ => vec![],
        };
        for e in exprs {
            walk_expr(e, f);
        }
    });
}

fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    match expr {
        Expr::Call(call) => {
            for arg in &call.args {
                walk_expr(arg, f);
            }
        }
        Expr::Receive(inner) | Expr::Unary { operand: inner, .. } => walk_expr(inner, f),
        Expr::Binary { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::Other(children) => {
            for c in children {
                walk_expr(c, f);
            }
        }
        // Closure bodies are reached through walk_stmts.
        Expr::Func(_) => {}
        _ => {}
    }
}

/// Statically resolve a Go duration expression.
///
/// Handles the shapes tests actually write: a bare unit constant
/// (`time.Second`), and an integer multiple on either side
/// (`100 * time.Millisecond`, `time.Millisecond * 100`).
pub fn resolve_duration(expr: &Expr) -> Option<Duration> {
    match expr {
        Expr::Ident(path) => unit_duration(path),
        Expr::Binary { left, op, right } if op == "*" => match (left.as_ref(), right.as_ref()) {
            (Expr::IntLit(n), unit) | (unit, Expr::IntLit(n)) => {
                let unit = resolve_duration(unit)?;
                u32::try_from(*n).ok().map(|n| unit * n)
            }
            _ => None,
        },
        _ => None,
    }
}

fn unit_duration(path: &str) -> Option<Duration> {
    match path {
        "time.Nanosecond" => Some(Duration::from_nanos(1)),
        "time.Microsecond" => Some(Duration::from_micros(1)),
        "time.Millisecond" => Some(Duration::from_millis(1)),
        "time.Second" => Some(Duration::from_secs(1)),
        "time.Minute" => Some(Duration::from_secs(60)),
        "time.Hour" => Some(Duration::from_secs(3600)),
        _ => None,
    }
}

/// Render a duration the way Go's `Duration.String()` would for the
/// magnitudes tests produce (`120ms`, `1.5s`, `2m30s`).
pub fn format_go_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", format_scaled(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", format_scaled(nanos, 1_000_000));
    }
    let secs = d.as_secs();
    if secs < 60 {
        return format!("{}s", format_scaled(nanos, 1_000_000_000));
    }
    let (hours, mins, rem_secs) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if mins > 0 || hours > 0 {
        out.push_str(&format!("{mins}m"));
    }
    out.push_str(&format!("{rem_secs}s"));
    out
}

fn format_scaled(nanos: u128, scale: u128) -> String {
    let whole = nanos / scale;
    let frac = nanos % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let mut frac_str = format!("{:0width$}", frac, width = (scale.ilog10()) as usize);
    while frac_str.ends_with('0') {
        frac_str.pop();
    }
    format!("{whole}.{frac_str}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mul(n: i64, unit: &str) -> Expr {
        Expr::Binary {
            left: Box::new(Expr::IntLit(n)),
            op: "*".to_string(),
            right: Box::new(Expr::Ident(unit.to_string())),
        }
    }

    #[test]
    fn resolves_unit_constants() {
        assert_eq!(
            resolve_duration(&Expr::Ident("time.Second".to_string())),
            Some(Duration::from_secs(1))
        );
        assert_eq!(
            resolve_duration(&Expr::Ident("time.Millisecond".to_string())),
            Some(Duration::from_millis(1))
        );
        assert_eq!(resolve_duration(&Expr::Ident("notADuration".to_string())), None);
    }

    #[test]
    fn resolves_multiples_on_either_side() {
        assert_eq!(
            resolve_duration(&mul(100, "time.Millisecond")),
            Some(Duration::from_millis(100))
        );
        let flipped = Expr::Binary {
            left: Box::new(Expr::Ident("time.Second".to_string())),
            op: "*".to_string(),
            right: Box::new(Expr::IntLit(2)),
        };
        assert_eq!(resolve_duration(&flipped), Some(Duration::from_secs(2)));
    }

    #[test]
    fn unresolvable_shapes_are_none() {
        assert_eq!(resolve_duration(&Expr::IntLit(100)), None);
        assert_eq!(
            resolve_duration(&Expr::Call(CallExpr {
                path: "computeDelay".to_string(),
                args: vec![],
                line: 1,
            })),
            None
        );
    }

    #[test]
    fn formats_like_go() {
        assert_eq!(format_go_duration(Duration::from_millis(120)), "120ms");
        assert_eq!(format_go_duration(Duration::from_secs(2)), "2s");
        assert_eq!(format_go_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_go_duration(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(format_go_duration(Duration::from_secs(150)), "2m30s");
        assert_eq!(format_go_duration(Duration::ZERO), "0s");
        assert_eq!(format_go_duration(Duration::from_nanos(500)), "500ns");
    }

    #[test]
    fn call_path_helpers() {
        let call = CallExpr {
            path: "time.Sleep".to_string(),
            args: vec![],
            line: 3,
        };
        assert_eq!(call.base_name(), "Sleep");
        assert_eq!(call.qualifier(), Some("time"));

        let bare = CallExpr {
            path: "NewStore".to_string(),
            args: vec![],
            line: 4,
        };
        assert_eq!(bare.base_name(), "NewStore");
        assert_eq!(bare.qualifier(), None);
    }

    #[test]
    fn walk_reaches_closure_bodies() {
        let body = vec![Stmt::Expr(Expr::Call(CallExpr {
            path: "t.Run".to_string(),
            args: vec![Expr::Func(vec![Stmt::Break])],
            line: 2,
        }))];
        let mut saw_break = false;
        walk_stmts(&body, &mut |s| {
            if matches!(s, Stmt::Break) {
                saw_break = true;
            }
        });
        assert!(saw_break);
    }
}
