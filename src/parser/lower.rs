//! Lowering from raw tree-sitter nodes into the typed Go IR.
//!
//! Only the constructs the detectors reason about get their own
//! variants; everything else becomes `Other` with children lowered so
//! recursive walks still see nested statements.

use crate::core::ast::{
    CallExpr, Expr, ForHeader, ForStmt, GoFunction, IfStmt, SelectCase, SelectStmt, Stmt,
};
use crate::parser::go::{node_end_line, node_line, node_text};
use tree_sitter::{Node, Tree};

/// Lower every top-level function and method declaration in the file.
pub fn lower_functions(tree: &Tree, source: &str) -> Vec<GoFunction> {
    let root = tree.root_node();
    let mut functions = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let has_receiver = match child.kind() {
            "function_declaration" => false,
            "method_declaration" => true,
            _ => continue,
        };
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let body = child
            .child_by_field_name("body")
            .map(|b| lower_block(b, source))
            .unwrap_or_default();
        functions.push(GoFunction {
            name: node_text(&name_node, source).to_string(),
            has_receiver,
            line_start: node_line(&child),
            line_end: node_end_line(&child),
            body,
        });
    }
    functions
}

pub fn lower_block(node: Node, source: &str) -> Vec<Stmt> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .map(|child| lower_stmt(child, source))
        .collect()
}

fn lower_stmt(node: Node, source: &str) -> Stmt {
    match node.kind() {
        "for_statement" => lower_for(node, source),
        "select_statement" => lower_select(node, source),
        "if_statement" => lower_if(node, source),
        "block" => Stmt::Block(lower_block(node, source)),
        "return_statement" => Stmt::Return,
        "break_statement" => Stmt::Break,
        "continue_statement" => Stmt::Continue,
        "go_statement" => Stmt::Go(first_expr(node, source)),
        "defer_statement" => Stmt::Defer(first_expr(node, source)),
        "send_statement" => Stmt::Send {
            value: Box::new(
                node.child_by_field_name("value")
                    .map(|v| lower_expr(v, source))
                    .unwrap_or(Expr::Other(vec![])),
            ),
            line: node_line(&node),
        },
        "short_var_declaration" | "assignment_statement" => lower_assign(node, source),
        "var_declaration" | "const_declaration" => lower_var_decl(node, source),
        "expression_statement" => Stmt::Expr(first_expr(node, source)),
        _ => {
            let mut cursor = node.walk();
            Stmt::Other(
                node.named_children(&mut cursor)
                    .map(|child| lower_stmt(child, source))
                    .collect(),
            )
        }
    }
}

fn lower_for(node: Node, source: &str) -> Stmt {
    let body = node
        .child_by_field_name("body")
        .map(|b| lower_block(b, source))
        .unwrap_or_default();

    let mut header = ForHeader::Infinite;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "for_clause" => {
                header = ForHeader::Counted {
                    bound: counted_bound(child, source),
                };
            }
            "range_clause" => header = ForHeader::Range,
            "block" => {}
            _ => header = ForHeader::While(lower_expr(child, source)),
        }
    }

    Stmt::For(ForStmt {
        header,
        body,
        line_start: node_line(&node),
        line_end: node_end_line(&node),
    })
}

/// Resolve the bound of `for i := 0; i < N; i++` when the condition
/// compares against an integer literal.
fn counted_bound(for_clause: Node, source: &str) -> Option<u64> {
    let condition = for_clause.child_by_field_name("condition")?;
    if condition.kind() != "binary_expression" {
        return None;
    }
    let op = condition.child_by_field_name("operator")?;
    if !matches!(node_text(&op, source), "<" | "<=") {
        return None;
    }
    let right = condition.child_by_field_name("right")?;
    match lower_expr(right, source) {
        Expr::IntLit(n) => u64::try_from(n).ok(),
        _ => None,
    }
}

fn lower_select(node: Node, source: &str) -> Stmt {
    let mut cases = Vec::new();
    let mut has_default = false;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "communication_case" => {
                let comm_node = child.child_by_field_name("communication");
                let is_receive = comm_node
                    .map(|c| c.kind() != "send_statement")
                    .unwrap_or(false);
                let comm = comm_node.map(|c| lower_comm(c, source));
                let mut body = Vec::new();
                let mut inner = child.walk();
                for stmt in child.named_children(&mut inner) {
                    if Some(stmt.id()) == comm_node.map(|c| c.id()) {
                        continue;
                    }
                    body.push(lower_stmt(stmt, source));
                }
                cases.push(SelectCase {
                    is_receive,
                    comm,
                    body,
                });
            }
            "default_case" => {
                has_default = true;
                let mut inner = child.walk();
                let body = child
                    .named_children(&mut inner)
                    .map(|stmt| lower_stmt(stmt, source))
                    .collect();
                cases.push(SelectCase {
                    is_receive: false,
                    comm: None,
                    body,
                });
            }
            _ => {}
        }
    }
    Stmt::Select(SelectStmt {
        cases,
        has_default,
        line: node_line(&node),
    })
}

/// Lower the communication clause of a select case. For receives the
/// interesting part is the channel expression on the right of `<-`.
fn lower_comm(node: Node, source: &str) -> Expr {
    match node.kind() {
        "receive_statement" => node
            .child_by_field_name("right")
            .map(|r| lower_expr(r, source))
            .unwrap_or(Expr::Other(vec![])),
        _ => {
            let mut cursor = node.walk();
            Expr::Other(
                node.named_children(&mut cursor)
                    .map(|c| lower_expr(c, source))
                    .collect(),
            )
        }
    }
}

fn lower_if(node: Node, source: &str) -> Stmt {
    let then_branch = node
        .child_by_field_name("consequence")
        .map(|b| lower_block(b, source))
        .unwrap_or_default();
    let else_branch = match node.child_by_field_name("alternative") {
        Some(alt) if alt.kind() == "block" => lower_block(alt, source),
        Some(alt) => vec![lower_stmt(alt, source)],
        None => Vec::new(),
    };
    Stmt::If(IfStmt {
        then_branch,
        else_branch,
        line: node_line(&node),
    })
}

fn lower_assign(node: Node, source: &str) -> Stmt {
    let targets = node
        .child_by_field_name("left")
        .map(|l| {
            let mut cursor = l.walk();
            l.named_children(&mut cursor)
                .map(|c| node_text(&c, source).to_string())
                .collect()
        })
        .unwrap_or_default();
    let values = node
        .child_by_field_name("right")
        .map(|r| {
            let mut cursor = r.walk();
            r.named_children(&mut cursor)
                .map(|c| lower_expr(c, source))
                .collect()
        })
        .unwrap_or_default();
    Stmt::Assign {
        targets,
        values,
        line: node_line(&node),
    }
}

fn lower_var_decl(node: Node, source: &str) -> Stmt {
    let mut targets = Vec::new();
    let mut values = Vec::new();
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if !matches!(spec.kind(), "var_spec" | "const_spec") {
            continue;
        }
        let mut inner = spec.walk();
        for child in spec.named_children(&mut inner) {
            match child.kind() {
                "identifier" => targets.push(node_text(&child, source).to_string()),
                "type_identifier" | "qualified_type" | "pointer_type" => {}
                _ => values.push(lower_expr(child, source)),
            }
        }
    }
    Stmt::Assign {
        targets,
        values,
        line: node_line(&node),
    }
}

fn first_expr(node: Node, source: &str) -> Expr {
    let mut cursor = node.walk();
    let first = node.named_children(&mut cursor).next();
    first
        .map(|c| lower_expr(c, source))
        .unwrap_or(Expr::Other(vec![]))
}

fn lower_expr(node: Node, source: &str) -> Expr {
    match node.kind() {
        "call_expression" => {
            let path = node
                .child_by_field_name("function")
                .map(|f| node_text(&f, source).to_string())
                .unwrap_or_default();
            let args = node
                .child_by_field_name("arguments")
                .map(|a| {
                    let mut cursor = a.walk();
                    a.named_children(&mut cursor)
                        .map(|arg| lower_expr(arg, source))
                        .collect()
                })
                .unwrap_or_default();
            Expr::Call(CallExpr {
                path,
                args,
                line: node_line(&node),
            })
        }
        "unary_expression" => {
            let op = node
                .child_by_field_name("operator")
                .map(|o| node_text(&o, source).to_string())
                .unwrap_or_default();
            let operand = node
                .child_by_field_name("operand")
                .map(|o| lower_expr(o, source))
                .unwrap_or(Expr::Other(vec![]));
            if op == "<-" {
                Expr::Receive(Box::new(operand))
            } else {
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                }
            }
        }
        "binary_expression" => {
            let left = node
                .child_by_field_name("left")
                .map(|l| lower_expr(l, source))
                .unwrap_or(Expr::Other(vec![]));
            let right = node
                .child_by_field_name("right")
                .map(|r| lower_expr(r, source))
                .unwrap_or(Expr::Other(vec![]));
            let op = node
                .child_by_field_name("operator")
                .map(|o| node_text(&o, source).to_string())
                .unwrap_or_default();
            Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            }
        }
        "int_literal" => parse_int_literal(node_text(&node, source)),
        "true" => Expr::BoolLit(true),
        "false" => Expr::BoolLit(false),
        "identifier" | "field_identifier" | "package_identifier" | "selector_expression" => {
            Expr::Ident(node_text(&node, source).to_string())
        }
        "composite_literal" => {
            let type_name = node
                .child_by_field_name("type")
                .map(|t| node_text(&t, source).to_string())
                .unwrap_or_default();
            Expr::Composite {
                type_name,
                line: node_line(&node),
            }
        }
        "func_literal" => Expr::Func(
            node.child_by_field_name("body")
                .map(|b| lower_block(b, source))
                .unwrap_or_default(),
        ),
        "parenthesized_expression" => first_expr(node, source),
        _ => {
            let mut cursor = node.walk();
            Expr::Other(
                node.named_children(&mut cursor)
                    .map(|c| lower_expr(c, source))
                    .collect(),
            )
        }
    }
}

fn parse_int_literal(text: &str) -> Expr {
    let cleaned = text.replace('_', "");
    let parsed = if let Some(hex) = cleaned.strip_prefix("0x").or(cleaned.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(oct) = cleaned.strip_prefix("0o").or(cleaned.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8)
    } else if let Some(bin) = cleaned.strip_prefix("0b").or(cleaned.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else {
        cleaned.parse::<i64>()
    };
    parsed.map(Expr::IntLit).unwrap_or(Expr::Other(vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ast;
    use crate::parser::go;
    use indoc::indoc;

    fn lower(source: &str) -> Vec<GoFunction> {
        let tree = go::parse_source(source).unwrap();
        lower_functions(&tree, source)
    }

    #[test]
    fn lowers_bare_infinite_loop() {
        let funcs = lower(indoc! {r#"
            package demo

            func TestLoop(t *testing.T) {
                for {
                }
            }
        "#});
        assert_eq!(funcs.len(), 1);
        let Stmt::For(fs) = &funcs[0].body[0] else {
            panic!("expected for statement, got {:?}", funcs[0].body);
        };
        assert_eq!(fs.header, ForHeader::Infinite);
        assert_eq!(fs.line_start, 4);
        assert_eq!(fs.line_end, 5);
    }

    #[test]
    fn lowers_for_true_as_while_bool() {
        let funcs = lower("package demo\n\nfunc TestLoop(t *testing.T) {\n\tfor true {\n\t}\n}\n");
        let Stmt::For(fs) = &funcs[0].body[0] else {
            panic!("expected for statement");
        };
        assert_eq!(fs.header, ForHeader::While(Expr::BoolLit(true)));
    }

    #[test]
    fn resolves_counted_loop_bound() {
        let funcs = lower(indoc! {r#"
            package demo

            func TestLoop(t *testing.T) {
                for i := 0; i < 1000; i++ {
                    _ = i
                }
            }
        "#});
        let Stmt::For(fs) = &funcs[0].body[0] else {
            panic!("expected for statement");
        };
        assert_eq!(fs.header, ForHeader::Counted { bound: Some(1000) });
    }

    #[test]
    fn dynamic_bound_is_unresolved() {
        let funcs = lower("package demo\n\nfunc TestLoop(t *testing.T) {\n\tfor i := 0; i < n; i++ {\n\t}\n}\n");
        let Stmt::For(fs) = &funcs[0].body[0] else {
            panic!("expected for statement");
        };
        assert_eq!(fs.header, ForHeader::Counted { bound: None });
    }

    #[test]
    fn lowers_select_with_receive_case() {
        let funcs = lower(indoc! {r#"
            package demo

            func TestSelect(t *testing.T) {
                for {
                    select {
                    case <-timer.C:
                        return
                    default:
                    }
                }
            }
        "#});
        let Stmt::For(fs) = &funcs[0].body[0] else {
            panic!("expected for statement");
        };
        let Stmt::Select(sel) = &fs.body[0] else {
            panic!("expected select, got {:?}", fs.body);
        };
        assert!(sel.has_default);
        assert_eq!(sel.cases.len(), 2);
        assert!(sel.cases[0].is_receive);
        assert_eq!(sel.cases[0].body, vec![Stmt::Return]);
        assert_eq!(
            sel.cases[0].comm,
            Some(Expr::Receive(Box::new(Expr::Ident("timer.C".to_string()))))
        );
    }

    #[test]
    fn lowers_receive_with_assignment() {
        let funcs = lower(indoc! {r#"
            package demo

            func TestSelect(t *testing.T) {
                select {
                case val := <-ch:
                    _ = val
                }
            }
        "#});
        let Stmt::Select(sel) = &funcs[0].body[0] else {
            panic!("expected select");
        };
        assert!(sel.cases[0].is_receive);
        assert!(!sel.has_default);
    }

    #[test]
    fn lowers_sleep_call_with_duration_arg() {
        let funcs = lower(indoc! {r#"
            package demo

            func TestSleep(t *testing.T) {
                time.Sleep(50 * time.Millisecond)
            }
        "#});
        let Stmt::Expr(Expr::Call(call)) = &funcs[0].body[0] else {
            panic!("expected call, got {:?}", funcs[0].body);
        };
        assert_eq!(call.path, "time.Sleep");
        assert_eq!(
            ast::resolve_duration(&call.args[0]),
            Some(std::time::Duration::from_millis(50))
        );
    }

    #[test]
    fn lowers_composite_literal_and_constructor() {
        let funcs = lower(indoc! {r#"
            package demo

            func TestBuild(t *testing.T) {
                client := http.Client{}
                store := NewStore()
                _ = client
                _ = store
            }
        "#});
        let Stmt::Assign { values, .. } = &funcs[0].body[0] else {
            panic!("expected assignment");
        };
        assert_eq!(
            values[0],
            Expr::Composite {
                type_name: "http.Client".to_string(),
                line: 4
            }
        );
        let Stmt::Assign { values, .. } = &funcs[0].body[1] else {
            panic!("expected assignment");
        };
        assert!(matches!(&values[0], Expr::Call(c) if c.path == "NewStore"));
    }

    #[test]
    fn methods_with_receivers_are_lowered() {
        let funcs = lower(indoc! {r#"
            package demo

            func (s *suite) TestMethod(t *testing.T) {
            }
        "#});
        assert_eq!(funcs.len(), 1);
        assert!(funcs[0].has_receiver);
        assert_eq!(funcs[0].name, "TestMethod");
    }

    #[test]
    fn go_and_defer_statements_keep_their_calls() {
        let funcs = lower(indoc! {r#"
            package demo

            func TestSpawn(t *testing.T) {
                defer cleanup()
                go worker(1)
            }
        "#});
        assert!(matches!(&funcs[0].body[0], Stmt::Defer(Expr::Call(c)) if c.path == "cleanup"));
        assert!(matches!(&funcs[0].body[1], Stmt::Go(Expr::Call(c)) if c.path == "worker"));
    }

    #[test]
    fn int_literal_forms() {
        assert_eq!(parse_int_literal("1000"), Expr::IntLit(1000));
        assert_eq!(parse_int_literal("1_000"), Expr::IntLit(1000));
        assert_eq!(parse_int_literal("0x10"), Expr::IntLit(16));
    }
}
