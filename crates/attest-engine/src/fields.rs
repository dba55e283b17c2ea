//! Column-name extraction from formulas.
//!
//! Two extractors must agree: [`referenced_columns`] walks a parsed [`Ast`],
//! while [`extract_fields`] scans raw formula text and is used for quick-fail
//! configuration validation before anything is parsed. Both consult the same
//! reserved-name table so function names and boolean keywords are never
//! mistaken for columns.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Ast, Expr};

/// Function names and literal keywords that can never be column references.
pub const RESERVED_NAMES: &[&str] = &[
    "IF", "AND", "OR", "NOT", "IN", "ISBLANK", "ISNUMBER", "ISERROR", "ISTEXT", "COUNTIF",
    "SUMIF", "AVERAGEIF", "SUM", "AVERAGE", "MIN", "MAX", "LEN", "LEFT", "RIGHT", "MID", "UPPER",
    "LOWER", "TRIM", "PROPER", "TEXT", "VALUE", "TODAY", "NOW", "DATE", "DATEVALUE",
    "CONCATENATE", "VLOOKUP", "HLOOKUP", "INDEX", "MATCH", "COUNT", "TRUE", "FALSE",
];

pub fn is_reserved_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    RESERVED_NAMES.contains(&upper.as_str())
}

/// Collect the column names referenced by a parsed formula.
pub fn referenced_columns(ast: &Ast) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    walk(&ast.expr, &mut out);
    out
}

fn walk(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Number(_) | Expr::Text(_) | Expr::Bool(_) => {}
        Expr::ColumnRef(name) => {
            if !is_reserved_name(name) {
                out.insert(name.clone());
            }
        }
        Expr::Unary { expr, .. } => walk(expr, out),
        Expr::Binary { left, right, .. } => {
            walk(left, out);
            walk(right, out);
        }
        Expr::If {
            cond,
            then,
            otherwise,
        } => {
            walk(cond, out);
            walk(then, out);
            walk(otherwise, out);
        }
        Expr::In { value, list } => {
            walk(value, out);
            for item in list {
                walk(item, out);
            }
        }
        Expr::FunctionCall { args, .. } => {
            for arg in args {
                walk(arg, out);
            }
        }
    }
}

fn string_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""(?:[^"]|"")*""#).expect("valid regex"))
}

fn backtick_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]*)`").expect("valid regex"))
}

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("valid regex"))
}

/// Lightweight text scan for the columns a formula references, without
/// parsing it.
///
/// String literals are blanked out first; backtick identifiers are collected
/// and then blanked; remaining bare identifiers count as columns unless they
/// are reserved or immediately followed by `(` (a function call).
pub fn extract_fields(formula: &str) -> BTreeSet<String> {
    let body = formula.strip_prefix('=').unwrap_or(formula);

    let mut fields = BTreeSet::new();

    let without_strings = string_literal_re()
        .replace_all(body, |m: &regex::Captures<'_>| " ".repeat(m[0].len()))
        .into_owned();

    for caps in backtick_re().captures_iter(&without_strings) {
        let name = &caps[1];
        if !name.is_empty() && !is_reserved_name(name) {
            fields.insert(name.to_string());
        }
    }
    let cleaned = backtick_re()
        .replace_all(&without_strings, |m: &regex::Captures<'_>| {
            " ".repeat(m[0].len())
        })
        .into_owned();

    for m in ident_re().find_iter(&cleaned) {
        let name = m.as_str();
        if is_reserved_name(name) {
            continue;
        }
        let followed_by_paren = cleaned[m.end()..]
            .chars()
            .find(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
            == Some('(');
        if followed_by_paren {
            continue;
        }
        fields.insert(name.to_string());
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn both(formula: &str) -> (BTreeSet<String>, BTreeSet<String>) {
        let ast = parse_formula(formula).unwrap();
        (referenced_columns(&ast), extract_fields(formula))
    }

    #[test]
    fn backticked_and_bare_columns_are_found() {
        let (from_ast, from_text) =
            both("=`Third Party Vendors`<>\"\" AND ISNUMBER(`Risk Rating`)");
        let expected: BTreeSet<String> = ["Third Party Vendors", "Risk Rating"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(from_ast, expected);
        assert_eq!(from_text, expected);
    }

    #[test]
    fn function_names_are_not_columns() {
        let (from_ast, from_text) = both("ISBLANK(Submitter) OR LEN(Submitter) > 3");
        let expected: BTreeSet<String> = [String::from("Submitter")].into();
        assert_eq!(from_ast, expected);
        assert_eq!(from_text, expected);
    }

    #[test]
    fn unknown_functions_are_not_columns_either() {
        // The text extractor cannot know the registry; anything called like a
        // function is excluded by shape.
        let from_text = extract_fields("MYSTERY(a) + b");
        let expected: BTreeSet<String> = ["a", "b"].into_iter().map(String::from).collect();
        assert_eq!(from_text, expected);
    }

    #[test]
    fn identifiers_inside_string_literals_are_ignored() {
        let from_text = extract_fields("Status = \"Not Started\" AND Owner <> \"\"");
        let expected: BTreeSet<String> = ["Status", "Owner"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(from_text, expected);
    }

    #[test]
    fn true_false_literals_are_excluded() {
        let (from_ast, from_text) = both("Flag = TRUE OR Other = FALSE");
        let expected: BTreeSet<String> = ["Flag", "Other"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(from_ast, expected);
        assert_eq!(from_text, expected);
    }

    #[test]
    fn in_lists_contribute_their_references() {
        let (from_ast, from_text) = both("Status IN (\"Open\", Fallback)");
        let expected: BTreeSet<String> = ["Status", "Fallback"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(from_ast, expected);
        assert_eq!(from_text, expected);
    }
}
