//! Whole-column conditional aggregates.
//!
//! These take a column reference (not an arbitrary expression) as their first
//! argument and a literal criterion as their second, and broadcast one
//! aggregate over the result column.

use std::cmp::Ordering;

use attest_model::value::compare_values;
use attest_model::{ErrorKind, Value};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::eval::{splat, DataWarning, ValueColumn};
use crate::functions::{FunctionContext, FunctionSpec};

struct Criterion {
    op: BinaryOp,
    operand: Value,
}

/// Parse a criterion: `">5"`, `"<>x"`, or a bare value meaning equality.
fn parse_criterion(value: &Value) -> Criterion {
    if let Value::Text(s) = value {
        for (prefix, op) in [
            (">=", BinaryOp::Ge),
            ("<=", BinaryOp::Le),
            ("<>", BinaryOp::Ne),
            (">", BinaryOp::Gt),
            ("<", BinaryOp::Lt),
            ("=", BinaryOp::Eq),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return Criterion {
                    op,
                    operand: Value::Text(rest.trim().to_string()),
                };
            }
        }
    }
    Criterion {
        op: BinaryOp::Eq,
        operand: value.clone(),
    }
}

fn criterion_matches(cell: &Value, criterion: &Criterion) -> bool {
    let Some(ord) = compare_values(cell, &criterion.operand) else {
        return false;
    };
    match criterion.op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        _ => false,
    }
}

fn column_name_arg<'e>(expr: &'e Expr, function: &str) -> Result<&'e str, EvalError> {
    match expr {
        Expr::ColumnRef(name) => Ok(name),
        _ => Err(EvalError::InvalidArgument {
            name: function.to_string(),
            message: "first argument must be a column reference".to_string(),
        }),
    }
}

fn literal_arg(expr: &Expr, function: &str) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Unary {
            op: UnaryOp::Minus,
            expr,
        } => match expr.as_ref() {
            Expr::Number(n) => Ok(Value::Number(-n)),
            _ => Err(EvalError::InvalidArgument {
                name: function.to_string(),
                message: "criterion must be a literal".to_string(),
            }),
        },
        _ => Err(EvalError::InvalidArgument {
            name: function.to_string(),
            message: "criterion must be a literal".to_string(),
        }),
    }
}

/// Resolve the target column, warning (and yielding no rows) when absent.
fn target_column<'c>(
    ctx: &'c mut dyn FunctionContext,
    name: &str,
) -> &'c [Value] {
    if ctx.column_values(name).is_none() {
        ctx.warn(DataWarning::MissingColumn {
            column: name.to_string(),
        });
        return &[];
    }
    ctx.column_values(name).expect("checked above")
}

inventory::submit! {
    FunctionSpec {
        name: "COUNTIF",
        min_args: 2,
        max_args: 2,
        implementation: countif_fn,
    }
}

fn countif_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    let name = column_name_arg(&args[0], "COUNTIF")?;
    let criterion = parse_criterion(&literal_arg(&args[1], "COUNTIF")?);
    let rows = ctx.row_count();
    let count = target_column(ctx, name)
        .iter()
        .filter(|cell| criterion_matches(cell, &criterion))
        .count();
    Ok(splat(Value::Number(count as f64), rows))
}

inventory::submit! {
    FunctionSpec {
        name: "SUMIF",
        min_args: 2,
        max_args: 2,
        implementation: sumif_fn,
    }
}

fn sumif_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    let name = column_name_arg(&args[0], "SUMIF")?;
    let criterion = parse_criterion(&literal_arg(&args[1], "SUMIF")?);
    let rows = ctx.row_count();
    let sum: f64 = target_column(ctx, name)
        .iter()
        .filter(|cell| criterion_matches(cell, &criterion))
        .filter_map(|cell| cell.coerce_to_number().ok())
        .sum();
    Ok(splat(Value::Number(sum), rows))
}

inventory::submit! {
    FunctionSpec {
        name: "AVERAGEIF",
        min_args: 2,
        max_args: 2,
        implementation: averageif_fn,
    }
}

fn averageif_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    let name = column_name_arg(&args[0], "AVERAGEIF")?;
    let criterion = parse_criterion(&literal_arg(&args[1], "AVERAGEIF")?);
    let rows = ctx.row_count();
    let numbers: Vec<f64> = target_column(ctx, name)
        .iter()
        .filter(|cell| criterion_matches(cell, &criterion))
        .filter_map(|cell| cell.coerce_to_number().ok())
        .collect();
    if numbers.is_empty() {
        return Ok(splat(Value::Error(ErrorKind::Div0), rows));
    }
    let avg = numbers.iter().sum::<f64>() / numbers.len() as f64;
    Ok(splat(Value::Number(avg), rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_prefixes() {
        let gt = parse_criterion(&Value::Text(">5".into()));
        assert_eq!(gt.op, BinaryOp::Gt);
        assert!(criterion_matches(&Value::Number(7.0), &gt));
        assert!(!criterion_matches(&Value::Number(5.0), &gt));

        let eq = parse_criterion(&Value::Text("=x".into()));
        assert!(criterion_matches(&Value::Text("x".into()), &eq));
        assert!(!criterion_matches(&Value::Text("X".into()), &eq));

        let bare = parse_criterion(&Value::Number(3.0));
        assert!(criterion_matches(&Value::Text("3".into()), &bare));
    }

    #[test]
    fn missing_cells_never_match() {
        let any = parse_criterion(&Value::Text("<>done".into()));
        assert!(!criterion_matches(&Value::Blank, &any));
    }
}
