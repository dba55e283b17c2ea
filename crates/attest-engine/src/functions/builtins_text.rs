use attest_model::{ErrorKind, Value};

use crate::ast::Expr;
use crate::error::EvalError;
use crate::eval::ValueColumn;
use crate::functions::{map1, FunctionContext, FunctionSpec, VAR_ARGS};

/// Text of a value for the string functions; missing reads as empty, errors
/// propagate.
fn text_of(v: &Value) -> Result<String, ErrorKind> {
    match v {
        Value::Error(e) => Err(*e),
        other => Ok(other.concat_text()),
    }
}

/// A character count argument. Missing stays missing; non-numeric or
/// negative counts are value errors.
fn count_of(v: &Value) -> Result<Option<usize>, ErrorKind> {
    match v {
        Value::Error(e) => Err(*e),
        Value::Blank => Ok(None),
        other => {
            let n = other.coerce_to_number()?;
            if n < 0.0 {
                return Err(ErrorKind::Value);
            }
            Ok(Some(n.trunc() as usize))
        }
    }
}

fn text_unary(
    ctx: &mut dyn FunctionContext,
    args: &[Expr],
    f: impl Fn(&str) -> Value,
) -> Result<ValueColumn, EvalError> {
    map1(ctx, args, |v| match text_of(v) {
        Ok(text) => f(&text),
        Err(e) => Value::Error(e),
    })
}

inventory::submit! {
    FunctionSpec {
        name: "LEN",
        min_args: 1,
        max_args: 1,
        implementation: len_fn,
    }
}

fn len_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    text_unary(ctx, args, |s| Value::Number(s.chars().count() as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "UPPER",
        min_args: 1,
        max_args: 1,
        implementation: upper_fn,
    }
}

fn upper_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    text_unary(ctx, args, |s| Value::Text(s.to_uppercase()))
}

inventory::submit! {
    FunctionSpec {
        name: "LOWER",
        min_args: 1,
        max_args: 1,
        implementation: lower_fn,
    }
}

fn lower_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    text_unary(ctx, args, |s| Value::Text(s.to_lowercase()))
}

inventory::submit! {
    FunctionSpec {
        name: "TRIM",
        min_args: 1,
        max_args: 1,
        implementation: trim_fn,
    }
}

fn trim_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    text_unary(ctx, args, |s| Value::Text(s.trim().to_string()))
}

inventory::submit! {
    FunctionSpec {
        name: "LEFT",
        min_args: 1,
        max_args: 2,
        implementation: left_fn,
    }
}

fn left_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    let text = ctx.eval_arg(&args[0])?;
    let counts = optional_counts(ctx, args.get(1), text.len())?;
    Ok(text
        .iter()
        .zip(counts)
        .map(|(v, count)| take_chars(v, count, |s, k| s.chars().take(k).collect()))
        .collect())
}

inventory::submit! {
    FunctionSpec {
        name: "RIGHT",
        min_args: 1,
        max_args: 2,
        implementation: right_fn,
    }
}

fn right_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    let text = ctx.eval_arg(&args[0])?;
    let counts = optional_counts(ctx, args.get(1), text.len())?;
    Ok(text
        .iter()
        .zip(counts)
        .map(|(v, count)| {
            take_chars(v, count, |s, k| {
                let total = s.chars().count();
                s.chars().skip(total.saturating_sub(k)).collect()
            })
        })
        .collect())
}

inventory::submit! {
    FunctionSpec {
        name: "MID",
        min_args: 3,
        max_args: 3,
        implementation: mid_fn,
    }
}

fn mid_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    let text = ctx.eval_arg(&args[0])?;
    let starts = ctx.eval_arg(&args[1])?;
    let lengths = ctx.eval_arg(&args[2])?;
    Ok(text
        .iter()
        .zip(starts.iter().zip(&lengths))
        .map(|(v, (start, length))| mid_at(v, start, length))
        .collect())
}

fn mid_at(v: &Value, start: &Value, length: &Value) -> Value {
    let text = match text_of(v) {
        Ok(t) => t,
        Err(e) => return Value::Error(e),
    };
    let start = match count_of(start) {
        Ok(Some(s)) if s >= 1 => s,
        Ok(Some(_)) => return Value::Error(ErrorKind::Value),
        Ok(None) => return Value::Blank,
        Err(e) => return Value::Error(e),
    };
    let length = match count_of(length) {
        Ok(Some(l)) => l,
        Ok(None) => return Value::Blank,
        Err(e) => return Value::Error(e),
    };
    Value::Text(text.chars().skip(start - 1).take(length).collect())
}

inventory::submit! {
    FunctionSpec {
        name: "CONCATENATE",
        min_args: 1,
        max_args: VAR_ARGS,
        implementation: concatenate_fn,
    }
}

fn concatenate_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    let mut out: Vec<Result<String, ErrorKind>> = vec![Ok(String::new()); ctx.row_count()];
    for arg in args {
        let column = ctx.eval_arg(arg)?;
        for (slot, value) in out.iter_mut().zip(&column) {
            if let Ok(acc) = slot {
                match text_of(value) {
                    Ok(text) => acc.push_str(&text),
                    Err(e) => *slot = Err(e),
                }
            }
        }
    }
    Ok(out
        .into_iter()
        .map(|r| match r {
            Ok(s) => Value::Text(s),
            Err(e) => Value::Error(e),
        })
        .collect())
}

/// Evaluate an optional per-row count argument; absent means 1 everywhere.
fn optional_counts(
    ctx: &mut dyn FunctionContext,
    arg: Option<&Expr>,
    len: usize,
) -> Result<Vec<Value>, EvalError> {
    match arg {
        Some(expr) => ctx.eval_arg(expr),
        None => Ok(vec![Value::Number(1.0); len]),
    }
}

fn take_chars(v: &Value, count: Value, f: impl Fn(&str, usize) -> String) -> Value {
    let text = match text_of(v) {
        Ok(t) => t,
        Err(e) => return Value::Error(e),
    };
    match count_of(&count) {
        Ok(Some(k)) => Value::Text(f(&text, k)),
        Ok(None) => Value::Blank,
        Err(e) => Value::Error(e),
    }
}
