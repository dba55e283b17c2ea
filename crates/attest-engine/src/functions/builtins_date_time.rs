use chrono::NaiveDate;

use attest_model::{parse_date, ErrorKind, Value};

use crate::ast::Expr;
use crate::error::EvalError;
use crate::eval::{splat, ValueColumn};
use crate::functions::{map1, FunctionContext, FunctionSpec};

inventory::submit! {
    FunctionSpec {
        name: "TODAY",
        min_args: 0,
        max_args: 0,
        implementation: today_fn,
    }
}

fn today_fn(ctx: &mut dyn FunctionContext, _args: &[Expr]) -> Result<ValueColumn, EvalError> {
    Ok(splat(Value::Date(ctx.today()), ctx.row_count()))
}

inventory::submit! {
    FunctionSpec {
        name: "NOW",
        min_args: 0,
        max_args: 0,
        implementation: now_fn,
    }
}

// Values are date-granular, so NOW() coincides with TODAY() and is likewise
// constant across the run.
fn now_fn(ctx: &mut dyn FunctionContext, _args: &[Expr]) -> Result<ValueColumn, EvalError> {
    Ok(splat(Value::Date(ctx.today()), ctx.row_count()))
}

inventory::submit! {
    FunctionSpec {
        name: "DATE",
        min_args: 3,
        max_args: 3,
        implementation: date_fn,
    }
}

fn date_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    let years = ctx.eval_arg(&args[0])?;
    let months = ctx.eval_arg(&args[1])?;
    let days = ctx.eval_arg(&args[2])?;
    Ok(years
        .iter()
        .zip(months.iter().zip(&days))
        .map(|(y, (m, d))| build_date(y, m, d))
        .collect())
}

fn build_date(y: &Value, m: &Value, d: &Value) -> Value {
    for part in [y, m, d] {
        if let Value::Error(e) = part {
            return Value::Error(*e);
        }
        if matches!(part, Value::Blank) {
            return Value::Blank;
        }
    }
    let (Ok(y), Ok(m), Ok(d)) = (y.coerce_to_number(), m.coerce_to_number(), d.coerce_to_number())
    else {
        return Value::Error(ErrorKind::Value);
    };
    let (y, m, d) = (y.trunc() as i32, m.trunc() as i64, d.trunc() as i64);
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return Value::Error(ErrorKind::Num);
    }
    match NaiveDate::from_ymd_opt(y, m as u32, d as u32) {
        Some(date) => Value::Date(date),
        None => Value::Error(ErrorKind::Num),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "DATEVALUE",
        min_args: 1,
        max_args: 1,
        implementation: datevalue_fn,
    }
}

fn datevalue_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    map1(ctx, args, |v| match v {
        Value::Error(e) => Value::Error(*e),
        Value::Blank => Value::Blank,
        Value::Date(d) => Value::Date(*d),
        Value::Text(s) => match parse_date(s) {
            Some(d) => Value::Date(d),
            None => Value::Error(ErrorKind::Value),
        },
        _ => Value::Error(ErrorKind::Value),
    })
}
