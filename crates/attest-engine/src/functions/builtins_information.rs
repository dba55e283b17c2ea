use attest_model::Value;

use crate::ast::Expr;
use crate::error::EvalError;
use crate::eval::ValueColumn;
use crate::functions::{map1, FunctionContext, FunctionSpec};

inventory::submit! {
    FunctionSpec {
        name: "ISBLANK",
        min_args: 1,
        max_args: 1,
        implementation: isblank_fn,
    }
}

fn isblank_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    map1(ctx, args, |v| Value::Bool(v.is_blank()))
}

inventory::submit! {
    FunctionSpec {
        name: "ISNUMBER",
        min_args: 1,
        max_args: 1,
        implementation: isnumber_fn,
    }
}

fn isnumber_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    map1(ctx, args, |v| {
        Value::Bool(v.comparison_number().is_some_and(f64::is_finite))
    })
}

inventory::submit! {
    FunctionSpec {
        name: "ISERROR",
        min_args: 1,
        max_args: 1,
        implementation: iserror_fn,
    }
}

fn iserror_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    map1(ctx, args, |v| Value::Bool(v.is_error()))
}

inventory::submit! {
    FunctionSpec {
        name: "ISTEXT",
        min_args: 1,
        max_args: 1,
        implementation: istext_fn,
    }
}

fn istext_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    map1(ctx, args, |v| Value::Bool(matches!(v, Value::Text(_))))
}
