use attest_model::Value;

use crate::ast::Expr;
use crate::error::EvalError;
use crate::eval::{kleene_and, kleene_or, splat, truth_value, ValueColumn};
use crate::functions::{map1, FunctionContext, FunctionSpec, VAR_ARGS};

inventory::submit! {
    FunctionSpec {
        name: "NOT",
        min_args: 1,
        max_args: 1,
        implementation: not_fn,
    }
}

fn not_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    map1(ctx, args, |v| {
        truth_value(v.coerce_to_truth().map(|b| !b))
    })
}

inventory::submit! {
    FunctionSpec {
        name: "AND",
        min_args: 1,
        max_args: VAR_ARGS,
        implementation: and_fn,
    }
}

fn and_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    fold_truth(ctx, args, Some(true), kleene_and)
}

inventory::submit! {
    FunctionSpec {
        name: "OR",
        min_args: 1,
        max_args: VAR_ARGS,
        implementation: or_fn,
    }
}

fn or_fn(ctx: &mut dyn FunctionContext, args: &[Expr]) -> Result<ValueColumn, EvalError> {
    fold_truth(ctx, args, Some(false), kleene_or)
}

fn fold_truth(
    ctx: &mut dyn FunctionContext,
    args: &[Expr],
    identity: Option<bool>,
    combine: fn(Option<bool>, Option<bool>) -> Option<bool>,
) -> Result<ValueColumn, EvalError> {
    let mut acc: Vec<Option<bool>> = vec![identity; ctx.row_count()];
    for arg in args {
        let column = ctx.eval_arg(arg)?;
        for (slot, value) in acc.iter_mut().zip(&column) {
            *slot = combine(*slot, value.coerce_to_truth());
        }
    }
    Ok(acc.into_iter().map(truth_value).collect())
}

inventory::submit! {
    FunctionSpec {
        name: "TRUE",
        min_args: 0,
        max_args: 0,
        implementation: true_fn,
    }
}

fn true_fn(ctx: &mut dyn FunctionContext, _args: &[Expr]) -> Result<ValueColumn, EvalError> {
    Ok(splat(Value::Bool(true), ctx.row_count()))
}

inventory::submit! {
    FunctionSpec {
        name: "FALSE",
        min_args: 0,
        max_args: 0,
        implementation: false_fn,
    }
}

fn false_fn(ctx: &mut dyn FunctionContext, _args: &[Expr]) -> Result<ValueColumn, EvalError> {
    Ok(splat(Value::Bool(false), ctx.row_count()))
}
