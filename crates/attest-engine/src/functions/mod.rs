//! Built-in function registry.
//!
//! Functions are registered with [`inventory`] from per-area `builtins_*`
//! modules and dispatched by upper-cased name. The registry is the
//! evaluator's entire callable surface: an unregistered name fails the
//! formula with [`EvalError::UnknownFunction`], and nothing here touches the
//! host beyond the dataset handed in through [`FunctionContext`].

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::NaiveDate;

use attest_model::Value;

use crate::ast::Expr;
use crate::error::EvalError;
use crate::eval::{DataWarning, ValueColumn};

mod builtins_aggregate;
mod builtins_date_time;
mod builtins_information;
mod builtins_logical;
mod builtins_text;

pub(crate) const VAR_ARGS: usize = 255;

/// What a function implementation may see of the evaluation: argument
/// evaluation, dataset columns, the pinned `today`, and the warning sink.
pub trait FunctionContext {
    fn row_count(&self) -> usize;
    fn today(&self) -> NaiveDate;
    fn column_values(&self, name: &str) -> Option<&[Value]>;
    fn eval_arg(&mut self, expr: &Expr) -> Result<ValueColumn, EvalError>;
    fn warn(&mut self, warning: DataWarning);
}

pub type FunctionImpl = fn(&mut dyn FunctionContext, &[Expr]) -> Result<ValueColumn, EvalError>;

#[derive(Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub implementation: FunctionImpl,
}

inventory::collect!(FunctionSpec);

fn registry() -> &'static HashMap<&'static str, &'static FunctionSpec> {
    static REGISTRY: OnceLock<HashMap<&'static str, &'static FunctionSpec>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        for spec in inventory::iter::<FunctionSpec> {
            map.insert(spec.name, spec);
        }
        map
    })
}

pub fn lookup_function(name: &str) -> Option<&'static FunctionSpec> {
    let upper = name.to_ascii_uppercase();
    registry().get(upper.as_str()).copied()
}

pub fn call_function(
    ctx: &mut dyn FunctionContext,
    name: &str,
    args: &[Expr],
) -> Result<ValueColumn, EvalError> {
    let spec = lookup_function(name).ok_or_else(|| EvalError::UnknownFunction {
        name: name.to_string(),
    })?;

    if args.len() < spec.min_args || args.len() > spec.max_args {
        return Err(EvalError::ArgCount {
            name: spec.name.to_string(),
            min: spec.min_args,
            max: spec.max_args,
            got: args.len(),
        });
    }

    (spec.implementation)(ctx, args)
}

/// Evaluate the sole argument and map it position-wise.
pub(crate) fn map1(
    ctx: &mut dyn FunctionContext,
    args: &[Expr],
    f: impl Fn(&Value) -> Value,
) -> Result<ValueColumn, EvalError> {
    Ok(ctx.eval_arg(&args[0])?.iter().map(f).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_the_mandatory_set() {
        for name in [
            "ISBLANK", "ISNUMBER", "ISERROR", "NOT", "AND", "OR", "LEN", "LEFT", "RIGHT", "MID",
            "UPPER", "LOWER", "TRIM", "TODAY", "DATE", "COUNTIF",
        ] {
            assert!(lookup_function(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup_function("isblank").is_some());
        assert!(lookup_function("IsBlank").is_some());
    }

    #[test]
    fn unknown_function_is_not_found() {
        assert!(lookup_function("VLOOKUP").is_none());
    }
}
