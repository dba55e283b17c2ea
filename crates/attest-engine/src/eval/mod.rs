//! Column-vectorised evaluation.
//!
//! [`Evaluator`] executes a parsed formula against a [`Dataset`], producing a
//! value column of the dataset's row count. Per-position failures (bad
//! coercions, division by zero) become [`Value::Error`] at that position and
//! degrade to missing at the predicate boundary; only structural problems
//! (unknown function, arity, nesting depth) abort the formula with
//! [`EvalError`].

use std::fmt;

use chrono::{Days, Local, NaiveDate};

use attest_model::value::compare_values;
use attest_model::{Dataset, ErrorKind, Value};

use crate::ast::{Ast, BinaryOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::functions::{self, FunctionContext};
use crate::parser::MAX_NESTING_DEPTH;

/// The evaluator's unit of exchange: one value per dataset row.
pub type ValueColumn = Vec<Value>;

/// Non-fatal findings gathered while evaluating a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataWarning {
    /// A referenced column is not in the dataset; it evaluated as all-missing.
    MissingColumn { column: String },
    /// Positions that could not be coerced to the required type and became
    /// missing.
    CoercionFailures { count: usize },
    /// `a < b < c` compares a boolean against a value; almost certainly a
    /// user error.
    ChainedComparison,
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::MissingColumn { column } => {
                write!(f, "column `{column}` is not present in the dataset")
            }
            DataWarning::CoercionFailures { count } => {
                write!(f, "{count} position(s) could not be coerced and became missing")
            }
            DataWarning::ChainedComparison => {
                f.write_str("chained comparison compares a boolean result against a value")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutput {
    pub values: ValueColumn,
    pub warnings: Vec<DataWarning>,
}

/// A formula used as a validation: tri-state truth per row.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateOutput {
    pub truth: Vec<Option<bool>>,
    pub warnings: Vec<DataWarning>,
}

/// Tree-walking, column-at-a-time interpreter.
///
/// The evaluator owns nothing but a borrow of the dataset and the run's
/// `today`; it can be reused across formulas. `TODAY()` is constant across
/// the run by construction.
pub struct Evaluator<'a> {
    dataset: &'a Dataset,
    today: NaiveDate,
    warnings: Vec<DataWarning>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            today: Local::now().date_naive(),
            warnings: Vec::new(),
            depth: 0,
        }
    }

    /// Pin `TODAY()` for reproducible runs and tests.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Evaluate a formula to a value column of the dataset's row count.
    pub fn evaluate(&mut self, ast: &Ast) -> Result<EvalOutput, EvalError> {
        self.warnings.clear();
        self.depth = 0;

        if has_chained_comparison(&ast.expr) {
            self.warnings.push(DataWarning::ChainedComparison);
        }

        let values = self.eval_expr(&ast.expr)?;
        debug_assert_eq!(values.len(), self.dataset.row_count());

        Ok(EvalOutput {
            values,
            warnings: std::mem::take(&mut self.warnings),
        })
    }

    /// Evaluate a formula used as a validation rule: coerce the result to
    /// tri-state truth, counting positions that would not coerce.
    pub fn evaluate_predicate(&mut self, ast: &Ast) -> Result<PredicateOutput, EvalError> {
        let output = self.evaluate(ast)?;
        let mut warnings = output.warnings;

        let mut failures = 0usize;
        let truth: Vec<Option<bool>> = output
            .values
            .iter()
            .map(|value| {
                let t = value.coerce_to_truth();
                if t.is_none() && !matches!(value, Value::Blank) {
                    failures += 1;
                }
                t
            })
            .collect();

        if failures > 0 {
            warnings.push(DataWarning::CoercionFailures { count: failures });
        }

        Ok(PredicateOutput { truth, warnings })
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<ValueColumn, EvalError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.depth -= 1;
            return Err(EvalError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        let result = self.eval_expr_inner(expr);
        self.depth -= 1;
        result
    }

    fn eval_expr_inner(&mut self, expr: &Expr) -> Result<ValueColumn, EvalError> {
        let n = self.dataset.row_count();
        match expr {
            Expr::Number(v) => Ok(splat(Value::Number(*v), n)),
            Expr::Text(v) => Ok(splat(Value::Text(v.clone()), n)),
            Expr::Bool(v) => Ok(splat(Value::Bool(*v), n)),
            Expr::ColumnRef(name) => match self.dataset.column(name) {
                Some(column) => Ok(column.values().to_vec()),
                None => {
                    self.warn(DataWarning::MissingColumn {
                        column: name.clone(),
                    });
                    Ok(splat(Value::Blank, n))
                }
            },
            Expr::Unary { op, expr } => {
                let column = self.eval_expr(expr)?;
                Ok(match op {
                    UnaryOp::Minus => column.iter().map(negate).collect(),
                    UnaryOp::Not => column
                        .iter()
                        .map(|v| truth_value(v.coerce_to_truth().map(|b| !b)))
                        .collect(),
                })
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                Ok(match op {
                    BinaryOp::And => zip_map(&l, &r, |a, b| {
                        truth_value(kleene_and(a.coerce_to_truth(), b.coerce_to_truth()))
                    }),
                    BinaryOp::Or => zip_map(&l, &r, |a, b| {
                        truth_value(kleene_or(a.coerce_to_truth(), b.coerce_to_truth()))
                    }),
                    BinaryOp::Concat => zip_map(&l, &r, concat),
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                        zip_map(&l, &r, |a, b| arithmetic(*op, a, b))
                    }
                    _ => zip_map(&l, &r, |a, b| compare(*op, a, b)),
                })
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval_expr(cond)?;
                let then = self.eval_expr(then)?;
                let otherwise = self.eval_expr(otherwise)?;
                Ok(cond
                    .iter()
                    .zip(then.into_iter().zip(otherwise))
                    .map(|(c, (t, o))| match c {
                        Value::Error(e) => Value::Error(*e),
                        _ => match c.coerce_to_truth() {
                            Some(true) => t,
                            Some(false) => o,
                            None => Value::Blank,
                        },
                    })
                    .collect())
            }
            Expr::In { value, list } => {
                let candidate = self.eval_expr(value)?;
                let columns: Vec<ValueColumn> = list
                    .iter()
                    .map(|item| self.eval_expr(item))
                    .collect::<Result<_, _>>()?;
                Ok(candidate
                    .iter()
                    .enumerate()
                    .map(|(i, v)| match v {
                        Value::Error(e) => Value::Error(*e),
                        Value::Blank => Value::Blank,
                        _ => {
                            let found = columns.iter().any(|col| {
                                compare_values(v, &col[i]) == Some(std::cmp::Ordering::Equal)
                            });
                            Value::Bool(found)
                        }
                    })
                    .collect())
            }
            Expr::FunctionCall { name, args } => functions::call_function(self, name, args),
        }
    }
}

impl FunctionContext for Evaluator<'_> {
    fn row_count(&self) -> usize {
        self.dataset.row_count()
    }

    fn today(&self) -> NaiveDate {
        self.today
    }

    fn column_values(&self, name: &str) -> Option<&[Value]> {
        self.dataset.column(name).map(|c| c.values())
    }

    fn eval_arg(&mut self, expr: &Expr) -> Result<ValueColumn, EvalError> {
        self.eval_expr(expr)
    }

    fn warn(&mut self, warning: DataWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

pub(crate) fn splat(value: Value, len: usize) -> ValueColumn {
    vec![value; len]
}

fn zip_map(l: &[Value], r: &[Value], f: impl Fn(&Value, &Value) -> Value) -> ValueColumn {
    l.iter().zip(r).map(|(a, b)| f(a, b)).collect()
}

pub(crate) fn truth_value(t: Option<bool>) -> Value {
    match t {
        Some(b) => Value::Bool(b),
        None => Value::Blank,
    }
}

/// Kleene three-valued AND: a missing operand only matters when the other
/// side fails to decide the result.
pub(crate) fn kleene_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

pub(crate) fn kleene_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn negate(v: &Value) -> Value {
    match v {
        Value::Error(e) => Value::Error(*e),
        Value::Blank => Value::Blank,
        other => match other.coerce_to_number() {
            Ok(n) => Value::Number(-n),
            Err(_) => Value::Error(ErrorKind::Value),
        },
    }
}

fn concat(a: &Value, b: &Value) -> Value {
    if let Value::Error(e) = a {
        return Value::Error(*e);
    }
    if let Value::Error(e) = b {
        return Value::Error(*e);
    }
    Value::Text(format!("{}{}", a.concat_text(), b.concat_text()))
}

fn compare(op: BinaryOp, a: &Value, b: &Value) -> Value {
    if let Value::Error(e) = a {
        return Value::Error(*e);
    }
    if let Value::Error(e) = b {
        return Value::Error(*e);
    }
    let Some(ord) = compare_values(a, b) else {
        return Value::Blank;
    };
    let result = match op {
        BinaryOp::Eq => ord == std::cmp::Ordering::Equal,
        BinaryOp::Ne => ord != std::cmp::Ordering::Equal,
        BinaryOp::Lt => ord == std::cmp::Ordering::Less,
        BinaryOp::Le => ord != std::cmp::Ordering::Greater,
        BinaryOp::Gt => ord == std::cmp::Ordering::Greater,
        BinaryOp::Ge => ord != std::cmp::Ordering::Less,
        _ => unreachable!("compare called with a non-comparison operator"),
    };
    Value::Bool(result)
}

fn arithmetic(op: BinaryOp, a: &Value, b: &Value) -> Value {
    if let Value::Error(e) = a {
        return Value::Error(*e);
    }
    if let Value::Error(e) = b {
        return Value::Error(*e);
    }
    if matches!(a, Value::Blank) || matches!(b, Value::Blank) {
        return Value::Blank;
    }

    // Calendar arithmetic: dates shift by whole days, and subtracting two
    // dates yields the day difference.
    match (a, b, op) {
        (Value::Date(d1), Value::Date(d2), BinaryOp::Sub) => {
            return Value::Number((*d1 - *d2).num_days() as f64);
        }
        (Value::Date(d), other, BinaryOp::Add | BinaryOp::Sub) if !matches!(other, Value::Date(_)) => {
            return match other.coerce_to_number() {
                Ok(n) => shift_date(*d, if op == BinaryOp::Sub { -n } else { n }),
                Err(_) => Value::Error(ErrorKind::Value),
            };
        }
        (other, Value::Date(d), BinaryOp::Add) if !matches!(other, Value::Date(_)) => {
            return match other.coerce_to_number() {
                Ok(n) => shift_date(*d, n),
                Err(_) => Value::Error(ErrorKind::Value),
            };
        }
        _ => {}
    }

    let (Ok(x), Ok(y)) = (a.coerce_to_number(), b.coerce_to_number()) else {
        return Value::Error(ErrorKind::Value);
    };
    match op {
        BinaryOp::Add => Value::Number(x + y),
        BinaryOp::Sub => Value::Number(x - y),
        BinaryOp::Mul => Value::Number(x * y),
        BinaryOp::Div => {
            if y == 0.0 {
                Value::Error(ErrorKind::Div0)
            } else {
                Value::Number(x / y)
            }
        }
        _ => unreachable!("arithmetic called with a non-arithmetic operator"),
    }
}

fn shift_date(date: NaiveDate, days: f64) -> Value {
    let days = days.trunc() as i64;
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    match shifted {
        Some(d) => Value::Date(d),
        None => Value::Error(ErrorKind::Num),
    }
}

fn has_chained_comparison(expr: &Expr) -> bool {
    fn is_comparison(expr: &Expr) -> bool {
        matches!(expr, Expr::Binary { op, .. } if op.is_comparison())
    }

    match expr {
        Expr::Binary { op, left, right } => {
            if op.is_comparison() && (is_comparison(left) || is_comparison(right)) {
                return true;
            }
            has_chained_comparison(left) || has_chained_comparison(right)
        }
        Expr::Unary { expr, .. } => has_chained_comparison(expr),
        Expr::If {
            cond,
            then,
            otherwise,
        } => {
            has_chained_comparison(cond)
                || has_chained_comparison(then)
                || has_chained_comparison(otherwise)
        }
        Expr::In { value, list } => {
            has_chained_comparison(value) || list.iter().any(has_chained_comparison)
        }
        Expr::FunctionCall { args, .. } => args.iter().any(has_chained_comparison),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kleene_truth_tables() {
        assert_eq!(kleene_and(None, Some(false)), Some(false));
        assert_eq!(kleene_and(None, Some(true)), None);
        assert_eq!(kleene_and(Some(true), Some(true)), Some(true));
        assert_eq!(kleene_or(None, Some(true)), Some(true));
        assert_eq!(kleene_or(None, Some(false)), None);
        assert_eq!(kleene_or(Some(false), Some(false)), Some(false));
    }

    #[test]
    fn date_arithmetic_shifts_by_days() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let feb2 = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        assert_eq!(
            arithmetic(BinaryOp::Add, &Value::Date(jan31), &Value::Number(2.0)),
            Value::Date(feb2)
        );
        assert_eq!(
            arithmetic(BinaryOp::Sub, &Value::Date(feb2), &Value::Date(jan31)),
            Value::Number(2.0)
        );
    }

    #[test]
    fn arithmetic_propagates_missing_and_flags_bad_text() {
        assert_eq!(
            arithmetic(BinaryOp::Add, &Value::Blank, &Value::Number(1.0)),
            Value::Blank
        );
        assert_eq!(
            arithmetic(BinaryOp::Add, &Value::Text("x".into()), &Value::Number(1.0)),
            Value::Error(ErrorKind::Value)
        );
        assert_eq!(
            arithmetic(BinaryOp::Div, &Value::Number(1.0), &Value::Number(0.0)),
            Value::Error(ErrorKind::Div0)
        );
    }
}
