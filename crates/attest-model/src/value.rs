use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::date::{format_date, parse_date};

/// Position-level evaluation failures.
///
/// These are carried inside a value column as [`Value::Error`] so that a
/// single bad cell does not abort the whole column; `ISERROR` observes them
/// and the predicate boundary degrades them to missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `#VALUE!`: an operand could not be coerced to the required type.
    Value,
    /// `#DIV/0!`
    Div0,
    /// `#NUM!`: a numeric result is out of range (e.g. an invalid date).
    Num,
}

impl ErrorKind {
    /// Spreadsheet-style spelling for the error (including punctuation).
    pub const fn as_code(self) -> &'static str {
        match self {
            ErrorKind::Value => "#VALUE!",
            ErrorKind::Div0 => "#DIV/0!",
            ErrorKind::Num => "#NUM!",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Failed to parse an [`ErrorKind`] from its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseErrorKindError;

impl fmt::Display for ParseErrorKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid error code")
    }
}

impl std::error::Error for ParseErrorKindError {}

impl FromStr for ErrorKind {
    type Err = ParseErrorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "#VALUE!" => Ok(ErrorKind::Value),
            "#DIV/0!" => Ok(ErrorKind::Div0),
            "#NUM!" => Ok(ErrorKind::Num),
            _ => Err(ParseErrorKindError),
        }
    }
}

/// A dynamically typed cell value.
///
/// Missing data is the first-class [`Value::Blank`] variant and propagates
/// through operations as three-valued logic rather than as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Blank,
    Error(ErrorKind),
}

impl Value {
    /// Missing for the purposes of three-valued logic: blank cells and
    /// positions that failed a prior evaluation step.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Blank | Value::Error(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Blank in the `ISBLANK` sense: truly missing or an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Blank => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Coerce to a number for arithmetic.
    ///
    /// Missing operands and non-numeric text do not coerce; the caller turns
    /// the `Err` into a missing position rather than aborting the column.
    pub fn coerce_to_number(&self) -> Result<f64, ErrorKind> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ErrorKind::Value);
                }
                trimmed.parse::<f64>().map_err(|_| ErrorKind::Value)
            }
            Value::Date(_) | Value::Blank => Err(ErrorKind::Value),
            Value::Error(e) => Err(*e),
        }
    }

    /// Tri-state truth value: `None` is missing.
    ///
    /// Numbers are truthy when non-zero and text is accepted only when it
    /// spells a boolean; anything else is missing, not an error.
    pub fn coerce_to_truth(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            Value::Text(s) => {
                let t = s.trim();
                if t.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if t.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            Value::Date(_) | Value::Blank | Value::Error(_) => None,
        }
    }

    /// Render for string concatenation; missing renders as the empty string.
    pub fn concat_text(&self) -> String {
        match self {
            Value::Blank | Value::Error(_) => String::new(),
            other => other.to_string(),
        }
    }

    /// Interpret as a calendar date, parsing text in the formats the loader
    /// accepts (`YYYY-MM-DD`, `MM/DD/YYYY`).
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// A number for comparison purposes, without boolean coercion.
    pub fn comparison_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()
            }
            _ => None,
        }
    }
}

/// Ordering used by the comparison operators.
///
/// Both sides as numbers, else both as dates, else as strings
/// (lexicographic, case-sensitive). Missing compares as missing and the
/// result is `None`.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if left.is_missing() || right.is_missing() {
        return None;
    }

    if let (Some(l), Some(r)) = (left.comparison_number(), right.comparison_number()) {
        return Some(l.partial_cmp(&r).unwrap_or(Ordering::Equal));
    }

    if let (Some(l), Some(r)) = (left.as_date(), right.as_date()) {
        return Some(l.cmp(&r));
    }

    Some(left.to_string().cmp(&right.to_string()))
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Date(d) => f.write_str(&format_date(*d)),
            Value::Blank => Ok(()),
            Value::Error(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_empty_text_are_blank() {
        assert!(Value::Blank.is_blank());
        assert!(Value::Text(String::new()).is_blank());
        assert!(!Value::Text(" ".to_string()).is_blank());
        assert!(!Value::Number(0.0).is_blank());
    }

    #[test]
    fn number_coercion_rejects_missing_and_text() {
        assert_eq!(Value::Number(2.5).coerce_to_number(), Ok(2.5));
        assert_eq!(Value::Text(" 7 ".into()).coerce_to_number(), Ok(7.0));
        assert_eq!(Value::Bool(true).coerce_to_number(), Ok(1.0));
        assert!(Value::Blank.coerce_to_number().is_err());
        assert!(Value::Text("seven".into()).coerce_to_number().is_err());
    }

    #[test]
    fn comparison_prefers_numbers_then_dates_then_text() {
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert_eq!(
            compare_values(&Value::Text("10".into()), &Value::Number(9.0)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_values(&Value::Text("2024-01-01".into()), &Value::Date(jan1)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_values(&Value::Text("apple".into()), &Value::Text("APPLE".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_values(&Value::Text("apple".into()), &Value::Text("apple".into())),
            Some(Ordering::Equal)
        );
        assert_eq!(compare_values(&Value::Blank, &Value::Number(1.0)), None);
    }

    #[test]
    fn display_spelling() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(3.25).to_string(), "3.25");
        assert_eq!(Value::Bool(true).to_string(), "TRUE");
        assert_eq!(Value::Blank.to_string(), "");
        assert_eq!(Value::Error(ErrorKind::Div0).to_string(), "#DIV/0!");
    }
}
