//! Rule resolution and per-row verdict aggregation.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use attest_model::config::RuleDescriptor;

use crate::error::RuleError;
use crate::rules::{evaluate_rule, RuleContext};

/// Per-row conformance classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowVerdict {
    /// Generally conforms: every rule returned true.
    #[serde(rename = "GC")]
    Gc,
    /// Partially conforms: mixed results, or any rule missing at this row.
    #[serde(rename = "PC")]
    Pc,
    /// Does not conform: every rule returned false.
    #[serde(rename = "DNC")]
    Dnc,
}

impl RowVerdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            RowVerdict::Gc => "GC",
            RowVerdict::Pc => "PC",
            RowVerdict::Dnc => "DNC",
        }
    }
}

impl fmt::Display for RowVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule's contribution to the run.
#[derive(Debug)]
pub struct RuleResult {
    pub descriptor: RuleDescriptor,
    /// Tri-state truth per row. A failed rule contributes missing at every
    /// row.
    pub truth: Vec<Option<bool>>,
    pub warnings: Vec<attest_engine::DataWarning>,
    /// The failure that voided this rule, when there was one.
    pub error: Option<RuleError>,
}

impl RuleResult {
    pub fn passed(&self) -> usize {
        self.truth.iter().filter(|t| **t == Some(true)).count()
    }

    pub fn failed(&self) -> usize {
        self.truth.iter().filter(|t| **t == Some(false)).count()
    }

    pub fn missing(&self) -> usize {
        self.truth.iter().filter(|t| t.is_none()).count()
    }
}

/// All rule contributions for one analytic run.
#[derive(Debug)]
pub struct Resolution {
    pub results: Vec<RuleResult>,
}

impl Resolution {
    /// Rules that actually produced a truth column.
    pub fn usable_rules(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_none()).count()
    }
}

/// Run every configured rule, containing per-rule failures.
///
/// A failed rule is logged, recorded with its error, and contributes a
/// missing column; deciding whether the analytic can continue is the
/// caller's job.
pub fn resolve_rules(ctx: &RuleContext<'_>, validations: &[RuleDescriptor]) -> Resolution {
    let rows = ctx.dataset.row_count();
    let mut results = Vec::with_capacity(validations.len());

    for descriptor in validations {
        match evaluate_rule(ctx, descriptor) {
            Ok(outcome) => {
                info!(
                    rule = descriptor.rule.as_str(),
                    description = descriptor.description.as_str(),
                    warnings = outcome.warnings.len(),
                    "rule evaluated"
                );
                results.push(RuleResult {
                    descriptor: descriptor.clone(),
                    truth: outcome.truth,
                    warnings: outcome.warnings,
                    error: None,
                });
            }
            Err(error) => {
                warn!(
                    rule = descriptor.rule.as_str(),
                    description = descriptor.description.as_str(),
                    error = %error,
                    "rule failed; treating its contribution as missing"
                );
                results.push(RuleResult {
                    descriptor: descriptor.clone(),
                    truth: vec![None; rows],
                    warnings: Vec::new(),
                    error: Some(error),
                });
            }
        }
    }

    Resolution { results }
}

/// Fold per-rule truth columns into one verdict per row.
pub fn aggregate_verdicts(resolution: &Resolution, rows: usize) -> Vec<RowVerdict> {
    (0..rows)
        .map(|row| {
            let mut any_true = false;
            let mut any_false = false;
            let mut any_missing = false;
            for result in &resolution.results {
                match result.truth[row] {
                    Some(true) => any_true = true,
                    Some(false) => any_false = true,
                    None => any_missing = true,
                }
            }
            if any_missing || (any_true && any_false) {
                RowVerdict::Pc
            } else if any_false {
                RowVerdict::Dnc
            } else {
                RowVerdict::Gc
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution_of(columns: Vec<Vec<Option<bool>>>) -> Resolution {
        Resolution {
            results: columns
                .into_iter()
                .map(|truth| RuleResult {
                    descriptor: RuleDescriptor {
                        rule: "custom_formula".to_string(),
                        description: "test".to_string(),
                        rationale: None,
                        parameters: Default::default(),
                    },
                    truth,
                    warnings: Vec::new(),
                    error: None,
                })
                .collect(),
        }
    }

    #[test]
    fn verdict_fold() {
        let resolution = resolution_of(vec![
            vec![Some(true), Some(true), Some(false), None],
            vec![Some(true), Some(false), Some(false), Some(true)],
        ]);
        assert_eq!(
            aggregate_verdicts(&resolution, 4),
            vec![
                RowVerdict::Gc,
                RowVerdict::Pc,
                RowVerdict::Dnc,
                RowVerdict::Pc
            ]
        );
    }

    #[test]
    fn uniformly_true_rule_never_changes_a_verdict() {
        let base = resolution_of(vec![vec![
            Some(true),
            Some(false),
            None,
            Some(true),
        ]]);
        let before = aggregate_verdicts(&base, 4);

        let mut widened = base;
        widened.results.push(RuleResult {
            descriptor: widened.results[0].descriptor.clone(),
            truth: vec![Some(true); 4],
            warnings: Vec::new(),
            error: None,
        });
        let after = aggregate_verdicts(&widened, 4);
        assert_eq!(before, after);
    }

    #[test]
    fn uniformly_false_rule_degrades_gc_to_pc_and_keeps_dnc() {
        let base = resolution_of(vec![vec![Some(true), Some(false)]]);
        assert_eq!(
            aggregate_verdicts(&base, 2),
            vec![RowVerdict::Gc, RowVerdict::Dnc]
        );

        let mut widened = base;
        widened.results.push(RuleResult {
            descriptor: widened.results[0].descriptor.clone(),
            truth: vec![Some(false); 2],
            warnings: Vec::new(),
            error: None,
        });
        assert_eq!(
            aggregate_verdicts(&widened, 2),
            vec![RowVerdict::Pc, RowVerdict::Dnc]
        );
    }
}
