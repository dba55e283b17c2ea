#![forbid(unsafe_code)]

//! Validation pipeline: rules, aggregation, grouping, and reporting.
//!
//! An analytic run takes a validated [`AnalyticConfig`] and a read-only
//! [`Dataset`], evaluates every configured rule to a tri-state truth column,
//! folds the columns into per-row [`RowVerdict`]s, groups the verdicts by the
//! configured column, and judges each group against the error threshold.
//!
//! [`AnalyticConfig`]: attest_model::config::AnalyticConfig
//! [`Dataset`]: attest_model::Dataset

pub mod config;
pub mod error;
pub mod grouping;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod runner;

pub use config::{validate_config, ValidatedConfig};
pub use error::{AnalyticError, ConfigError, RuleError};
pub use grouping::{summarize_groups, GroupSummary, ThresholdStatus};
pub use report::{AnalyticReport, ReportWarning, RuleSummary};
pub use resolver::{aggregate_verdicts, resolve_rules, Resolution, RowVerdict, RuleResult};
pub use rules::{evaluate_rule, RuleContext, RuleKind, RuleOutcome};
pub use runner::{run_analytic, run_analytic_with_today};
