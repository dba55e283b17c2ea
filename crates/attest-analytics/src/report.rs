//! Structured run output handed to external renderers.

use serde::Serialize;

use crate::grouping::{GroupSummary, ThresholdStatus};
use crate::resolver::{Resolution, RowVerdict};

/// A non-fatal finding, attributed to the rule that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportWarning {
    pub rule: String,
    pub message: String,
}

/// Per-rule counts for the report's summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub rule: String,
    pub description: String,
    pub passed: usize,
    pub failed: usize,
    pub missing: usize,
    /// Present when the rule itself failed (its rows are all missing).
    pub error: Option<String>,
}

/// Everything a host needs to render or deliver one analytic run.
#[derive(Debug, Serialize)]
pub struct AnalyticReport {
    pub analytic_id: String,
    pub analytic_name: String,
    pub verdicts: Vec<RowVerdict>,
    pub rules: Vec<RuleSummary>,
    pub groups: Vec<GroupSummary>,
    pub overall: ThresholdStatus,
    pub warnings: Vec<ReportWarning>,
}

pub(crate) fn rule_summaries(resolution: &Resolution) -> Vec<RuleSummary> {
    resolution
        .results
        .iter()
        .map(|result| {
            // Custom formulas may carry a friendlier label than their
            // description.
            let description = result
                .descriptor
                .parameter("display_name")
                .and_then(serde_yaml::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| result.descriptor.description.clone());
            RuleSummary {
                rule: result.descriptor.rule.clone(),
                description,
                passed: result.passed(),
                failed: result.failed(),
                missing: result.missing(),
                error: result.error.as_ref().map(|e| e.to_string()),
            }
        })
        .collect()
}

pub(crate) fn collect_warnings(resolution: &Resolution) -> Vec<ReportWarning> {
    let mut warnings = Vec::new();
    for result in &resolution.results {
        for warning in &result.warnings {
            warnings.push(ReportWarning {
                rule: result.descriptor.description.clone(),
                message: warning.to_string(),
            });
        }
    }
    warnings
}
