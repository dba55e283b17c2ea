//! Grouping and threshold judgement.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use attest_model::{Dataset, Value};

use crate::resolver::RowVerdict;

/// Label used when the grouping column is missing at a row.
pub const BLANK_GROUP_LABEL: &str = "(blank)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThresholdStatus {
    Within,
    Exceeds,
}

impl ThresholdStatus {
    pub const fn is_pass(self) -> bool {
        matches!(self, ThresholdStatus::Within)
    }
}

impl fmt::Display for ThresholdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThresholdStatus::Within => "Within",
            ThresholdStatus::Exceeds => "Exceeds",
        })
    }
}

/// Verdict counts for one group of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub gc: usize,
    pub pc: usize,
    pub dnc: usize,
    pub total: usize,
    /// Non-conformance rate: `(DNC + PC) / Total × 100`, the union of the
    /// non-conforming categories.
    pub dnc_percentage: f64,
    pub status: ThresholdStatus,
}

/// Group verdicts by the configured column and judge each group against the
/// error threshold.
///
/// Groups appear in first-occurrence order. A group exceeds when its
/// non-conformance percentage is strictly greater than the threshold.
pub fn summarize_groups(
    dataset: &Dataset,
    group_by: &str,
    verdicts: &[RowVerdict],
    error_percentage: f64,
) -> Vec<GroupSummary> {
    let keys: Vec<String> = match dataset.column(group_by) {
        Some(column) => column.values().iter().map(group_key).collect(),
        None => vec![BLANK_GROUP_LABEL.to_string(); dataset.row_count()],
    };

    let mut order: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(usize, usize, usize)> = Vec::new();

    for (key, verdict) in keys.into_iter().zip(verdicts) {
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            counts.push((0, 0, 0));
            counts.len() - 1
        });
        match verdict {
            RowVerdict::Gc => counts[slot].0 += 1,
            RowVerdict::Pc => counts[slot].1 += 1,
            RowVerdict::Dnc => counts[slot].2 += 1,
        }
    }

    order
        .into_iter()
        .zip(counts)
        .map(|(key, (gc, pc, dnc))| {
            let total = gc + pc + dnc;
            let dnc_percentage = if total == 0 {
                0.0
            } else {
                (dnc + pc) as f64 / total as f64 * 100.0
            };
            let status = if dnc_percentage > error_percentage {
                ThresholdStatus::Exceeds
            } else {
                ThresholdStatus::Within
            };
            GroupSummary {
                key,
                gc,
                pc,
                dnc,
                total,
                dnc_percentage,
                status,
            }
        })
        .collect()
}

/// The analytic's verdict is the worst group verdict; an empty run passes by
/// convention.
pub fn overall_status(groups: &[GroupSummary]) -> ThresholdStatus {
    if groups.iter().any(|g| g.status == ThresholdStatus::Exceeds) {
        ThresholdStatus::Exceeds
    } else {
        ThresholdStatus::Within
    }
}

fn group_key(value: &Value) -> String {
    if value.is_missing() {
        return BLANK_GROUP_LABEL.to_string();
    }
    let text = value.to_string();
    if text.is_empty() {
        BLANK_GROUP_LABEL.to_string()
    } else {
        text
    }
}
