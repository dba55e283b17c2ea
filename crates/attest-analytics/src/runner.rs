//! Phase orchestration for one analytic run.
//!
//! The phases are exposed individually (`validate_config`, `resolve_rules`,
//! `aggregate_verdicts`, `summarize_groups`) so a host can stop between
//! them; [`run_analytic`] composes them for the common case. The run is
//! synchronous and CPU-bound; timeouts are the host's concern.

use chrono::{Local, NaiveDate};
use tracing::{error, info};

use attest_model::config::AnalyticConfig;
use attest_model::Dataset;

use crate::config::validate_config;
use crate::error::AnalyticError;
use crate::grouping::{overall_status, summarize_groups};
use crate::report::{collect_warnings, rule_summaries, AnalyticReport};
use crate::resolver::{aggregate_verdicts, resolve_rules};
use crate::rules::RuleContext;

/// Run one analytic end to end with `TODAY()` pinned to the local date.
pub fn run_analytic(
    config: &AnalyticConfig,
    dataset: &Dataset,
) -> Result<AnalyticReport, AnalyticError> {
    run_analytic_with_today(config, dataset, Local::now().date_naive())
}

/// [`run_analytic`] with an explicit run date, for reproducible runs.
pub fn run_analytic_with_today(
    config: &AnalyticConfig,
    dataset: &Dataset,
    today: NaiveDate,
) -> Result<AnalyticReport, AnalyticError> {
    let analytic_id = config.analytic_id.to_string();

    if let Err(source) = validate_config(config) {
        error!(analytic_id = %analytic_id, error = %source, "configuration rejected");
        return Err(AnalyticError::Config {
            analytic_id,
            source,
        });
    }

    info!(
        analytic_id = %analytic_id,
        rows = dataset.row_count(),
        "starting analytic run"
    );

    let ctx = RuleContext {
        dataset,
        reference_data: &config.reference_data,
        today,
    };
    let resolution = resolve_rules(&ctx, &config.validations);
    if resolution.usable_rules() == 0 {
        error!(analytic_id = %analytic_id, "no validation rule produced a result");
        return Err(AnalyticError::NoUsableRules { analytic_id });
    }

    let verdicts = aggregate_verdicts(&resolution, dataset.row_count());
    let groups = summarize_groups(
        dataset,
        &config.reporting.group_by,
        &verdicts,
        config.thresholds.error_percentage,
    );
    let overall = overall_status(&groups);

    info!(
        analytic_id = %analytic_id,
        groups = groups.len(),
        overall = %overall,
        "analytic run complete"
    );

    Ok(AnalyticReport {
        analytic_id,
        analytic_name: config.analytic_name.clone(),
        verdicts,
        rules: rule_summaries(&resolution),
        groups,
        overall,
        warnings: collect_warnings(&resolution),
    })
}
