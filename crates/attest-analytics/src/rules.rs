//! Built-in validation rules.
//!
//! Every rule maps `(dataset, parameters)` to a tri-state truth column the
//! length of the dataset. Built-ins are total over their inputs: data
//! problems (missing values, absent columns) surface as per-row violations
//! or warnings, never as rule failures. Only bad parameters, an undefined
//! reference table, or a broken custom formula fail the rule itself.

use std::borrow::Cow;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use attest_engine::eval::DataWarning;
use attest_engine::{parse_formula, Evaluator};
use attest_model::config::{ReferenceData, RuleDescriptor};
use attest_model::value::compare_values;
use attest_model::{Dataset, Value};

use crate::error::RuleError;

/// The rule vocabulary a configuration may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    SegregationOfDuties,
    ApprovalSequence,
    TitleBasedApproval,
    ThirdPartyRisk,
    Enumeration,
    CustomFormula,
}

impl RuleKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "segregation_of_duties" => Some(RuleKind::SegregationOfDuties),
            "approval_sequence" => Some(RuleKind::ApprovalSequence),
            "title_based_approval" => Some(RuleKind::TitleBasedApproval),
            "third_party_risk_validation" => Some(RuleKind::ThirdPartyRisk),
            "enumeration_validation" => Some(RuleKind::Enumeration),
            "custom_formula" => Some(RuleKind::CustomFormula),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            RuleKind::SegregationOfDuties => "segregation_of_duties",
            RuleKind::ApprovalSequence => "approval_sequence",
            RuleKind::TitleBasedApproval => "title_based_approval",
            RuleKind::ThirdPartyRisk => "third_party_risk_validation",
            RuleKind::Enumeration => "enumeration_validation",
            RuleKind::CustomFormula => "custom_formula",
        }
    }
}

/// Everything a rule may consult while it runs.
pub struct RuleContext<'a> {
    pub dataset: &'a Dataset,
    pub reference_data: &'a ReferenceData,
    /// Pinned date for `TODAY()` in custom formulas, constant across the run.
    pub today: NaiveDate,
}

/// Result of one rule: truth per row plus non-fatal warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub truth: Vec<Option<bool>>,
    pub warnings: Vec<DataWarning>,
}

#[derive(Debug, Deserialize)]
struct SegregationParams {
    submitter_field: String,
    approver_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApprovalSequenceParams {
    date_fields_in_order: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TitleBasedApprovalParams {
    approver_field: String,
    allowed_titles: Vec<String>,
    title_reference: String,
}

#[derive(Debug, Deserialize)]
struct ThirdPartyRiskParams {
    third_party_field: String,
    risk_level_field: String,
}

#[derive(Debug, Deserialize)]
struct EnumerationParams {
    field_name: String,
    valid_values: Vec<ParamScalar>,
}

#[derive(Debug, Deserialize)]
struct CustomFormulaParams {
    original_formula: String,
}

/// A scalar parameter value as YAML allows it to be spelled.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ParamScalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ParamScalar {
    fn to_value(&self) -> Value {
        match self {
            ParamScalar::Bool(b) => Value::Bool(*b),
            ParamScalar::Number(n) => Value::Number(*n),
            ParamScalar::Text(s) => Value::Text(s.clone()),
        }
    }
}

fn parse_params<T: DeserializeOwned>(descriptor: &RuleDescriptor) -> Result<T, RuleError> {
    let mapping: serde_yaml::Mapping = descriptor
        .parameters
        .iter()
        .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.clone()))
        .collect();
    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).map_err(|e| {
        RuleError::Parameters {
            rule: descriptor.rule.clone(),
            message: e.to_string(),
        }
    })
}

/// Column names a built-in rule reads, for configuration validation.
pub fn referenced_columns(descriptor: &RuleDescriptor) -> Result<Vec<String>, RuleError> {
    match RuleKind::from_name(&descriptor.rule) {
        Some(RuleKind::SegregationOfDuties) => {
            let p: SegregationParams = parse_params(descriptor)?;
            let mut columns = vec![p.submitter_field];
            columns.extend(p.approver_fields);
            Ok(columns)
        }
        Some(RuleKind::ApprovalSequence) => {
            let p: ApprovalSequenceParams = parse_params(descriptor)?;
            Ok(p.date_fields_in_order)
        }
        Some(RuleKind::TitleBasedApproval) => {
            let p: TitleBasedApprovalParams = parse_params(descriptor)?;
            Ok(vec![p.approver_field])
        }
        Some(RuleKind::ThirdPartyRisk) => {
            let p: ThirdPartyRiskParams = parse_params(descriptor)?;
            Ok(vec![p.third_party_field, p.risk_level_field])
        }
        Some(RuleKind::Enumeration) => {
            let p: EnumerationParams = parse_params(descriptor)?;
            Ok(vec![p.field_name])
        }
        Some(RuleKind::CustomFormula) => {
            let p: CustomFormulaParams = parse_params(descriptor)?;
            Ok(attest_engine::fields::extract_fields(&p.original_formula)
                .into_iter()
                .collect())
        }
        None => Err(RuleError::Parameters {
            rule: descriptor.rule.clone(),
            message: "unknown rule".to_string(),
        }),
    }
}

/// Evaluate one rule descriptor against the dataset.
pub fn evaluate_rule(
    ctx: &RuleContext<'_>,
    descriptor: &RuleDescriptor,
) -> Result<RuleOutcome, RuleError> {
    match RuleKind::from_name(&descriptor.rule) {
        Some(RuleKind::SegregationOfDuties) => segregation_of_duties(ctx, descriptor),
        Some(RuleKind::ApprovalSequence) => approval_sequence(ctx, descriptor),
        Some(RuleKind::TitleBasedApproval) => title_based_approval(ctx, descriptor),
        Some(RuleKind::ThirdPartyRisk) => third_party_risk(ctx, descriptor),
        Some(RuleKind::Enumeration) => enumeration(ctx, descriptor),
        Some(RuleKind::CustomFormula) => custom_formula(ctx, descriptor),
        None => Err(RuleError::Parameters {
            rule: descriptor.rule.clone(),
            message: "unknown rule".to_string(),
        }),
    }
}

/// Fetch a column, warning and substituting all-missing when absent.
fn column_or_missing<'d>(
    dataset: &'d Dataset,
    name: &str,
    warnings: &mut Vec<DataWarning>,
) -> Cow<'d, [Value]> {
    match dataset.column(name) {
        Some(column) => Cow::Borrowed(column.values()),
        None => {
            let warning = DataWarning::MissingColumn {
                column: name.to_string(),
            };
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
            Cow::Owned(vec![Value::Blank; dataset.row_count()])
        }
    }
}

/// Submitter must differ from every approver. Comparison is case-sensitive
/// string equality after trimming; a missing submitter or approver is a
/// violation.
fn segregation_of_duties(
    ctx: &RuleContext<'_>,
    descriptor: &RuleDescriptor,
) -> Result<RuleOutcome, RuleError> {
    let params: SegregationParams = parse_params(descriptor)?;
    if params.approver_fields.is_empty() {
        return Err(RuleError::Parameters {
            rule: descriptor.rule.clone(),
            message: "approver_fields must not be empty".to_string(),
        });
    }

    let mut warnings = Vec::new();
    let submitter = column_or_missing(ctx.dataset, &params.submitter_field, &mut warnings);
    let approvers: Vec<_> = params
        .approver_fields
        .iter()
        .map(|field| column_or_missing(ctx.dataset, field, &mut warnings))
        .collect();

    let truth = (0..ctx.dataset.row_count())
        .map(|row| {
            let submitter = &submitter[row];
            if submitter.is_blank() {
                return Some(false);
            }
            let submitter = submitter.to_string();
            let submitter = submitter.trim();
            let ok = approvers.iter().all(|column| {
                let approver = &column[row];
                !approver.is_blank() && approver.to_string().trim() != submitter
            });
            Some(ok)
        })
        .collect();

    Ok(RuleOutcome { truth, warnings })
}

/// Date fields must be non-strictly increasing; any missing date violates.
fn approval_sequence(
    ctx: &RuleContext<'_>,
    descriptor: &RuleDescriptor,
) -> Result<RuleOutcome, RuleError> {
    let params: ApprovalSequenceParams = parse_params(descriptor)?;
    if params.date_fields_in_order.len() < 2 {
        return Err(RuleError::Parameters {
            rule: descriptor.rule.clone(),
            message: "date_fields_in_order needs at least two fields".to_string(),
        });
    }

    let mut warnings = Vec::new();
    let columns: Vec<_> = params
        .date_fields_in_order
        .iter()
        .map(|field| column_or_missing(ctx.dataset, field, &mut warnings))
        .collect();

    let truth = (0..ctx.dataset.row_count())
        .map(|row| {
            let mut previous: Option<NaiveDate> = None;
            for column in &columns {
                let Some(date) = column[row].as_date() else {
                    return Some(false);
                };
                if previous.is_some_and(|p| p > date) {
                    return Some(false);
                }
                previous = Some(date);
            }
            Some(true)
        })
        .collect();

    Ok(RuleOutcome { truth, warnings })
}

/// The approver's title, looked up in a reference table, must be one of the
/// allowed titles. A missing approver or reference entry violates.
fn title_based_approval(
    ctx: &RuleContext<'_>,
    descriptor: &RuleDescriptor,
) -> Result<RuleOutcome, RuleError> {
    let params: TitleBasedApprovalParams = parse_params(descriptor)?;
    let titles =
        ctx.reference_data
            .get(&params.title_reference)
            .ok_or_else(|| RuleError::MissingReference {
                table: params.title_reference.clone(),
            })?;

    let mut warnings = Vec::new();
    let approver = column_or_missing(ctx.dataset, &params.approver_field, &mut warnings);

    let truth = approver
        .iter()
        .map(|value| {
            if value.is_blank() {
                return Some(false);
            }
            let name = value.to_string();
            let ok = titles
                .get(name.trim())
                .is_some_and(|title| params.allowed_titles.iter().any(|t| t == title));
            Some(ok)
        })
        .collect();

    Ok(RuleOutcome { truth, warnings })
}

/// Conforms when no third party is recorded, or when a third party is
/// recorded and the risk level is present and not `"N/A"`.
fn third_party_risk(
    ctx: &RuleContext<'_>,
    descriptor: &RuleDescriptor,
) -> Result<RuleOutcome, RuleError> {
    let params: ThirdPartyRiskParams = parse_params(descriptor)?;

    let mut warnings = Vec::new();
    let third_party = column_or_missing(ctx.dataset, &params.third_party_field, &mut warnings);
    let risk = column_or_missing(ctx.dataset, &params.risk_level_field, &mut warnings);

    let truth = third_party
        .iter()
        .zip(risk.iter())
        .map(|(tp, risk)| {
            if tp.is_blank() {
                return Some(true);
            }
            Some(!risk.is_blank() && risk.to_string() != "N/A")
        })
        .collect();

    Ok(RuleOutcome { truth, warnings })
}

/// Field value must be one of the configured values, under the same equality
/// the `=` operator uses.
fn enumeration(
    ctx: &RuleContext<'_>,
    descriptor: &RuleDescriptor,
) -> Result<RuleOutcome, RuleError> {
    let params: EnumerationParams = parse_params(descriptor)?;
    let valid: Vec<Value> = params.valid_values.iter().map(ParamScalar::to_value).collect();

    let mut warnings = Vec::new();
    let column = column_or_missing(ctx.dataset, &params.field_name, &mut warnings);

    let truth = column
        .iter()
        .map(|value| {
            let ok = valid.iter().any(|candidate| {
                compare_values(value, candidate) == Some(std::cmp::Ordering::Equal)
            });
            Some(ok)
        })
        .collect();

    Ok(RuleOutcome { truth, warnings })
}

/// Parse and evaluate a user-supplied formula through the engine.
fn custom_formula(
    ctx: &RuleContext<'_>,
    descriptor: &RuleDescriptor,
) -> Result<RuleOutcome, RuleError> {
    let params: CustomFormulaParams = parse_params(descriptor)?;

    let ast = parse_formula(&params.original_formula).map_err(|source| RuleError::Formula {
        formula: params.original_formula.clone(),
        source,
    })?;

    let output = Evaluator::new(ctx.dataset)
        .with_today(ctx.today)
        .evaluate_predicate(&ast)
        .map_err(|source| RuleError::Formula {
            formula: params.original_formula.clone(),
            source: source.into(),
        })?;

    Ok(RuleOutcome {
        truth: output.truth,
        warnings: output.warnings,
    })
}
