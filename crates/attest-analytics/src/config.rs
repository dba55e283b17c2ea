//! Configuration validation.
//!
//! [`validate_config`] enforces the structural invariants a document must
//! satisfy before any evaluation starts: required fields present, every rule
//! known with a well-formed parameter signature, and every column a rule
//! references declared by the data source. Custom formulas are checked with
//! the pre-parse field extractor, so a malformed formula body is not a
//! configuration error; it fails its own rule at evaluation time.

use std::collections::BTreeSet;

use tracing::info;

use attest_model::config::AnalyticConfig;

use crate::error::ConfigError;
use crate::rules::{self, RuleKind};

/// Outcome of structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    /// Columns the data loader must supply, from the declared source block.
    pub required_columns: BTreeSet<String>,
}

pub fn validate_config(config: &AnalyticConfig) -> Result<ValidatedConfig, ConfigError> {
    if config.data_source.is_none() && config.source.is_none() {
        return Err(ConfigError::MissingField {
            path: "data_source".to_string(),
        });
    }

    if config.validations.is_empty() {
        return Err(ConfigError::Invalid {
            path: "validations".to_string(),
            message: "must contain at least one rule".to_string(),
        });
    }

    if !(0.0..=100.0).contains(&config.thresholds.error_percentage) {
        return Err(ConfigError::Invalid {
            path: "thresholds.error_percentage".to_string(),
            message: format!(
                "must be between 0 and 100, got {}",
                config.thresholds.error_percentage
            ),
        });
    }

    if config.reporting.group_by.is_empty() {
        return Err(ConfigError::MissingField {
            path: "reporting.group_by".to_string(),
        });
    }

    let declared: BTreeSet<String> = config.declared_columns().into_iter().collect();

    for (i, descriptor) in config.validations.iter().enumerate() {
        let path = format!("validations[{i}]");

        if RuleKind::from_name(&descriptor.rule).is_none() {
            return Err(ConfigError::UnknownRule {
                rule: descriptor.rule.clone(),
                path: format!("{path}.rule"),
            });
        }

        let referenced =
            rules::referenced_columns(descriptor).map_err(|e| ConfigError::Invalid {
                path: format!("{path}.parameters"),
                message: e.to_string(),
            })?;

        for column in referenced {
            if !declared.contains(&column) {
                return Err(ConfigError::UndeclaredColumn {
                    path: format!("{path}.parameters"),
                    column,
                });
            }
        }
    }

    info!(
        analytic_id = %config.analytic_id,
        validations = config.validations.len(),
        columns = declared.len(),
        "configuration validated"
    );

    Ok(ValidatedConfig {
        required_columns: declared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_doc() -> String {
        r#"
analytic_id: 77
analytic_name: Workpaper Approvals
data_source:
  name: approvals
  required_fields: [Submitter, Approver, Submit Date, TL Date]
validations:
  - rule: segregation_of_duties
    description: Submitter is not the approver
    parameters:
      submitter_field: Submitter
      approver_fields: [Approver]
thresholds:
  error_percentage: 5.0
reporting:
  group_by: Approver
"#
        .to_string()
    }

    fn parse(doc: &str) -> AnalyticConfig {
        AnalyticConfig::from_yaml(doc).unwrap()
    }

    #[test]
    fn valid_document_passes() {
        let validated = validate_config(&parse(&base_doc())).unwrap();
        assert!(validated.required_columns.contains("Submit Date"));
    }

    #[test]
    fn unknown_rule_is_rejected_with_a_path() {
        let doc = base_doc().replace("segregation_of_duties", "no_such_rule");
        let err = validate_config(&parse(&doc)).unwrap_err();
        match err {
            ConfigError::UnknownRule { rule, path } => {
                assert_eq!(rule, "no_such_rule");
                assert_eq!(path, "validations[0].rule");
            }
            other => panic!("expected UnknownRule, got {other}"),
        }
    }

    #[test]
    fn malformed_parameters_are_rejected() {
        let doc = base_doc().replace("approver_fields: [Approver]", "approver_fields: 3");
        let err = validate_config(&parse(&doc)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn undeclared_rule_column_is_rejected() {
        let doc = base_doc().replace("approver_fields: [Approver]", "approver_fields: [Ghost]");
        let err = validate_config(&parse(&doc)).unwrap_err();
        match err {
            ConfigError::UndeclaredColumn { column, .. } => assert_eq!(column, "Ghost"),
            other => panic!("expected UndeclaredColumn, got {other}"),
        }
    }

    #[test]
    fn undeclared_formula_field_is_rejected_before_parsing() {
        let mut doc = base_doc();
        doc.push_str(
            r#"  - rule: custom_formula
    description: submit precedes approval
    parameters:
      original_formula: '=`Submit Date` <= `Ghost Date`'
"#,
        );
        let err = validate_config(&parse(&doc)).unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredColumn { .. }));
    }

    #[test]
    fn threshold_range_is_enforced() {
        let doc = base_doc().replace("error_percentage: 5.0", "error_percentage: 120");
        let err = validate_config(&parse(&doc)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn some_source_block_is_required() {
        let doc = base_doc().replace(
            "data_source:\n  name: approvals\n  required_fields: [Submitter, Approver, Submit Date, TL Date]\n",
            "",
        );
        let err = validate_config(&parse(&doc)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn empty_validations_are_rejected() {
        let doc = base_doc().replace(
            r#"validations:
  - rule: segregation_of_duties
    description: Submitter is not the approver
    parameters:
      submitter_field: Submitter
      approver_fields: [Approver]
"#,
            "validations: []\n",
        );
        let err = validate_config(&parse(&doc)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
