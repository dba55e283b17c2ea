//! Configuration document model.
//!
//! An analytic is described by a YAML document; this module is the serde
//! model plus the parse entry point. Structural and referential validation
//! (known rules, parameter signatures, declared columns) happens in
//! `attest-analytics`, which also owns the rule registry those checks need.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed configuration document (YAML syntax or shape).
#[derive(Debug, Error)]
#[error("malformed configuration document: {0}")]
pub struct ConfigParseError(#[from] serde_yaml::Error);

/// Analytic identifier; documents may spell it as a string or an integer and
/// it is rendered as a string everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnalyticId(String);

impl AnalyticId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalyticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnalyticId {
    fn from(value: &str) -> Self {
        AnalyticId(value.to_string())
    }
}

impl<'de> Deserialize<'de> for AnalyticId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = AnalyticId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer analytic id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AnalyticId, E> {
                Ok(AnalyticId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<AnalyticId, E> {
                Ok(AnalyticId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<AnalyticId, E> {
                Ok(AnalyticId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// One validation rule: a built-in rule name or `custom_formula`, plus its
/// parameter mapping. Parameters stay untyped here; each rule deserializes
/// them into its own signature when resolved.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleDescriptor {
    pub rule: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_yaml::Value>,
}

impl RuleDescriptor {
    pub fn parameter(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.parameters.get(name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSourceConfig {
    pub name: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

/// Legacy `source` block; `required_columns` entries are either bare strings
/// or mappings with a `name` key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LegacySourceConfig {
    pub required_columns: Vec<RequiredColumn>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequiredColumn {
    Name(String),
    Described { name: String },
}

impl RequiredColumn {
    pub fn name(&self) -> &str {
        match self {
            RequiredColumn::Name(name) => name,
            RequiredColumn::Described { name } => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Thresholds {
    /// Maximum acceptable non-conformance percentage per group, 0–100.
    pub error_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportingConfig {
    pub group_by: String,
    #[serde(default)]
    pub summary_fields: Vec<String>,
    #[serde(default)]
    pub detail_required: bool,
}

/// Reference tables keyed by name; each table maps a key (e.g. an approver
/// name) to a value (e.g. a job title).
pub type ReferenceData = BTreeMap<String, BTreeMap<String, String>>;

/// The full analytic configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyticConfig {
    pub analytic_id: AnalyticId,
    pub analytic_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytic_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LegacySourceConfig>,
    pub validations: Vec<RuleDescriptor>,
    pub thresholds: Thresholds,
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub reference_data: ReferenceData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_metadata: Option<serde_yaml::Value>,
}

impl AnalyticConfig {
    pub fn from_yaml(document: &str) -> Result<Self, ConfigParseError> {
        Ok(serde_yaml::from_str(document)?)
    }

    /// Columns the configuration declares, from whichever source block is
    /// present (both may be, in documents migrated by hand).
    pub fn declared_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        if let Some(source) = &self.data_source {
            columns.extend(source.required_fields.iter().cloned());
        }
        if let Some(legacy) = &self.source {
            for column in &legacy.required_columns {
                columns.push(column.name().to_string());
            }
        }
        columns.sort();
        columns.dedup();
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
analytic_id: 77
analytic_name: Audit Test Workpaper Approvals
data_source:
  name: audit_workpaper_approvals
  required_fields:
    - TW submitter
    - TL approver
validations:
  - rule: segregation_of_duties
    description: Submitter cannot be TL
    parameters:
      submitter_field: TW submitter
      approver_fields: [TL approver]
thresholds:
  error_percentage: 5.0
reporting:
  group_by: TL approver
"#;

    #[test]
    fn parses_sample_document() {
        let config = AnalyticConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.analytic_id.as_str(), "77");
        assert_eq!(config.validations.len(), 1);
        assert_eq!(config.reporting.group_by, "TL approver");
        assert_eq!(
            config.declared_columns(),
            vec!["TL approver".to_string(), "TW submitter".to_string()]
        );
    }

    #[test]
    fn analytic_id_accepts_string_or_integer() {
        let as_int: AnalyticId = serde_yaml::from_str("42").unwrap();
        let as_str: AnalyticId = serde_yaml::from_str("\"42\"").unwrap();
        assert_eq!(as_int, as_str);
    }

    #[test]
    fn legacy_source_block_round_trips_column_names() {
        let doc = r#"
analytic_id: legacy-1
analytic_name: Legacy
source:
  required_columns:
    - Plain Name
    - name: Described Name
validations:
  - rule: enumeration_validation
    description: status must be known
    parameters:
      field_name: Status
      valid_values: [Open, Closed]
thresholds:
  error_percentage: 2.0
reporting:
  group_by: Status
"#;
        let config = AnalyticConfig::from_yaml(doc).unwrap();
        assert_eq!(
            config.declared_columns(),
            vec!["Described Name".to_string(), "Plain Name".to_string()]
        );
    }
}
