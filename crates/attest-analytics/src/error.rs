use thiserror::Error;

use attest_engine::EngineError;
use attest_model::config::ConfigParseError;

/// Structural or referential violation in a configuration document. Fatal
/// for the analytic; nothing is evaluated once one is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] ConfigParseError),
    #[error("missing required field `{path}`")]
    MissingField { path: String },
    #[error("`{path}`: {message}")]
    Invalid { path: String, message: String },
    #[error("`{path}`: unknown rule `{rule}`")]
    UnknownRule { rule: String, path: String },
    #[error("`{path}`: column `{column}` is not declared as a required column")]
    UndeclaredColumn { path: String, column: String },
}

/// Failure of a single rule. Fatal for that rule only: the aggregator treats
/// the rule's contribution as missing and the analytic continues as long as
/// another rule succeeded.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid parameters for `{rule}`: {message}")]
    Parameters { rule: String, message: String },
    #[error("formula `{formula}` failed: {source}")]
    Formula {
        formula: String,
        #[source]
        source: EngineError,
    },
    #[error("reference table `{table}` is not defined")]
    MissingReference { table: String },
}

/// Failure of the whole analytic run.
#[derive(Debug, Error)]
pub enum AnalyticError {
    #[error("analytic `{analytic_id}`: {source}")]
    Config {
        analytic_id: String,
        #[source]
        source: ConfigError,
    },
    #[error("analytic `{analytic_id}`: every validation rule failed")]
    NoUsableRules { analytic_id: String },
}
