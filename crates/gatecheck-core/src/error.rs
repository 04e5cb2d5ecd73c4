//! Unified Error Model
//!
//! Evaluation failures are never errors: they are `EvaluationOutcome::Fail`
//! values. This enum covers the infrastructure around evaluation (loading
//! rule sets, building the registry, configuration, telemetry).
use crate::lookup::LookupError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatecheckError {
    #[error("CONFIG/{0}")]
    Config(String),

    #[error("RULESET/{0}")]
    RuleSet(String),

    #[error("REGISTRY/{0}")]
    Registry(String),

    #[error("LOOKUP/{0}")]
    Lookup(#[from] LookupError),

    #[error("IO/{0}")]
    Io(#[from] std::io::Error),

    #[error("YAML/{0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TELEMETRY/{0}")]
    Telemetry(String),
}

impl GatecheckError {
    /// Rule-set error scoped to one criterion and rule.
    pub fn rule(criterion: &str, rule_id: &str, message: impl std::fmt::Display) -> Self {
        GatecheckError::RuleSet(format!("{criterion}/{rule_id}: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_prefixes() {
        let err = GatecheckError::Config("tolerance must be finite".to_string());
        assert_eq!(err.to_string(), "CONFIG/tolerance must be finite");

        let err = GatecheckError::rule("OrderValidationCriterion", "email_format", "bad regex");
        assert_eq!(
            err.to_string(),
            "RULESET/OrderValidationCriterion/email_format: bad regex"
        );
    }

    #[test]
    fn test_lookup_error_conversion() {
        let err: GatecheckError = LookupError::Unavailable("connection refused".to_string()).into();
        assert!(err.to_string().starts_with("LOOKUP/"));
    }
}
