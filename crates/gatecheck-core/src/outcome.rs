//! Evaluation outcomes
//!
//! Provides the pass/fail result of a criterion together with the failure
//! category used for classification and telemetry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The result of evaluating a criterion (or a single rule)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationOutcome {
    /// All checks passed
    Success,

    /// A check failed
    Fail {
        /// Human-readable reason
        reason: String,
        /// Failure classification
        category: FailureCategory,
    },
}

impl EvaluationOutcome {
    /// Create a success outcome
    pub fn success() -> Self {
        EvaluationOutcome::Success
    }

    /// Create a failed outcome
    pub fn fail(reason: impl Into<String>, category: FailureCategory) -> Self {
        EvaluationOutcome::Fail {
            reason: reason.into(),
            category,
        }
    }

    /// Shorthand for a structural failure
    pub fn structural(reason: impl Into<String>) -> Self {
        Self::fail(reason, FailureCategory::StructuralFailure)
    }

    /// Shorthand for a business-rule failure
    pub fn business_rule(reason: impl Into<String>) -> Self {
        Self::fail(reason, FailureCategory::BusinessRuleFailure)
    }

    /// Shorthand for a data-quality failure
    pub fn data_quality(reason: impl Into<String>) -> Self {
        Self::fail(reason, FailureCategory::DataQualityFailure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EvaluationOutcome::Success)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The failure category, if this outcome failed
    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            EvaluationOutcome::Success => None,
            EvaluationOutcome::Fail { category, .. } => Some(*category),
        }
    }

    /// The failure reason, if this outcome failed
    pub fn reason(&self) -> Option<&str> {
        match self {
            EvaluationOutcome::Success => None,
            EvaluationOutcome::Fail { reason, .. } => Some(reason),
        }
    }

    /// Run `next` only when this outcome succeeded (first failure wins)
    pub fn and_then(self, next: impl FnOnce() -> EvaluationOutcome) -> EvaluationOutcome {
        match self {
            EvaluationOutcome::Success => next(),
            failed => failed,
        }
    }
}

/// Closed set of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    /// Missing or null required data
    StructuralFailure,
    /// Entity-level invariant violated
    ValidationFailure,
    /// Domain rule not met
    BusinessRuleFailure,
    /// Data present but malformed
    DataQualityFailure,
    /// Criterion or registry misconfigured
    ConfigurationFailure,
    /// Related-entity lookup failed or was inconclusive
    ExternalDependencyFailure,
}

impl FailureCategory {
    pub const ALL: [FailureCategory; 6] = [
        FailureCategory::StructuralFailure,
        FailureCategory::ValidationFailure,
        FailureCategory::BusinessRuleFailure,
        FailureCategory::DataQualityFailure,
        FailureCategory::ConfigurationFailure,
        FailureCategory::ExternalDependencyFailure,
    ];

    /// Wire name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::StructuralFailure => "STRUCTURAL_FAILURE",
            FailureCategory::ValidationFailure => "VALIDATION_FAILURE",
            FailureCategory::BusinessRuleFailure => "BUSINESS_RULE_FAILURE",
            FailureCategory::DataQualityFailure => "DATA_QUALITY_FAILURE",
            FailureCategory::ConfigurationFailure => "CONFIGURATION_FAILURE",
            FailureCategory::ExternalDependencyFailure => "EXTERNAL_DEPENDENCY_FAILURE",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EvaluationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvaluationOutcome::Success => write!(f, "SUCCESS"),
            EvaluationOutcome::Fail { reason, category } => {
                write!(f, "FAIL[{}]: {}", category, reason)
            }
        }
    }
}

/// Outcome plus non-blocking warnings collected along the way
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionReport {
    pub outcome: EvaluationOutcome,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Number of rules that were evaluated before the outcome was reached
    pub rules_checked: usize,
}

impl CriterionReport {
    pub fn new(outcome: EvaluationOutcome) -> Self {
        Self {
            outcome,
            warnings: Vec::new(),
            rules_checked: 0,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_rules_checked(mut self, count: usize) -> Self {
        self.rules_checked = count;
        self
    }
}
