//! Individual rules
//!
//! A rule wraps one [`Check`] with an identifier, the reason reported on
//! failure, and the failure category.

use crate::check::{Breach, Check};
use gatecheck_core::{EvaluationContext, EvaluationOutcome, FailureCategory, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single rule within a rule set
#[derive(Debug, Clone)]
pub struct Rule {
    /// Identifier, unique within its rule set
    pub id: String,

    /// Reason reported on failure; the check's own detail when unset
    pub reason: Option<String>,

    /// Category reported on failure; the check's default when unset
    pub category: Option<FailureCategory>,

    /// Whether a failure blocks the transition or only warns
    pub severity: RuleSeverity,

    pub check: Check,

    pub enabled: bool,
}

impl Rule {
    pub fn new(id: impl Into<String>, check: Check) -> Self {
        Self {
            id: id.into(),
            reason: None,
            category: None,
            severity: RuleSeverity::Error,
            check,
            enabled: true,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_category(mut self, category: FailureCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_severity(mut self, severity: RuleSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Downgrade failures of this rule to warnings
    pub fn warning(self) -> Self {
        self.with_severity(RuleSeverity::Warning)
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Evaluate the rule. Disabled rules always succeed.
    pub fn evaluate(
        &self,
        entity: &Value,
        metadata: &Metadata,
        ctx: &EvaluationContext,
    ) -> EvaluationOutcome {
        if !self.enabled {
            return EvaluationOutcome::success();
        }
        match self.check.run(entity, metadata, ctx) {
            Ok(()) => EvaluationOutcome::success(),
            Err(breach) => self.outcome_for(breach),
        }
    }

    /// Lookup failures keep their own category and detail; everything else
    /// reports the rule's reason and category when set
    fn outcome_for(&self, breach: Breach) -> EvaluationOutcome {
        if breach.external {
            return EvaluationOutcome::fail(breach.detail, breach.category);
        }
        let category = self.category.unwrap_or(breach.category);
        let reason = self.reason.clone().unwrap_or(breach.detail);
        EvaluationOutcome::fail(reason, category)
    }
}

/// Severity of a rule failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    /// Recorded as a warning; evaluation continues
    Warning,
    /// Blocks the transition
    #[default]
    Error,
}

impl RuleSeverity {
    pub fn is_blocking(&self) -> bool {
        matches!(self, RuleSeverity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{related, required};
    use serde_json::json;

    #[test]
    fn test_rule_pass() {
        let rule = Rule::new("name_required", required("name"));
        let ctx = EvaluationContext::new();
        let outcome = rule.evaluate(&json!({ "name": "Rex" }), &Metadata::new(), &ctx);
        assert!(outcome.is_success());
    }

    #[test]
    fn test_rule_reason_and_category_override() {
        let rule = Rule::new("guest_contact", required("guestContact"))
            .with_reason("guest contact required")
            .with_category(FailureCategory::BusinessRuleFailure);

        let outcome = rule.evaluate(&json!({}), &Metadata::new(), &EvaluationContext::new());
        assert_eq!(outcome.category(), Some(FailureCategory::BusinessRuleFailure));
        assert_eq!(outcome.reason(), Some("guest contact required"));
    }

    #[test]
    fn test_rule_uses_check_defaults() {
        let rule = Rule::new("name_required", required("name"));
        let outcome = rule.evaluate(&json!({}), &Metadata::new(), &EvaluationContext::new());
        assert_eq!(outcome.category(), Some(FailureCategory::StructuralFailure));
        assert_eq!(outcome.reason(), Some("field 'name' is required"));
    }

    #[test]
    fn test_external_failures_keep_their_category() {
        let rule = Rule::new("owner_exists", related("ownerId", "user", "id", ["ACTIVE"]))
            .with_reason("owner must be active")
            .with_category(FailureCategory::BusinessRuleFailure);

        let ctx = EvaluationContext::new();
        let outcome = rule.evaluate(&json!({ "ownerId": "u-1" }), &Metadata::new(), &ctx);
        assert_eq!(outcome.category(), Some(FailureCategory::ExternalDependencyFailure));
    }

    #[test]
    fn test_disabled_rule() {
        let rule = Rule::new("name_required", required("name")).disabled();
        let outcome = rule.evaluate(&json!({}), &Metadata::new(), &EvaluationContext::new());
        assert!(outcome.is_success());
    }

    #[test]
    fn test_severity() {
        assert!(RuleSeverity::Error.is_blocking());
        assert!(!RuleSeverity::Warning.is_blocking());
        assert_eq!(RuleSeverity::default(), RuleSeverity::Error);
        assert_eq!(Rule::new("r", required("x")).warning().severity, RuleSeverity::Warning);
    }
}
