//! Rule sets: the generic criterion harness
//!
//! ```text
//! entity ─→ null/shape check ─→ state precondition ─→ rule 1 ─→ rule 2 ─→ … ─→ Success
//!                 ↓                     ↓                 ↓         ↓
//!           STRUCTURAL_FAILURE   BUSINESS_RULE_FAILURE   first blocking failure wins
//! ```
//!
//! Warning-severity rules never stop evaluation; their failures are
//! collected into the report.

use crate::check::state_in;
use crate::rule::{Rule, RuleSeverity};
use gatecheck_core::{
    Criterion, CriterionReport, EvaluationContext, EvaluationOutcome, FailureCategory, Metadata,
};
use serde_json::Value;

pub const STATE_PRECONDITION_RULE: &str = "state_precondition";

/// An ordered list of rules gating one `(entity_type, transition)` pair
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub name: String,
    pub entity_type: String,
    pub transition: String,
    pub description: String,
    /// States the entity must be in; empty means any state
    pub required_states: Vec<String>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        transition: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            transition: transition.into(),
            description: String::new(),
            required_states: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn requires_state<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Number of rules, counting the state precondition
    pub fn rule_count(&self) -> usize {
        self.rules.len() + usize::from(!self.required_states.is_empty())
    }

    fn run(
        &self,
        entity: Option<&Value>,
        metadata: &Metadata,
        ctx: &EvaluationContext,
    ) -> (CriterionReport, Option<String>) {
        let entity = match entity {
            None | Some(Value::Null) => {
                return (
                    CriterionReport::new(EvaluationOutcome::structural(format!(
                        "{} entity is null",
                        self.entity_type
                    ))),
                    None,
                )
            }
            Some(value) if !value.is_object() => {
                return (
                    CriterionReport::new(EvaluationOutcome::structural(format!(
                        "{} entity must be an object",
                        self.entity_type
                    ))),
                    None,
                )
            }
            Some(value) => value,
        };

        let mut checked = 0;

        if !self.required_states.is_empty() {
            checked += 1;
            let states = state_in(self.required_states.iter().cloned());
            let precondition = Rule::new(STATE_PRECONDITION_RULE, states)
                .with_category(FailureCategory::BusinessRuleFailure);
            let outcome = precondition.evaluate(entity, metadata, ctx);
            if outcome.is_failure() {
                return (
                    CriterionReport::new(outcome).with_rules_checked(checked),
                    Some(STATE_PRECONDITION_RULE.to_string()),
                );
            }
        }

        let mut warnings = Vec::new();
        for rule in self.rules.iter().filter(|r| r.enabled) {
            checked += 1;
            let outcome = rule.evaluate(entity, metadata, ctx);
            let EvaluationOutcome::Fail { reason, category } = outcome else {
                continue;
            };
            match rule.severity {
                RuleSeverity::Warning => warnings.push(format!("{}: {}", rule.id, reason)),
                RuleSeverity::Error => {
                    let report = CriterionReport::new(EvaluationOutcome::fail(reason, category))
                        .with_warnings(warnings)
                        .with_rules_checked(checked);
                    return (report, Some(rule.id.clone()));
                }
            }
        }

        let report = CriterionReport::new(EvaluationOutcome::success())
            .with_warnings(warnings)
            .with_rules_checked(checked);
        (report, None)
    }
}

impl Criterion for RuleSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn transition(&self) -> &str {
        &self.transition
    }

    fn evaluate_detailed(
        &self,
        entity: Option<&Value>,
        metadata: &Metadata,
        ctx: &EvaluationContext,
    ) -> CriterionReport {
        let (report, failed_rule) = self.run(entity, metadata, ctx);

        tracing::debug!(
            trace_id = %ctx.trace_id,
            criterion = %self.name,
            entity_type = %self.entity_type,
            state = metadata.state.as_deref().unwrap_or("-"),
            rule = failed_rule.as_deref().unwrap_or("-"),
            outcome = %report.outcome,
            category = report.outcome.category().map(|c| c.as_str()).unwrap_or("-"),
            rules_checked = report.rules_checked,
            warnings = report.warnings.len(),
            "criterion evaluated"
        );

        report
    }
}
