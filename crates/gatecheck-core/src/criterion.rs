//! Criterion Trait: the single contract every transition gate implements
use crate::context::EvaluationContext;
use crate::data_model::Metadata;
use crate::outcome::{CriterionReport, EvaluationOutcome};
use serde_json::Value;

/// A named gate evaluated before a workflow transition.
///
/// Implementations are pure predicates over their inputs: they never mutate
/// the entity or metadata and never panic or error for any input, including
/// a missing entity.
pub trait Criterion: Send + Sync {
    /// Criterion name (ex: "OrderValidationCriterion")
    fn name(&self) -> &str;

    /// Entity type this criterion inspects (ex: "order")
    fn entity_type(&self) -> &str;

    /// Transition this criterion gates (ex: "approve")
    fn transition(&self) -> &str;

    /// Whether an engine operation name selects this criterion
    fn supports(&self, operation: &str) -> bool {
        let operation = operation.trim();
        operation.eq_ignore_ascii_case(self.name())
            || operation.eq_ignore_ascii_case(self.transition())
    }

    /// Evaluate and collect warnings along with the outcome
    fn evaluate_detailed(
        &self,
        entity: Option<&Value>,
        metadata: &Metadata,
        ctx: &EvaluationContext,
    ) -> CriterionReport;

    /// Evaluate the entity against this criterion
    fn evaluate(
        &self,
        entity: Option<&Value>,
        metadata: &Metadata,
        ctx: &EvaluationContext,
    ) -> EvaluationOutcome {
        self.evaluate_detailed(entity, metadata, ctx).outcome
    }
}
