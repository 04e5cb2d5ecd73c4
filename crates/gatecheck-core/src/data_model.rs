//! Data Model: Metadata, CalculationRequest, EvaluationResponse, EntityRecord
use crate::outcome::{CriterionReport, EvaluationOutcome, FailureCategory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Engine-maintained side data for an entity instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Entity id as known to the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Current workflow state name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata carrying only a workflow state
    pub fn in_state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Whether the current state is one of `states` (case-insensitive)
    pub fn state_is_one_of<S: AsRef<str>>(&self, states: &[S]) -> bool {
        match &self.state {
            Some(current) => states
                .iter()
                .any(|s| s.as_ref().eq_ignore_ascii_case(current.trim())),
            None => false,
        }
    }
}

/// Inbound request from the workflow engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Entity type reference (ex: "order")
    pub entity_type: String,
    /// Operation name used for dispatch: a criterion name or transition name
    pub criterion: String,
    /// Transition being attempted, when the engine sends it separately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    /// Entity payload; absent or null payloads are evaluated, not rejected
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CalculationRequest {
    pub fn new(
        request_id: impl Into<String>,
        entity_type: impl Into<String>,
        criterion: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            entity_id: None,
            entity_type: entity_type.into(),
            criterion: criterion.into(),
            transition: None,
            payload: None,
            metadata: Metadata::default(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.entity_id = self.entity_id.or_else(|| metadata.id.clone());
        self.metadata = metadata;
        self
    }

    pub fn with_transition(mut self, transition: impl Into<String>) -> Self {
        self.transition = Some(transition.into());
        self
    }

    /// The name used to resolve the criterion: the transition when present,
    /// otherwise the operation name
    pub fn operation(&self) -> &str {
        self.transition.as_deref().unwrap_or(&self.criterion)
    }
}

/// Outbound response to the workflow engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub criterion: String,
    pub matches: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FailureCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EvaluationResponse {
    /// Build a response for `request` from a criterion report
    pub fn from_report(
        request: &CalculationRequest,
        criterion: impl Into<String>,
        report: CriterionReport,
    ) -> Self {
        let (matches, reason, category) = match report.outcome {
            EvaluationOutcome::Success => (true, None, None),
            EvaluationOutcome::Fail { reason, category } => (false, Some(reason), Some(category)),
        };
        Self {
            request_id: request.request_id.clone(),
            entity_id: request.entity_id.clone(),
            criterion: criterion.into(),
            matches,
            reason,
            category,
            warnings: report.warnings,
        }
    }

    /// Build a failed response that never reached a criterion
    pub fn rejected(
        request: &CalculationRequest,
        reason: impl Into<String>,
        category: FailureCategory,
    ) -> Self {
        Self {
            request_id: request.request_id.clone(),
            entity_id: request.entity_id.clone(),
            criterion: request.criterion.clone(),
            matches: false,
            reason: Some(reason.into()),
            category: Some(category),
            warnings: Vec::new(),
        }
    }

    /// Rebuild the outcome carried by this response
    pub fn outcome(&self) -> EvaluationOutcome {
        match (self.matches, self.category) {
            (true, _) => EvaluationOutcome::Success,
            (false, category) => EvaluationOutcome::fail(
                self.reason.clone().unwrap_or_default(),
                category.unwrap_or(FailureCategory::ValidationFailure),
            ),
        }
    }
}

/// An entity as returned by the entity service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub id: String,
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub payload: Value,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            state: None,
            payload,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}
