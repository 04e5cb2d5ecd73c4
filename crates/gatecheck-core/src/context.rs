//! Evaluation Context: per-evaluation settings shared by every rule
use crate::config::EngineConfig;
use crate::lookup::EntityService;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_MONETARY_TOLERANCE: f64 = 0.01;

#[derive(Clone)]
pub struct EvaluationContext {
    pub trace_id: String,
    /// Amounts match when they differ by strictly less than this value
    pub monetary_tolerance: f64,
    entity_service: Option<Arc<dyn EntityService>>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            monetary_tolerance: DEFAULT_MONETARY_TOLERANCE,
            entity_service: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_tolerance(config.monetary_tolerance)
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.monetary_tolerance = tolerance;
        self
    }

    pub fn with_entity_service(mut self, service: Arc<dyn EntityService>) -> Self {
        self.entity_service = Some(service);
        self
    }

    pub fn entity_service(&self) -> Option<&dyn EntityService> {
        self.entity_service.as_deref()
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("trace_id", &self.trace_id)
            .field("monetary_tolerance", &self.monetary_tolerance)
            .field("entity_service", &self.entity_service.is_some())
            .finish()
    }
}

/// Compare two amounts under a tolerance.
///
/// Amounts within float noise always match, whatever the tolerance. Beyond
/// that the difference must be strictly below the tolerance, so a difference
/// of exactly one tolerance unit is a mismatch and a zero tolerance is exact.
pub fn amounts_match(left: f64, right: f64, tolerance: f64) -> bool {
    const NOISE: f64 = 1e-9;
    let diff = (left - right).abs();
    diff <= NOISE || diff < tolerance - NOISE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts_match_is_symmetric() {
        assert!(amounts_match(100.00, 100.00, 0.01));
        assert!(amounts_match(100.004, 100.0, 0.01));
        assert!(amounts_match(100.0, 100.004, 0.01));
        assert!(!amounts_match(100.00, 99.99, 0.01));
        assert!(!amounts_match(99.99, 100.00, 0.01));
    }

    #[test]
    fn test_zero_tolerance_is_exact() {
        assert!(amounts_match(0.1 + 0.2, 0.3, 0.0));
        assert!(!amounts_match(1.0, 1.001, 0.0));
    }

    #[test]
    fn test_tiny_tolerance_still_matches_equal_amounts() {
        for tolerance in [1e-10, 1e-9, 2e-9] {
            assert!(amounts_match(100.0, 100.0, tolerance), "tolerance {tolerance}");
            assert!(!amounts_match(100.0, 100.01, tolerance), "tolerance {tolerance}");
        }
    }

    #[test]
    fn test_tiny_configured_tolerance() {
        let config = EngineConfig::from_yaml("monetary_tolerance: 0.0000000001").unwrap();
        let ctx = EvaluationContext::from_config(&config);
        assert!(amounts_match(100.0, 100.0, ctx.monetary_tolerance));
    }

    #[test]
    fn test_context_defaults() {
        let ctx = EvaluationContext::new();
        assert_eq!(ctx.monetary_tolerance, DEFAULT_MONETARY_TOLERANCE);
        assert!(ctx.entity_service().is_none());
        assert!(!ctx.trace_id.is_empty());
        assert!(format!("{:?}", ctx).contains("entity_service: false"));
    }
}
