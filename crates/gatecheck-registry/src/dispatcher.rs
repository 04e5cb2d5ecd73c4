//! Request dispatch
//!
//! Turns a [`CalculationRequest`] into an [`EvaluationResponse`]. The
//! dispatcher never errors and never panics: an unknown criterion or a
//! panicking predicate both come back as failed responses.

use crate::registry::CriterionRegistry;
use gatecheck_core::{
    CalculationRequest, Criterion, CriterionReport, EngineConfig, EntityService,
    EvaluationContext, EvaluationOutcome, EvaluationResponse, FailureCategory, GatecheckError,
    DEFAULT_MONETARY_TOLERANCE,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub struct Dispatcher {
    registry: Arc<CriterionRegistry>,
    monetary_tolerance: f64,
    entity_service: Option<Arc<dyn EntityService>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CriterionRegistry>) -> Self {
        Self {
            registry,
            monetary_tolerance: DEFAULT_MONETARY_TOLERANCE,
            entity_service: None,
        }
    }

    /// Build the registry from `config` and dispatch against it
    pub fn from_config(config: &EngineConfig) -> Result<Self, GatecheckError> {
        let registry = CriterionRegistry::from_config(config)?;
        Ok(Self::new(Arc::new(registry)).with_tolerance(config.monetary_tolerance))
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.monetary_tolerance = tolerance;
        self
    }

    pub fn with_entity_service(mut self, service: Arc<dyn EntityService>) -> Self {
        self.entity_service = Some(service);
        self
    }

    pub fn registry(&self) -> &CriterionRegistry {
        &self.registry
    }

    fn context_for(&self, request: &CalculationRequest) -> EvaluationContext {
        let mut ctx = EvaluationContext::new().with_tolerance(self.monetary_tolerance);
        if !request.request_id.trim().is_empty() {
            ctx = ctx.with_trace_id(request.request_id.clone());
        }
        if let Some(service) = &self.entity_service {
            ctx = ctx.with_entity_service(Arc::clone(service));
        }
        ctx
    }

    fn resolve(&self, request: &CalculationRequest) -> Option<Arc<dyn Criterion>> {
        self.registry
            .resolve(&request.entity_type, request.operation())
            .or_else(|| {
                request
                    .transition
                    .as_ref()
                    .and_then(|_| self.registry.resolve(&request.entity_type, &request.criterion))
            })
    }

    /// Evaluate one request
    pub fn handle(&self, request: &CalculationRequest) -> EvaluationResponse {
        let Some(criterion) = self.resolve(request) else {
            tracing::warn!(
                request_id = %request.request_id,
                entity_type = %request.entity_type,
                operation = %request.operation(),
                "no criterion registered"
            );
            return EvaluationResponse::rejected(
                request,
                format!(
                    "no criterion registered for {} / {}",
                    request.entity_type,
                    request.operation()
                ),
                FailureCategory::ConfigurationFailure,
            );
        };

        let ctx = self.context_for(request);
        let evaluated = catch_unwind(AssertUnwindSafe(|| {
            criterion.evaluate_detailed(request.payload.as_ref(), &request.metadata, &ctx)
        }));

        let report = evaluated.unwrap_or_else(|panic| {
            let message = panic_message(&*panic);
            tracing::error!(
                request_id = %request.request_id,
                criterion = %criterion.name(),
                panic = %message,
                "criterion panicked"
            );
            CriterionReport::new(EvaluationOutcome::fail(
                format!("criterion {} failed unexpectedly: {message}", criterion.name()),
                FailureCategory::ValidationFailure,
            ))
        });

        EvaluationResponse::from_report(request, criterion.name(), report)
    }

    /// Evaluate a batch of requests in order
    pub fn handle_all(&self, requests: &[CalculationRequest]) -> Vec<EvaluationResponse> {
        requests.iter().map(|request| self.handle(request)).collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
