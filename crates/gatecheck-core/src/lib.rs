//! Gatecheck Core: Criterion contract, outcomes, and data model
//!
//! Every workflow transition gate answers the same question: given an entity
//! and its workflow metadata, may the transition proceed? The answer is an
//! [`EvaluationOutcome`], either success or a failure tagged with a
//! [`FailureCategory`] and a human-readable reason.

pub mod config;
pub mod context;
pub mod criterion;
pub mod data_model;
pub mod error;
pub mod lookup;
pub mod outcome;
pub mod telemetry;

pub use config::EngineConfig;
pub use context::{amounts_match, EvaluationContext, DEFAULT_MONETARY_TOLERANCE};
pub use criterion::Criterion;
pub use data_model::{CalculationRequest, EntityRecord, EvaluationResponse, Metadata};
pub use error::GatecheckError;
pub use lookup::{EntityQuery, EntityService, InMemoryEntityService, LookupError};
pub use outcome::{CriterionReport, EvaluationOutcome, FailureCategory};
pub use telemetry::init_tracing;

/// Engine version
pub const GATECHECK_VERSION: &str = "1.0.0";
