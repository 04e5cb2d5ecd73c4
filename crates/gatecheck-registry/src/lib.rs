//! Gatecheck Registry: criterion lookup, request dispatch, and audit
//!
//! # Architecture
//!
//! ```text
//! CalculationRequest → Dispatcher → CriterionRegistry → Criterion → EvaluationResponse
//!                                          ↑                               ↓
//!                         built-in catalog + rule-set dirs           AuditLog (caller-owned)
//! ```
//!
//! # Example
//!
//! ```
//! use gatecheck_core::{CalculationRequest, FailureCategory};
//! use gatecheck_registry::{CriterionRegistry, Dispatcher};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::new(Arc::new(CriterionRegistry::builtin().unwrap()));
//!
//! let request = CalculationRequest::new("req-1", "gl_batch", "post").with_payload(json!({
//!     "totalDebits": 100.00,
//!     "totalCredits": 99.99,
//!     "lineItemCount": 5,
//!     "isBalanced": true
//! }));
//!
//! let response = dispatcher.handle(&request);
//! assert!(!response.matches);
//! assert_eq!(response.category, Some(FailureCategory::BusinessRuleFailure));
//! ```

pub mod audit;
pub mod catalog;
pub mod dispatcher;
pub mod registry;

pub use audit::{AuditEntry, AuditLog, AuditStats};
pub use dispatcher::Dispatcher;
pub use registry::{CriterionRegistry, RegistryEntry};
