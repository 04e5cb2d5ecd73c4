//! Gatecheck Rules: composable checks and data-driven rule sets
//!
//! Criteria are built from a small set of reusable checks rather than
//! hand-written per entity type.
//!
//! # Architecture
//!
//! ```text
//! YAML rule-set file ──→ RuleSetFile::compile_yaml ──→ RuleSet (impl Criterion)
//!                                                        │
//!                          Rule { id, reason, category, severity, Check }
//!                                                        │
//!                  required / matches / in_range / sum_equals / compare / related / …
//! ```
//!
//! # Example
//!
//! ```
//! use gatecheck_core::{Criterion, EvaluationContext, FailureCategory, Metadata};
//! use gatecheck_rules::{check, Rule, RuleSet};
//! use gatecheck_rules::check::CompareOp;
//! use serde_json::json;
//!
//! let criterion = RuleSet::new("GlBatchBalancedCriterion", "gl_batch", "post")
//!     .with_rule(
//!         Rule::new("balanced", check::compare("totalDebits", CompareOp::Eq, "totalCredits"))
//!             .with_reason("batch is not balanced"),
//!     );
//!
//! let batch = json!({ "totalDebits": 100.00, "totalCredits": 99.99 });
//! let outcome = criterion.evaluate(Some(&batch), &Metadata::new(), &EvaluationContext::new());
//! assert_eq!(outcome.category(), Some(FailureCategory::BusinessRuleFailure));
//! ```

pub mod check;
pub mod definition;
pub mod field;
pub mod patterns;
pub mod rule;
pub mod rule_set;

pub use check::{Bound, Breach, Check, CompareOp, PredicateFn};
pub use definition::{CheckDef, CriterionDef, RuleDef, RuleSetFile};
pub use patterns::{NamedPattern, Pattern};
pub use rule::{Rule, RuleSeverity};
pub use rule_set::{RuleSet, STATE_PRECONDITION_RULE};
