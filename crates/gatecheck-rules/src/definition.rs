//! Rule-set files
//!
//! Criteria are declared in YAML and compiled into [`RuleSet`]s:
//!
//! ```yaml
//! version: "1"
//! criteria:
//!   - name: UserActivationCriterion
//!     entity_type: user
//!     transition: activate
//!     states: [pending_verification]
//!     rules:
//!       - id: email_format
//!         category: DATA_QUALITY_FAILURE
//!         check: { type: matches, field: email, pattern: email }
//! ```

use crate::check::{Bound, Check, CompareOp};
use crate::patterns::{NamedPattern, Pattern};
use crate::rule::{Rule, RuleSeverity};
use crate::rule_set::RuleSet;
use gatecheck_core::{FailureCategory, GatecheckError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Top-level rule-set file structure
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSetFile {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub criteria: Vec<CriterionDef>,
}

fn default_version() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CriterionDef {
    pub name: String,
    pub entity_type: String,
    pub transition: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef {
    pub id: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub category: Option<FailureCategory>,
    #[serde(default)]
    pub severity: RuleSeverity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub check: CheckDef,
}

fn default_true() -> bool {
    true
}

/// Declarative form of a [`Check`]
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckDef {
    Required {
        field: String,
    },
    Matches {
        field: String,
        pattern: String,
        #[serde(default)]
        optional: bool,
    },
    InRange {
        field: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        exclusive_min: bool,
        #[serde(default)]
        exclusive_max: bool,
        #[serde(default)]
        optional: bool,
    },
    Length {
        field: String,
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
        #[serde(default)]
        optional: bool,
    },
    OneOf {
        field: String,
        values: Vec<String>,
        #[serde(default = "default_true")]
        case_insensitive: bool,
        #[serde(default)]
        optional: bool,
    },
    Equals {
        field: String,
        value: Value,
    },
    SumEquals {
        terms: Vec<String>,
        total: String,
        #[serde(default)]
        tolerance: Option<f64>,
    },
    ProductEquals {
        factors: Vec<String>,
        total: String,
        #[serde(default)]
        tolerance: Option<f64>,
    },
    Compare {
        left: String,
        op: CompareOp,
        right: String,
        #[serde(default)]
        tolerance: Option<f64>,
        #[serde(default)]
        optional: bool,
    },
    StateIn {
        states: Vec<String>,
    },
    Related {
        field: String,
        entity_type: String,
        #[serde(default = "default_match_field")]
        match_field: String,
        #[serde(default)]
        states: Vec<String>,
        #[serde(default)]
        optional: bool,
    },
    Each {
        field: String,
        checks: Vec<CheckDef>,
    },
}

fn default_match_field() -> String {
    "id".to_string()
}

impl RuleSetFile {
    /// Load and compile every criterion in a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<RuleSet>, GatecheckError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::compile_yaml(&content).map_err(|e| match e {
            GatecheckError::RuleSet(msg) => {
                GatecheckError::RuleSet(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse and compile YAML content
    pub fn compile_yaml(yaml: &str) -> Result<Vec<RuleSet>, GatecheckError> {
        let file: RuleSetFile = serde_yaml::from_str(yaml)?;
        file.compile()
    }

    pub fn compile(self) -> Result<Vec<RuleSet>, GatecheckError> {
        self.criteria.into_iter().map(CriterionDef::compile).collect()
    }
}

impl CriterionDef {
    pub fn compile(self) -> Result<RuleSet, GatecheckError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(GatecheckError::RuleSet("criterion name must not be empty".to_string()));
        }
        if self.entity_type.trim().is_empty() || self.transition.trim().is_empty() {
            return Err(GatecheckError::RuleSet(format!(
                "{name}: entity_type and transition are required"
            )));
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        for def in self.rules {
            let id = def.id.trim().to_string();
            if id.is_empty() {
                return Err(GatecheckError::RuleSet(format!("{name}: rule id must not be empty")));
            }
            if !seen.insert(id.clone()) {
                return Err(GatecheckError::rule(&name, &id, "duplicate rule id"));
            }

            let check = def
                .check
                .compile()
                .map_err(|message| GatecheckError::rule(&name, &id, message))?;

            let mut rule = Rule::new(id, check).with_severity(def.severity);
            rule.reason = def.reason;
            rule.category = def.category;
            rule.enabled = def.enabled;
            rules.push(rule);
        }

        Ok(RuleSet {
            name,
            entity_type: self.entity_type.trim().to_string(),
            transition: self.transition.trim().to_string(),
            description: self.description,
            required_states: self.states,
            rules,
        })
    }
}

impl CheckDef {
    pub fn compile(self) -> Result<Check, String> {
        Ok(match self {
            CheckDef::Required { field } => Check::Required {
                field: non_empty("field", field)?,
            },
            CheckDef::Matches {
                field,
                pattern,
                optional,
            } => Check::Matches {
                field: non_empty("field", field)?,
                pattern: compile_pattern(&pattern)?,
                optional,
            },
            CheckDef::InRange {
                field,
                min,
                max,
                exclusive_min,
                exclusive_max,
                optional,
            } => {
                if min.is_none() && max.is_none() {
                    return Err("in_range needs at least one of min or max".to_string());
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(format!("in_range min {lo} is greater than max {hi}"));
                    }
                }
                let bound = |value: f64, exclusive: bool| Bound {
                    value,
                    inclusive: !exclusive,
                };
                Check::InRange {
                    field: non_empty("field", field)?,
                    min: min.map(|v| bound(v, exclusive_min)),
                    max: max.map(|v| bound(v, exclusive_max)),
                    optional,
                }
            }
            CheckDef::Length {
                field,
                min,
                max,
                optional,
            } => {
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(format!("length min {lo} is greater than max {hi}"));
                    }
                }
                Check::Length {
                    field: non_empty("field", field)?,
                    min,
                    max,
                    optional,
                }
            }
            CheckDef::OneOf {
                field,
                values,
                case_insensitive,
                optional,
            } => {
                if values.is_empty() {
                    return Err("one_of needs at least one value".to_string());
                }
                Check::OneOf {
                    field: non_empty("field", field)?,
                    values,
                    case_insensitive,
                    optional,
                }
            }
            CheckDef::Equals { field, value } => Check::Equals {
                field: non_empty("field", field)?,
                value,
            },
            CheckDef::SumEquals {
                terms,
                total,
                tolerance,
            } => {
                if terms.is_empty() {
                    return Err("sum_equals needs at least one term".to_string());
                }
                Check::SumEquals {
                    terms,
                    total: non_empty("total", total)?,
                    tolerance: check_tolerance(tolerance)?,
                }
            }
            CheckDef::ProductEquals {
                factors,
                total,
                tolerance,
            } => {
                if factors.len() < 2 {
                    return Err("product_equals needs at least two factors".to_string());
                }
                Check::ProductEquals {
                    factors: factors
                        .into_iter()
                        .map(|f| non_empty("factors", f))
                        .collect::<Result<_, _>>()?,
                    total: non_empty("total", total)?,
                    tolerance: check_tolerance(tolerance)?,
                }
            }
            CheckDef::Compare {
                left,
                op,
                right,
                tolerance,
                optional,
            } => Check::Compare {
                left: non_empty("left", left)?,
                op,
                right: non_empty("right", right)?,
                tolerance: check_tolerance(tolerance)?,
                optional,
            },
            CheckDef::StateIn { states } => {
                if states.is_empty() {
                    return Err("state_in needs at least one state".to_string());
                }
                Check::StateIn { states }
            }
            CheckDef::Related {
                field,
                entity_type,
                match_field,
                states,
                optional,
            } => Check::Related {
                field: non_empty("field", field)?,
                entity_type: non_empty("entity_type", entity_type)?,
                match_field: non_empty("match_field", match_field)?,
                states,
                optional,
            },
            CheckDef::Each { field, checks } => Check::Each {
                field: non_empty("field", field)?,
                checks: checks
                    .into_iter()
                    .map(CheckDef::compile)
                    .collect::<Result<Vec<_>, _>>()?,
            },
        })
    }
}

fn non_empty(what: &str, value: String) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{what} must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn check_tolerance(tolerance: Option<f64>) -> Result<Option<f64>, String> {
    match tolerance {
        Some(t) if !t.is_finite() || t < 0.0 => Err(format!("tolerance {t} must be non-negative")),
        other => Ok(other),
    }
}

fn compile_pattern(source: &str) -> Result<Pattern, String> {
    if source.trim().is_empty() {
        return Err("pattern must not be empty".to_string());
    }
    if let Some(named) = NamedPattern::from_name(source) {
        return Ok(Pattern::named(named));
    }
    // a bare lowercase word can only be meant as a pattern name
    if source.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return Err(format!("unknown named pattern '{source}'"));
    }
    Pattern::custom(source).map_err(|e| format!("invalid pattern '{source}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatecheck_core::{Criterion, EvaluationContext, Metadata};
    use serde_json::json;

    const USERS: &str = r#"
version: "1"
criteria:
  - name: UserActivationCriterion
    entity_type: user
    transition: activate
    states: [pending_verification]
    rules:
      - id: email_required
        check: { type: required, field: email }
      - id: email_format
        reason: email address is malformed
        check: { type: matches, field: email, pattern: email }
      - id: age
        category: VALIDATION_FAILURE
        check:
          type: in_range
          field: age
          min: 18
          max: 130
          exclusive_max: true
          optional: true
      - id: role
        severity: warning
        check: { type: one_of, field: role, values: [customer, staff] }
"#;

    #[test]
    fn test_compile_yaml() {
        let sets = RuleSetFile::compile_yaml(USERS).unwrap();
        assert_eq!(sets.len(), 1);

        let users = &sets[0];
        assert_eq!(users.name, "UserActivationCriterion");
        assert_eq!(users.required_states, vec!["pending_verification".to_string()]);
        assert_eq!(users.rules.len(), 4);
        assert_eq!(users.rule("role").unwrap().severity, RuleSeverity::Warning);
        assert_eq!(users.rule("age").unwrap().category, Some(FailureCategory::ValidationFailure));
    }

    #[test]
    fn test_compiled_rules_evaluate() {
        let users = RuleSetFile::compile_yaml(USERS).unwrap().remove(0);
        let ctx = EvaluationContext::new();
        let metadata = Metadata::in_state("pending_verification");

        let admin = json!({ "email": "foo@bar.com", "role": "admin" });
        let ok = users.evaluate_detailed(Some(&admin), &metadata, &ctx);
        assert!(ok.outcome.is_success());
        assert_eq!(ok.warnings.len(), 1);

        let bad = users.evaluate(Some(&json!({ "email": "foo@bar" })), &metadata, &ctx);
        assert_eq!(bad.reason(), Some("email address is malformed"));
        assert_eq!(bad.category(), Some(FailureCategory::DataQualityFailure));

        let elder = json!({ "email": "foo@bar.com", "age": 130 });
        let too_old = users.evaluate(Some(&elder), &metadata, &ctx);
        assert_eq!(too_old.category(), Some(FailureCategory::ValidationFailure));
    }

    #[test]
    fn test_rejects_duplicate_rule_ids() {
        let yaml = r#"
criteria:
  - name: PetCriterion
    entity_type: pet
    transition: list
    rules:
      - { id: name, check: { type: required, field: name } }
      - { id: name, check: { type: required, field: nickname } }
"#;
        let err = RuleSetFile::compile_yaml(yaml).unwrap_err();
        assert_eq!(err.to_string(), "RULESET/PetCriterion/name: duplicate rule id");
    }

    const SINGLE_RULE: &str = "criteria:
  - name: C
    entity_type: e
    transition: t
    rules:
      - id: r
        check: ";

    #[test]
    fn test_rejects_bad_definitions() {
        let cases = [
            ("{ type: matches, field: code, pattern: '([' }", "invalid pattern"),
            ("{ type: matches, field: code, pattern: iban }", "unknown named pattern 'iban'"),
            ("{ type: in_range, field: age, min: 10, max: 1 }", "greater than max"),
            ("{ type: in_range, field: age }", "at least one of min or max"),
            ("{ type: one_of, field: kind, values: [] }", "at least one value"),
            ("{ type: required, field: '  ' }", "field must not be empty"),
            ("{ type: sum_equals, terms: [a], total: t, tolerance: -1 }", "non-negative"),
            ("{ type: product_equals, factors: [a], total: t }", "at least two factors"),
        ];
        for (check, expected) in cases {
            let yaml = format!("{SINGLE_RULE}{check}\n");
            let err = RuleSetFile::compile_yaml(&yaml).unwrap_err().to_string();
            assert!(err.contains(expected), "{err} should contain {expected}");
        }
    }

    #[test]
    fn test_rejects_unknown_check_type() {
        let yaml = format!("{SINGLE_RULE}{{ type: telepathy, field: x }}\n");
        let err = RuleSetFile::compile_yaml(&yaml).unwrap_err();
        assert!(err.to_string().starts_with("YAML/"));
    }

    #[test]
    fn test_nested_each_compiles() {
        let yaml = r#"
criteria:
  - name: OrderCriterion
    entity_type: order
    transition: approve
    rules:
      - id: items
        check:
          type: each
          field: items
          checks:
            - { type: required, field: sku }
            - { type: in_range, field: quantity, min: 1 }
"#;
        let order = RuleSetFile::compile_yaml(yaml).unwrap().remove(0);
        let outcome = order.evaluate(
            Some(&json!({ "items": [{ "sku": "A", "quantity": 0 }] })),
            &Metadata::new(),
            &EvaluationContext::new(),
        );
        assert_eq!(outcome.reason(), Some("items[0]: field 'quantity' is 0, expected >= 1"));
    }
}
