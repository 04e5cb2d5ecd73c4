//! Rule primitives
//!
//! Each `Check` is one reusable field-level predicate. Checks only read the
//! entity; a failed check yields a [`Breach`] describing what was wrong.

use crate::field::{self, as_datetime, as_number, as_text, is_absent, is_blank, lookup, resolve_all};
use crate::patterns::{NamedPattern, Pattern};
use gatecheck_core::{amounts_match, EntityQuery, EvaluationContext, FailureCategory, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Code-defined predicate over the entity and its metadata
pub type PredicateFn = fn(&Value, &Metadata) -> bool;

/// Comparison operator for cross-field checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
        }
    }

    fn is_ordering(&self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One end of a numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: f64) -> Self {
        Self { value, inclusive: true }
    }

    pub fn exclusive(value: f64) -> Self {
        Self { value, inclusive: false }
    }
}

/// A failed check
#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub detail: String,
    pub category: FailureCategory,
    /// Raised by an entity-service failure rather than by the entity itself
    pub external: bool,
}

impl Breach {
    fn new(detail: impl Into<String>, category: FailureCategory) -> Self {
        Self {
            detail: detail.into(),
            category,
            external: false,
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(
            format!("field '{field}' is required"),
            FailureCategory::StructuralFailure,
        )
    }

    fn malformed(detail: impl Into<String>) -> Self {
        Self::new(detail, FailureCategory::DataQualityFailure)
    }

    fn external(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            category: FailureCategory::ExternalDependencyFailure,
            external: true,
        }
    }

    fn nested(self, field: &str, index: usize) -> Self {
        Self {
            detail: format!("{field}[{index}]: {}", self.detail),
            ..self
        }
    }
}

/// A reusable predicate over an entity
#[derive(Debug, Clone)]
pub enum Check {
    /// Field must be present and non-blank
    Required { field: String },
    /// String field must match a pattern
    Matches {
        field: String,
        pattern: Pattern,
        optional: bool,
    },
    /// Numeric field must lie within bounds
    InRange {
        field: String,
        min: Option<Bound>,
        max: Option<Bound>,
        optional: bool,
    },
    /// String length or array size must lie within bounds (inclusive)
    Length {
        field: String,
        min: Option<usize>,
        max: Option<usize>,
        optional: bool,
    },
    /// Field must be one of a fixed set of values
    OneOf {
        field: String,
        values: Vec<String>,
        case_insensitive: bool,
        optional: bool,
    },
    /// Field must equal a constant
    Equals { field: String, value: Value },
    /// Sum of the terms must equal the total
    SumEquals {
        terms: Vec<String>,
        total: String,
        tolerance: Option<f64>,
    },
    /// Product of the factors must equal the total
    ProductEquals {
        factors: Vec<String>,
        total: String,
        tolerance: Option<f64>,
    },
    /// Cross-field comparison over numbers, dates, or strings
    Compare {
        left: String,
        op: CompareOp,
        right: String,
        tolerance: Option<f64>,
        optional: bool,
    },
    /// Metadata state must be one of the listed states
    StateIn { states: Vec<String> },
    /// A related entity must exist (and be in one of `states`, if any)
    Related {
        field: String,
        entity_type: String,
        match_field: String,
        states: Vec<String>,
        optional: bool,
    },
    /// Apply nested checks to every element of an array
    Each { field: String, checks: Vec<Check> },
    /// Code-defined predicate
    Predicate { name: String, predicate: PredicateFn },
}

impl Check {
    /// Short kind name, as used in rule-set files
    pub fn kind(&self) -> &'static str {
        match self {
            Check::Required { .. } => "required",
            Check::Matches { .. } => "matches",
            Check::InRange { .. } => "in_range",
            Check::Length { .. } => "length",
            Check::OneOf { .. } => "one_of",
            Check::Equals { .. } => "equals",
            Check::SumEquals { .. } => "sum_equals",
            Check::ProductEquals { .. } => "product_equals",
            Check::Compare { .. } => "compare",
            Check::StateIn { .. } => "state_in",
            Check::Related { .. } => "related",
            Check::Each { .. } => "each",
            Check::Predicate { .. } => "predicate",
        }
    }

    /// Category reported when the rule does not name one
    pub fn default_category(&self) -> FailureCategory {
        match self {
            Check::Required { .. } => FailureCategory::StructuralFailure,
            Check::Matches { .. } | Check::Length { .. } => FailureCategory::DataQualityFailure,
            Check::Predicate { .. } => FailureCategory::ValidationFailure,
            Check::InRange { .. }
            | Check::OneOf { .. }
            | Check::Equals { .. }
            | Check::SumEquals { .. }
            | Check::ProductEquals { .. }
            | Check::Compare { .. }
            | Check::StateIn { .. }
            | Check::Related { .. }
            | Check::Each { .. } => FailureCategory::BusinessRuleFailure,
        }
    }

    /// Mark the checked field as optional: absent values pass
    pub fn optional(mut self) -> Self {
        match &mut self {
            Check::Matches { optional, .. }
            | Check::InRange { optional, .. }
            | Check::Length { optional, .. }
            | Check::OneOf { optional, .. }
            | Check::Compare { optional, .. }
            | Check::Related { optional, .. } => *optional = true,
            _ => {}
        }
        self
    }

    /// Override the monetary tolerance of a sum or comparison check
    pub fn with_tolerance(mut self, value: f64) -> Self {
        match &mut self {
            Check::SumEquals { tolerance, .. }
            | Check::ProductEquals { tolerance, .. }
            | Check::Compare { tolerance, .. } => *tolerance = Some(value),
            _ => {}
        }
        self
    }

    /// Run the check against one entity
    pub fn run(
        &self,
        entity: &Value,
        metadata: &Metadata,
        ctx: &EvaluationContext,
    ) -> Result<(), Breach> {
        match self {
            Check::Required { field } => {
                if is_blank(lookup(entity, field)) {
                    Err(Breach::missing(field))
                } else {
                    Ok(())
                }
            }

            Check::Matches {
                field,
                pattern,
                optional,
            } => {
                let Some(value) = present(entity, field, *optional)? else {
                    return Ok(());
                };
                let text = value.as_str().ok_or_else(|| {
                    Breach::malformed(format!(
                        "field '{field}' must be a string, got {}",
                        field::kind(value)
                    ))
                })?;
                if pattern.is_match(text) {
                    Ok(())
                } else {
                    Err(Breach::new(
                        format!("field '{field}' is not a valid {}", pattern.label),
                        self.default_category(),
                    ))
                }
            }

            Check::InRange {
                field,
                min,
                max,
                optional,
            } => {
                let Some(value) = present(entity, field, *optional)? else {
                    return Ok(());
                };
                let number = numeric(field, value)?;
                if within(number, min.as_ref(), max.as_ref()) {
                    Ok(())
                } else {
                    Err(Breach::new(
                        format!(
                            "field '{field}' is {number}, expected {}",
                            describe_bounds(min.as_ref(), max.as_ref())
                        ),
                        self.default_category(),
                    ))
                }
            }

            Check::Length {
                field,
                min,
                max,
                optional,
            } => {
                let Some(value) = present(entity, field, *optional)? else {
                    return Ok(());
                };
                let len = match value {
                    Value::String(s) => s.chars().count(),
                    Value::Array(items) => items.len(),
                    other => {
                        return Err(Breach::malformed(format!(
                            "field '{field}' has no length ({})",
                            field::kind(other)
                        )))
                    }
                };
                let too_short = min.map(|m| len < m).unwrap_or(false);
                let too_long = max.map(|m| len > m).unwrap_or(false);
                if too_short || too_long {
                    let lo = min.map(|m| m.to_string()).unwrap_or_else(|| "0".to_string());
                    let hi = max.map(|m| m.to_string()).unwrap_or_else(|| "any".to_string());
                    Err(Breach::new(
                        format!("field '{field}' has length {len}, expected {lo}..{hi}"),
                        self.default_category(),
                    ))
                } else {
                    Ok(())
                }
            }

            Check::OneOf {
                field,
                values,
                case_insensitive,
                optional,
            } => {
                let Some(value) = present(entity, field, *optional)? else {
                    return Ok(());
                };
                let text = as_text(value).ok_or_else(|| {
                    Breach::malformed(format!(
                        "field '{field}' must be a scalar, got {}",
                        field::kind(value)
                    ))
                })?;
                let text = text.trim();
                let found = values.iter().any(|allowed| {
                    if *case_insensitive {
                        allowed.eq_ignore_ascii_case(text)
                    } else {
                        allowed == text
                    }
                });
                if found {
                    Ok(())
                } else {
                    Err(Breach::new(
                        format!(
                            "field '{field}' is '{text}', expected one of [{}]",
                            values.join(", ")
                        ),
                        self.default_category(),
                    ))
                }
            }

            Check::Equals { field, value } => {
                let actual = match lookup(entity, field) {
                    Some(actual) if !actual.is_null() => actual,
                    _ if value.is_null() => return Ok(()),
                    _ => return Err(Breach::missing(field)),
                };
                let numeric_match = match (as_number(actual), value.as_f64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                };
                if actual == value || numeric_match {
                    Ok(())
                } else {
                    Err(Breach::new(
                        format!("field '{field}' is {actual}, expected {value}"),
                        self.default_category(),
                    ))
                }
            }

            Check::SumEquals {
                terms,
                total,
                tolerance,
            } => {
                let mut sum = 0.0;
                for term in terms {
                    if field::has_wildcard(term) {
                        for value in resolve_all(entity, term) {
                            if !value.is_null() {
                                sum += numeric(term, value)?;
                            }
                        }
                    } else {
                        let value = required_value(entity, term)?;
                        sum += numeric(term, value)?;
                    }
                }
                let expected = numeric(total, required_value(entity, total)?)?;
                let tolerance = tolerance.unwrap_or(ctx.monetary_tolerance);
                if amounts_match(sum, expected, tolerance) {
                    Ok(())
                } else {
                    Err(Breach::new(
                        format!(
                            "sum of [{}] is {sum:.2}, expected '{total}' = {expected:.2}",
                            terms.join(", ")
                        ),
                        self.default_category(),
                    ))
                }
            }

            Check::ProductEquals {
                factors,
                total,
                tolerance,
            } => {
                let mut product = 1.0;
                for factor in factors {
                    product *= numeric(factor, required_value(entity, factor)?)?;
                }
                let expected = numeric(total, required_value(entity, total)?)?;
                let tolerance = tolerance.unwrap_or(ctx.monetary_tolerance);
                if amounts_match(product, expected, tolerance) {
                    Ok(())
                } else {
                    Err(Breach::new(
                        format!(
                            "product of [{}] is {product:.2}, expected '{total}' = {expected:.2}",
                            factors.join(", ")
                        ),
                        self.default_category(),
                    ))
                }
            }

            Check::Compare {
                left,
                op,
                right,
                tolerance,
                optional,
            } => {
                let l = present(entity, left, *optional)?;
                let r = present(entity, right, *optional)?;
                let (Some(l), Some(r)) = (l, r) else {
                    return Ok(());
                };
                let tolerance = tolerance.unwrap_or(ctx.monetary_tolerance);
                let holds = compare_values(l, *op, r, tolerance).ok_or_else(|| {
                    Breach::malformed(format!(
                        "fields '{left}' ({}) and '{right}' ({}) cannot be compared with {op}",
                        field::kind(l),
                        field::kind(r)
                    ))
                })?;
                if holds {
                    Ok(())
                } else {
                    Err(Breach::new(
                        format!("expected '{left}' {op} '{right}' ({l} vs {r})"),
                        self.default_category(),
                    ))
                }
            }

            Check::StateIn { states } => {
                if metadata.state_is_one_of(states) {
                    return Ok(());
                }
                let detail = match &metadata.state {
                    Some(state) => format!(
                        "entity state '{state}' is not one of [{}]",
                        states.join(", ")
                    ),
                    None => format!(
                        "entity state is missing, expected one of [{}]",
                        states.join(", ")
                    ),
                };
                Err(Breach::new(detail, self.default_category()))
            }

            Check::Related {
                field,
                entity_type,
                match_field,
                states,
                optional,
            } => {
                let Some(value) = present(entity, field, *optional)? else {
                    return Ok(());
                };
                let service = ctx.entity_service().ok_or_else(|| {
                    Breach::external(format!(
                        "no entity service available to look up {entity_type}"
                    ))
                })?;
                let query =
                    EntityQuery::new(entity_type.clone(), match_field.clone(), value.clone());
                let found = service.search(&query).map_err(|e| {
                    Breach::external(format!(
                        "lookup of {entity_type} by {match_field} = {value} failed: {e}"
                    ))
                })?;

                if found.is_empty() {
                    return Err(Breach::new(
                        format!("no {entity_type} found with {match_field} = {value}"),
                        self.default_category(),
                    ));
                }
                if states.is_empty() {
                    return Ok(());
                }
                let in_state = found.iter().any(|record| {
                    record
                        .state
                        .as_deref()
                        .map(|s| states.iter().any(|allowed| allowed.eq_ignore_ascii_case(s)))
                        .unwrap_or(false)
                });
                if in_state {
                    Ok(())
                } else {
                    let actual = found[0].state.as_deref().unwrap_or("unknown");
                    Err(Breach::new(
                        format!(
                            "{entity_type} '{}' is in state '{actual}', expected one of [{}]",
                            found[0].id,
                            states.join(", ")
                        ),
                        self.default_category(),
                    ))
                }
            }

            Check::Each { field, checks } => {
                let items = match lookup(entity, field) {
                    None | Some(Value::Null) => return Ok(()),
                    Some(Value::Array(items)) => items,
                    Some(other) => {
                        return Err(Breach::new(
                            format!("field '{field}' must be an array, got {}", field::kind(other)),
                            FailureCategory::StructuralFailure,
                        ))
                    }
                };
                for (index, item) in items.iter().enumerate() {
                    for check in checks {
                        check
                            .run(item, metadata, ctx)
                            .map_err(|breach| breach.nested(field, index))?;
                    }
                }
                Ok(())
            }

            Check::Predicate { name, predicate } => {
                if predicate(entity, metadata) {
                    Ok(())
                } else {
                    Err(Breach::new(
                        format!("predicate '{name}' is not satisfied"),
                        self.default_category(),
                    ))
                }
            }
        }
    }
}

/// `Ok(Some(v))` when present, `Ok(None)` when absent and optional, and a
/// structural breach when absent and mandatory
fn present<'a>(entity: &'a Value, path: &str, optional: bool) -> Result<Option<&'a Value>, Breach> {
    match lookup(entity, path) {
        Some(value) if !is_absent(Some(value)) => Ok(Some(value)),
        _ if optional => Ok(None),
        _ => Err(Breach::missing(path)),
    }
}

fn required_value<'a>(entity: &'a Value, path: &str) -> Result<&'a Value, Breach> {
    match lookup(entity, path) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(Breach::missing(path)),
    }
}

fn numeric(field: &str, value: &Value) -> Result<f64, Breach> {
    as_number(value).ok_or_else(|| {
        Breach::malformed(format!(
            "field '{field}' must be numeric, got {}",
            field::kind(value)
        ))
    })
}

fn within(n: f64, min: Option<&Bound>, max: Option<&Bound>) -> bool {
    let above = match min {
        Some(b) if b.inclusive => n >= b.value,
        Some(b) => n > b.value,
        None => true,
    };
    let below = match max {
        Some(b) if b.inclusive => n <= b.value,
        Some(b) => n < b.value,
        None => true,
    };
    above && below
}

fn describe_bounds(min: Option<&Bound>, max: Option<&Bound>) -> String {
    let lo = min.map(|b| format!("{} {}", if b.inclusive { ">=" } else { ">" }, b.value));
    let hi = max.map(|b| format!("{} {}", if b.inclusive { "<=" } else { "<" }, b.value));
    match (lo, hi) {
        (Some(lo), Some(hi)) => format!("{lo} and {hi}"),
        (Some(lo), None) => lo,
        (None, Some(hi)) => hi,
        (None, None) => "any value".to_string(),
    }
}

/// `None` when the pair has no common comparable kind
fn compare_values(left: &Value, op: CompareOp, right: &Value, tolerance: f64) -> Option<bool> {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        let equal = amounts_match(l, r, tolerance);
        return Some(match op {
            CompareOp::Eq => equal,
            CompareOp::Ne => !equal,
            CompareOp::Lt => l < r && !equal,
            CompareOp::Gt => l > r && !equal,
            CompareOp::Le => l <= r || equal,
            CompareOp::Ge => l >= r || equal,
        });
    }
    if let (Some(l), Some(r)) = (as_datetime(left), as_datetime(right)) {
        return Some(op.holds(l.cmp(&r)));
    }
    if op.is_ordering() {
        return None;
    }
    let equal = match (as_text(left), as_text(right)) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    };
    Some(if op == CompareOp::Eq { equal } else { !equal })
}

// =============================================================================
// Builders
// =============================================================================

pub fn required(field: impl Into<String>) -> Check {
    Check::Required { field: field.into() }
}

pub fn matches(field: impl Into<String>, pattern: NamedPattern) -> Check {
    Check::Matches {
        field: field.into(),
        pattern: Pattern::named(pattern),
        optional: false,
    }
}

pub fn matches_regex(field: impl Into<String>, source: &str) -> Result<Check, regex::Error> {
    Ok(Check::Matches {
        field: field.into(),
        pattern: Pattern::parse(source)?,
        optional: false,
    })
}

/// Inclusive numeric range
pub fn in_range(field: impl Into<String>, min: f64, max: f64) -> Check {
    Check::InRange {
        field: field.into(),
        min: Some(Bound::inclusive(min)),
        max: Some(Bound::inclusive(max)),
        optional: false,
    }
}

/// Numeric range with explicit bounds
pub fn bounded(field: impl Into<String>, min: Option<Bound>, max: Option<Bound>) -> Check {
    Check::InRange {
        field: field.into(),
        min,
        max,
        optional: false,
    }
}

pub fn length(field: impl Into<String>, min: Option<usize>, max: Option<usize>) -> Check {
    Check::Length {
        field: field.into(),
        min,
        max,
        optional: false,
    }
}

pub fn one_of<I, S>(field: impl Into<String>, values: I) -> Check
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Check::OneOf {
        field: field.into(),
        values: values.into_iter().map(Into::into).collect(),
        case_insensitive: true,
        optional: false,
    }
}

pub fn equals(field: impl Into<String>, value: Value) -> Check {
    Check::Equals {
        field: field.into(),
        value,
    }
}

pub fn sum_equals<I, S>(terms: I, total: impl Into<String>) -> Check
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Check::SumEquals {
        terms: terms.into_iter().map(Into::into).collect(),
        total: total.into(),
        tolerance: None,
    }
}

pub fn product_equals<I, S>(factors: I, total: impl Into<String>) -> Check
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Check::ProductEquals {
        factors: factors.into_iter().map(Into::into).collect(),
        total: total.into(),
        tolerance: None,
    }
}

pub fn compare(left: impl Into<String>, op: CompareOp, right: impl Into<String>) -> Check {
    Check::Compare {
        left: left.into(),
        op,
        right: right.into(),
        tolerance: None,
        optional: false,
    }
}

pub fn state_in<I, S>(states: I) -> Check
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Check::StateIn {
        states: states.into_iter().map(Into::into).collect(),
    }
}

pub fn related<I, S>(
    field: impl Into<String>,
    entity_type: impl Into<String>,
    match_field: impl Into<String>,
    states: I,
) -> Check
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Check::Related {
        field: field.into(),
        entity_type: entity_type.into(),
        match_field: match_field.into(),
        states: states.into_iter().map(Into::into).collect(),
        optional: false,
    }
}

pub fn each(field: impl Into<String>, checks: Vec<Check>) -> Check {
    Check::Each {
        field: field.into(),
        checks,
    }
}

pub fn predicate(name: impl Into<String>, predicate: PredicateFn) -> Check {
    Check::Predicate {
        name: name.into(),
        predicate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatecheck_core::{EntityRecord, InMemoryEntityService, LookupError, EntityService};
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> EvaluationContext {
        EvaluationContext::new()
    }

    fn run(check: &Check, entity: &Value) -> Result<(), Breach> {
        check.run(entity, &Metadata::new(), &ctx())
    }

    // =========================================================================
    // Required / Matches
    // =========================================================================

    #[test]
    fn test_required() {
        let check = required("guestContact.address");
        assert!(run(&check, &json!({ "guestContact": { "address": "1 Main St" } })).is_ok());

        let breach = run(&check, &json!({ "guestContact": { "address": null } })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::StructuralFailure);
        assert!(breach.detail.contains("guestContact.address"));

        assert!(run(&check, &json!({ "guestContact": { "address": "  " } })).is_err());
        assert!(run(&check, &json!({})).is_err());
    }

    #[test]
    fn test_matches_email() {
        let check = matches("email", NamedPattern::Email);
        assert!(run(&check, &json!({ "email": "foo@bar.com" })).is_ok());

        let breach = run(&check, &json!({ "email": "foo@bar" })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::DataQualityFailure);
        assert_eq!(breach.detail, "field 'email' is not a valid email");

        let breach = run(&check, &json!({ "email": 42 })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::DataQualityFailure);

        let breach = run(&check, &json!({})).unwrap_err();
        assert_eq!(breach.category, FailureCategory::StructuralFailure);
    }

    #[test]
    fn test_matches_does_not_trim() {
        let email = matches("email", NamedPattern::Email);
        assert!(run(&email, &json!({ "email": " foo@bar.com " })).is_err());

        let currency = matches("currency", NamedPattern::Currency);
        assert!(run(&currency, &json!({ "currency": "EUR" })).is_ok());
        assert!(run(&currency, &json!({ "currency": "EUR " })).is_err());
    }

    #[test]
    fn test_optional_skips_absent_values() {
        let check = matches("phone", NamedPattern::Phone).optional();
        assert!(run(&check, &json!({})).is_ok());
        assert!(run(&check, &json!({ "phone": null })).is_ok());
        assert!(run(&check, &json!({ "phone": "nope" })).is_err());
    }

    // =========================================================================
    // Ranges
    // =========================================================================

    #[test]
    fn test_inclusive_range_boundaries() {
        let check = in_range("age", 0.0, 30.0);
        assert!(run(&check, &json!({ "age": -1 })).is_err());
        assert!(run(&check, &json!({ "age": 0 })).is_ok());
        assert!(run(&check, &json!({ "age": 30 })).is_ok());
        assert!(run(&check, &json!({ "age": 31 })).is_err());
    }

    #[test]
    fn test_exclusive_range_boundaries() {
        let check = bounded(
            "principal",
            Some(Bound::exclusive(0.0)),
            Some(Bound::inclusive(1000.0)),
        );
        assert!(run(&check, &json!({ "principal": 0 })).is_err());
        assert!(run(&check, &json!({ "principal": 0.01 })).is_ok());
        assert!(run(&check, &json!({ "principal": "1000" })).is_ok());

        let breach = run(&check, &json!({ "principal": 1000.01 })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::BusinessRuleFailure);
        assert!(breach.detail.contains("> 0 and <= 1000"));
    }

    #[test]
    fn test_range_rejects_non_numeric() {
        let breach = run(&in_range("age", 0.0, 30.0), &json!({ "age": "old" })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::DataQualityFailure);
    }

    #[test]
    fn test_length() {
        let check = length("lines", Some(1), Some(2));
        assert!(run(&check, &json!({ "lines": [] })).is_err());
        assert!(run(&check, &json!({ "lines": [1] })).is_ok());
        assert!(run(&check, &json!({ "lines": [1, 2, 3] })).is_err());
        assert!(run(&length("title", None, Some(3)), &json!({ "title": "abcd" })).is_err());
    }

    // =========================================================================
    // Membership / equality
    // =========================================================================

    #[test]
    fn test_one_of() {
        let check = one_of("category", ["dog", "cat"]);
        assert!(run(&check, &json!({ "category": "Dog" })).is_ok());
        let breach = run(&check, &json!({ "category": "dragon" })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::BusinessRuleFailure);
        assert!(breach.detail.contains("dog, cat"));
    }

    #[test]
    fn test_equals() {
        let check = equals("isBalanced", json!(true));
        assert!(run(&check, &json!({ "isBalanced": true })).is_ok());
        assert!(run(&check, &json!({ "isBalanced": false })).is_err());
        assert!(run(&check, &json!({})).is_err());
        assert!(run(&equals("count", json!(5)), &json!({ "count": 5.0 })).is_ok());
    }

    // =========================================================================
    // Cross-field arithmetic
    // =========================================================================

    #[test]
    fn test_sum_equals_with_wildcards() {
        let check = sum_equals(["items.*.lineTotal", "shipping"], "total");
        let order = json!({
            "items": [{ "lineTotal": 10.25 }, { "lineTotal": "4.75" }],
            "shipping": 5,
            "total": "20.00"
        });
        assert!(run(&check, &order).is_ok());

        let mut off = order.clone();
        off["total"] = json!(20.01);
        let breach = run(&check, &off).unwrap_err();
        assert_eq!(breach.category, FailureCategory::BusinessRuleFailure);
    }

    #[test]
    fn test_product_equals_per_line() {
        let check = each(
            "items",
            vec![product_equals(["quantity", "unitPrice"], "lineTotal")],
        );
        let order = json!({
            "items": [
                { "quantity": 3, "unitPrice": 1.1, "lineTotal": 3.30 },
                { "quantity": 2, "unitPrice": "4.50", "lineTotal": 9 }
            ]
        });
        assert!(run(&check, &order).is_ok());

        let mut off = order.clone();
        off["items"][1]["lineTotal"] = json!(9.5);
        let breach = run(&check, &off).unwrap_err();
        assert_eq!(breach.category, FailureCategory::BusinessRuleFailure);
        assert!(breach.detail.contains("product of [quantity, unitPrice]"), "{}", breach.detail);
    }

    #[test]
    fn test_sum_equals_missing_total() {
        let breach = run(&sum_equals(["a"], "total"), &json!({ "a": 1 })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::StructuralFailure);
    }

    #[test]
    fn test_compare_is_order_independent() {
        let forward = compare("totalDebits", CompareOp::Eq, "totalCredits");
        let backward = compare("totalCredits", CompareOp::Eq, "totalDebits");
        let cases = [(100.0, 100.0, true), (100.0, 99.99, false), (99.99, 100.0, false)];
        for (debits, credits, expected) in cases {
            let batch = json!({ "totalDebits": debits, "totalCredits": credits });
            assert_eq!(run(&forward, &batch).is_ok(), expected);
            assert_eq!(run(&backward, &batch).is_ok(), expected);
        }
    }

    #[test]
    fn test_compare_tolerance_override() {
        let check = compare("a", CompareOp::Eq, "b").with_tolerance(1.0);
        assert!(run(&check, &json!({ "a": 10.0, "b": 10.5 })).is_ok());
    }

    #[test]
    fn test_compare_operators_agree_within_tolerance() {
        let entity = json!({ "a": 99.995, "b": 100.0 });
        for (op, expected) in [
            (CompareOp::Eq, true),
            (CompareOp::Ne, false),
            (CompareOp::Le, true),
            (CompareOp::Ge, true),
            (CompareOp::Lt, false),
            (CompareOp::Gt, false),
        ] {
            let check = compare("a", op, "b");
            assert_eq!(run(&check, &entity).is_ok(), expected, "a {op:?} b");
        }

        let exact = EvaluationContext::new().with_tolerance(0.0);
        let cases = [(CompareOp::Lt, true), (CompareOp::Gt, false), (CompareOp::Eq, false)];
        for (op, expected) in cases {
            let outcome = compare("a", op, "b").run(&entity, &Metadata::new(), &exact);
            assert_eq!(outcome.is_ok(), expected, "a {op:?} b");
        }
    }

    #[test]
    fn test_compare_dates() {
        let check = compare("maturityDate", CompareOp::Gt, "startDate");
        let loan = |maturity: &str| json!({ "startDate": "2024-01-01", "maturityDate": maturity });
        assert!(run(&check, &loan("2025-01-01")).is_ok());
        assert!(run(&check, &loan("2024-01-01")).is_err());
        let breach = run(&check, &loan("soon")).unwrap_err();
        assert_eq!(breach.category, FailureCategory::DataQualityFailure);
    }

    #[test]
    fn test_compare_counts_bounded_by_parent() {
        let check = compare("deliveredCount", CompareOp::Le, "packageCount");
        assert!(run(&check, &json!({ "deliveredCount": 3, "packageCount": 3 })).is_ok());
        assert!(run(&check, &json!({ "deliveredCount": 4, "packageCount": 3 })).is_err());
    }

    // =========================================================================
    // State / relations / nesting
    // =========================================================================

    #[test]
    fn test_state_in() {
        let check = state_in(["pending"]);
        let entity = json!({});
        assert!(check.run(&entity, &Metadata::in_state("PENDING"), &ctx()).is_ok());

        let breach = check.run(&entity, &Metadata::in_state("approved"), &ctx()).unwrap_err();
        assert_eq!(breach.category, FailureCategory::BusinessRuleFailure);
        let breach = check.run(&entity, &Metadata::new(), &ctx()).unwrap_err();
        assert!(breach.detail.contains("missing"));
    }

    struct BrokenService;

    impl EntityService for BrokenService {
        fn search(&self, _query: &EntityQuery) -> Result<Vec<EntityRecord>, LookupError> {
            Err(LookupError::Unavailable("timeout".to_string()))
        }
    }

    #[test]
    fn test_related_entity_state() {
        let service = InMemoryEntityService::with_records(vec![
            EntityRecord::new("ds-1", "delivery_service", json!({})).with_state("ACTIVE"),
            EntityRecord::new("ds-2", "delivery_service", json!({})).with_state("SUSPENDED"),
        ]);
        let ctx = ctx().with_entity_service(Arc::new(service));
        let check = related("deliveryServiceId", "delivery_service", "id", ["ACTIVE"]);
        let metadata = Metadata::new();

        assert!(check.run(&json!({ "deliveryServiceId": "ds-1" }), &metadata, &ctx).is_ok());

        let breach = check
            .run(&json!({ "deliveryServiceId": "ds-2" }), &metadata, &ctx)
            .unwrap_err();
        assert_eq!(breach.category, FailureCategory::BusinessRuleFailure);
        assert!(breach.detail.contains("SUSPENDED"));

        let breach = check
            .run(&json!({ "deliveryServiceId": "ds-9" }), &metadata, &ctx)
            .unwrap_err();
        assert!(breach.detail.starts_with("no delivery_service found"));
    }

    #[test]
    fn test_related_lookup_failure_is_caught() {
        let check = related("ownerId", "user", "id", Vec::<String>::new());
        let entity = json!({ "ownerId": "u-1" });

        let breach = run(&check, &entity).unwrap_err();
        assert!(breach.external);
        assert_eq!(breach.category, FailureCategory::ExternalDependencyFailure);

        let ctx = ctx().with_entity_service(Arc::new(BrokenService));
        let breach = check.run(&entity, &Metadata::new(), &ctx).unwrap_err();
        assert!(breach.external);
        assert!(breach.detail.contains("timeout"));
    }

    #[test]
    fn test_each_reports_element_index() {
        let check = each("items", vec![required("sku"), in_range("quantity", 1.0, 99.0)]);
        assert!(run(&check, &json!({ "items": [{ "sku": "A", "quantity": 1 }] })).is_ok());
        assert!(run(&check, &json!({})).is_ok());

        let breach = run(
            &check,
            &json!({ "items": [{ "sku": "A", "quantity": 1 }, { "sku": "B", "quantity": 0 }] }),
        )
        .unwrap_err();
        assert!(breach.detail.starts_with("items[1]: field 'quantity'"));
        assert_eq!(breach.category, FailureCategory::BusinessRuleFailure);

        let breach = run(&check, &json!({ "items": "A" })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::StructuralFailure);
    }

    fn has_two_words(entity: &Value, _metadata: &Metadata) -> bool {
        entity["name"].as_str().map(|n| n.split_whitespace().count() == 2).unwrap_or(false)
    }

    #[test]
    fn test_predicate() {
        let check = predicate("full_name", has_two_words);
        assert!(run(&check, &json!({ "name": "Ada Lovelace" })).is_ok());
        let breach = run(&check, &json!({ "name": "Ada" })).unwrap_err();
        assert_eq!(breach.category, FailureCategory::ValidationFailure);
        assert_eq!(check.kind(), "predicate");
    }
}
