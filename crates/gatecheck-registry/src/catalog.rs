//! Built-in criteria catalog
//!
//! Rule-set files embedded at compile time and compiled once on first use.

use gatecheck_core::GatecheckError;
use gatecheck_rules::{RuleSet, RuleSetFile};
use once_cell::sync::Lazy;

/// Embedded rule-set sources, by file name
pub const SOURCES: &[(&str, &str)] = &[
    ("carts.yaml", include_str!("../rulesets/carts.yaml")),
    ("deliveries.yaml", include_str!("../rulesets/deliveries.yaml")),
    ("delivery_services.yaml", include_str!("../rulesets/delivery_services.yaml")),
    ("ledger.yaml", include_str!("../rulesets/ledger.yaml")),
    ("loans.yaml", include_str!("../rulesets/loans.yaml")),
    ("orders.yaml", include_str!("../rulesets/orders.yaml")),
    ("pets.yaml", include_str!("../rulesets/pets.yaml")),
    ("reports.yaml", include_str!("../rulesets/reports.yaml")),
    ("trades.yaml", include_str!("../rulesets/trades.yaml")),
    ("users.yaml", include_str!("../rulesets/users.yaml")),
];

static CATALOG: Lazy<Result<Vec<RuleSet>, String>> = Lazy::new(|| {
    let mut all = Vec::new();
    for (file, source) in SOURCES {
        let rule_sets = RuleSetFile::compile_yaml(source).map_err(|e| format!("{file}: {e}"))?;
        all.extend(rule_sets);
    }
    tracing::debug!(criteria = all.len(), "compiled built-in catalog");
    Ok(all)
});

/// The built-in rule sets, compiled on first call
pub fn rule_sets() -> Result<Vec<RuleSet>, GatecheckError> {
    match &*CATALOG {
        Ok(sets) => Ok(sets.clone()),
        Err(e) => Err(GatecheckError::RuleSet(format!("built-in catalog: {e}"))),
    }
}
