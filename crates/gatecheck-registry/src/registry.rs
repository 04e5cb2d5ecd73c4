//! Criterion Registry
//!
//! A lookup table from `(entity_type, transition)` and from criterion name
//! to a registered criterion. Keys are compared case-insensitively.

use crate::catalog;
use gatecheck_core::{Criterion, EngineConfig, GatecheckError};
use gatecheck_rules::{RuleSet, RuleSetFile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Summary of one registered criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub entity_type: String,
    pub transition: String,
    /// Number of rules, when the criterion is a rule set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_count: Option<usize>,
}

#[derive(Default)]
pub struct CriterionRegistry {
    criteria: Vec<Arc<dyn Criterion>>,
    entries: Vec<RegistryEntry>,
    by_key: HashMap<(String, String), usize>,
    by_name: HashMap<String, usize>,
}

fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

impl CriterionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the built-in catalog
    pub fn builtin() -> Result<Self, GatecheckError> {
        let mut registry = Self::new();
        registry.register_all(catalog::rule_sets()?)?;
        Ok(registry)
    }

    /// Built-in catalog (when enabled) plus every configured directory
    pub fn from_config(config: &EngineConfig) -> Result<Self, GatecheckError> {
        let mut registry = Self::new();
        if config.builtin_catalog {
            registry.register_all(catalog::rule_sets()?)?;
        }
        for dir in &config.rule_set_dirs {
            registry.load_dir(dir)?;
        }
        tracing::info!(
            criteria = registry.len(),
            builtin = config.builtin_catalog,
            dirs = config.rule_set_dirs.len(),
            "criterion registry ready"
        );
        Ok(registry)
    }

    /// Register a code-defined criterion
    pub fn register(&mut self, criterion: Arc<dyn Criterion>) -> Result<(), GatecheckError> {
        let entry = RegistryEntry {
            name: criterion.name().to_string(),
            entity_type: criterion.entity_type().to_string(),
            transition: criterion.transition().to_string(),
            rule_count: None,
        };
        self.insert(criterion, entry)
    }

    pub fn register_rule_set(&mut self, rule_set: RuleSet) -> Result<(), GatecheckError> {
        let entry = RegistryEntry {
            name: rule_set.name.clone(),
            entity_type: rule_set.entity_type.clone(),
            transition: rule_set.transition.clone(),
            rule_count: Some(rule_set.rule_count()),
        };
        self.insert(Arc::new(rule_set), entry)
    }

    pub fn register_all(&mut self, rule_sets: Vec<RuleSet>) -> Result<(), GatecheckError> {
        for rule_set in rule_sets {
            self.register_rule_set(rule_set)?;
        }
        Ok(())
    }

    fn insert(
        &mut self,
        criterion: Arc<dyn Criterion>,
        entry: RegistryEntry,
    ) -> Result<(), GatecheckError> {
        let key = (normalize(&entry.entity_type), normalize(&entry.transition));
        let name = normalize(&entry.name);

        if let Some(&existing) = self.by_key.get(&key) {
            return Err(GatecheckError::Registry(format!(
                "{} and {} both gate {}/{}",
                self.entries[existing].name, entry.name, entry.entity_type, entry.transition
            )));
        }
        if self.by_name.contains_key(&name) {
            return Err(GatecheckError::Registry(format!(
                "criterion {} is already registered",
                entry.name
            )));
        }

        let index = self.criteria.len();
        self.criteria.push(criterion);
        self.entries.push(entry);
        self.by_key.insert(key, index);
        self.by_name.insert(name, index);
        Ok(())
    }

    /// Load every `*.yaml` / `*.yml` rule-set file in `dir`, in file-name
    /// order. Returns the number of criteria registered.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, GatecheckError> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_rule_set_file(path))
            .collect();
        files.sort();

        if files.is_empty() {
            tracing::warn!(dir = %dir.display(), "no rule-set files found");
        }

        let mut loaded = 0;
        for file in files {
            let rule_sets = RuleSetFile::load(&file)?;
            loaded += rule_sets.len();
            tracing::info!(
                file = %file.display(),
                criteria = rule_sets.len(),
                "loaded rule-set file"
            );
            self.register_all(rule_sets)?;
        }
        Ok(loaded)
    }

    /// Find the criterion for an entity type and operation. The operation is
    /// matched against transitions first, then against criterion names.
    pub fn resolve(&self, entity_type: &str, operation: &str) -> Option<Arc<dyn Criterion>> {
        let entity_type = normalize(entity_type);
        let operation = normalize(operation);

        let index = self
            .by_key
            .get(&(entity_type.clone(), operation.clone()))
            .or_else(|| {
                self.by_name
                    .get(&operation)
                    .filter(|&&i| normalize(&self.entries[i].entity_type) == entity_type)
            })?;
        self.criteria.get(*index).cloned()
    }

    /// Find a criterion by name alone
    pub fn get(&self, name: &str) -> Option<Arc<dyn Criterion>> {
        self.by_name
            .get(&normalize(name))
            .and_then(|&i| self.criteria.get(i).cloned())
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

fn is_rule_set_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("yaml") | Some("yml")
    )
}
