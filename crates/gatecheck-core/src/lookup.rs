//! Entity Service: read-only search for related entities
//!
//! Relation checks query the engine's entity store through this trait. The
//! store itself lives outside this workspace; `InMemoryEntityService` is an
//! embeddable implementation for tests and local runs.
use crate::data_model::EntityRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::RwLock;
use thiserror::Error;

/// Search by entity type and one field-equality condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityQuery {
    pub entity_type: String,
    /// Dot-separated path into the payload; `id` matches the record id
    pub field: String,
    pub value: Value,
}

impl EntityQuery {
    pub fn new(entity_type: impl Into<String>, field: impl Into<String>, value: Value) -> Self {
        Self {
            entity_type: entity_type.into(),
            field: field.into(),
            value,
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("entity service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("lookup failed: {0}")]
    Failed(String),
}

/// Read-only access to the engine's entity store
pub trait EntityService: Send + Sync {
    /// Return every entity of `query.entity_type` whose field equals the value
    fn search(&self, query: &EntityQuery) -> Result<Vec<EntityRecord>, LookupError>;
}

/// Entity service backed by a vector of records
#[derive(Debug, Default)]
pub struct InMemoryEntityService {
    records: RwLock<Vec<EntityRecord>>,
}

impl InMemoryEntityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<EntityRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn insert(&self, record: EntityRecord) -> Result<(), LookupError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| LookupError::Failed("record store poisoned".to_string()))?;
        records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityService for InMemoryEntityService {
    fn search(&self, query: &EntityQuery) -> Result<Vec<EntityRecord>, LookupError> {
        if query.field.trim().is_empty() {
            return Err(LookupError::InvalidQuery("empty field name".to_string()));
        }

        let records = self
            .records
            .read()
            .map_err(|_| LookupError::Failed("record store poisoned".to_string()))?;

        Ok(records
            .iter()
            .filter(|r| r.entity_type.eq_ignore_ascii_case(&query.entity_type))
            .filter(|r| field_matches(r, &query.field, &query.value))
            .cloned()
            .collect())
    }
}

fn field_matches(record: &EntityRecord, field: &str, expected: &Value) -> bool {
    if field == "id" {
        if let Some(id) = expected.as_str() {
            if record.id == id {
                return true;
            }
        }
    }

    let mut current = &record.payload;
    for segment in field.split('.') {
        current = match current.get(segment) {
            Some(next) => next,
            None => return false,
        };
    }
    current == expected
}
