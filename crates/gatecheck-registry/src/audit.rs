//! Audit trail
//!
//! Records every handled request for compliance and debugging. Payloads are
//! never stored; each entry keeps a BLAKE3 digest so a decision can be tied
//! back to the exact entity that was evaluated.

use chrono::{DateTime, Utc};
use gatecheck_core::{CalculationRequest, EvaluationResponse, FailureCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One evaluated request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID
    pub id: String,

    pub timestamp: DateTime<Utc>,

    pub request_id: String,

    pub criterion: String,

    pub entity_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Entity state at evaluation time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    pub matches: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<FailureCategory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default)]
    pub warnings: usize,

    /// BLAKE3 hex digest of the canonical JSON payload; `None` without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_digest: Option<String>,
}

impl AuditEntry {
    pub fn record(request: &CalculationRequest, response: &EvaluationResponse) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            request_id: request.request_id.clone(),
            criterion: response.criterion.clone(),
            entity_type: request.entity_type.clone(),
            entity_id: response.entity_id.clone(),
            state: request.metadata.state.clone(),
            matches: response.matches,
            category: response.category,
            reason: response.reason.clone(),
            warnings: response.warnings.len(),
            payload_digest: request.payload.as_ref().map(payload_digest),
        }
    }
}

/// BLAKE3 digest of a JSON payload
pub fn payload_digest(payload: &serde_json::Value) -> String {
    // serde_json's default map is ordered, so equal payloads serialize identically
    let canonical = payload.to_string();
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// In-memory audit log, bounded to the most recent entries
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    max_entries: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(10_000)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max.max(1),
        }
    }

    pub fn log(&mut self, entry: AuditEntry) {
        self.entries.push(entry);

        if self.entries.len() > self.max_entries {
            let drain_count = self.entries.len() - self.max_entries;
            self.entries.drain(0..drain_count);
        }
    }

    /// Record a handled request; returns the entry ID
    pub fn record(
        &mut self,
        request: &CalculationRequest,
        response: &EvaluationResponse,
    ) -> String {
        let entry = AuditEntry::record(request, response);
        let id = entry.id.clone();
        self.log(entry);
        id
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn entries_for_criterion(&self, criterion: &str) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.criterion.eq_ignore_ascii_case(criterion))
            .collect()
    }

    pub fn entries_since(&self, since: DateTime<Utc>) -> Vec<&AuditEntry> {
        self.entries.iter().filter(|e| e.timestamp >= since).collect()
    }

    pub fn failures(&self) -> Vec<&AuditEntry> {
        self.entries.iter().filter(|e| !e.matches).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Export to JSON Lines
    pub fn to_jsonl(&self) -> String {
        self.entries
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn stats(&self) -> AuditStats {
        let total = self.entries.len();
        let passed = self.entries.iter().filter(|e| e.matches).count();

        let mut by_category = BTreeMap::new();
        for category in self.entries.iter().filter_map(|e| e.category) {
            *by_category.entry(category).or_insert(0) += 1;
        }

        AuditStats {
            total,
            passed,
            failed: total - passed,
            pass_rate: if total > 0 { passed as f64 / total as f64 } else { 0.0 },
            by_category,
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub by_category: BTreeMap<FailureCategory, usize>,
}
