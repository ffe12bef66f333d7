//! Budget history for item mutations
//!
//! Every create, update and delete of an item appends one [`HistoryRecord`]
//! holding the item's budget before and after the change. Records are
//! append-only and carry a monotonically increasing sequence number.

use crate::error::{Error, Result};
use armory_core::{numeric::round2, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Kind of mutation a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationAction {
    Created,
    Updated,
    Deleted,
}

impl MutationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationAction::Created => "created",
            MutationAction::Updated => "updated",
            MutationAction::Deleted => "deleted",
        }
    }
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One budget-affecting change to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Sequence number, unique within a history
    pub seq: u64,
    pub item_id: ItemId,
    pub action: MutationAction,
    /// Who made the change
    pub actor: String,
    /// Budget used before the change (`None` for a created item)
    pub budget_before: Option<f64>,
    /// Budget used after the change (`None` for a deleted item)
    pub budget_after: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Change in budget used; a missing side counts as zero
    pub fn delta(&self) -> f64 {
        round2(self.budget_after.unwrap_or(0.0) - self.budget_before.unwrap_or(0.0))
    }
}

/// Configuration for a history
#[derive(Debug, Clone, Default)]
pub struct HistoryConfig {
    /// Maximum number of records kept (None = unlimited)
    pub max_records: Option<usize>,
}

impl HistoryConfig {
    /// Keep at most `max` records, dropping the oldest first
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }
}

/// Append-only log of budget changes
#[derive(Debug, Clone)]
pub struct History {
    config: HistoryConfig,
    records: Vec<HistoryRecord>,
    next_seq: u64,
}

impl History {
    /// Create an unlimited history
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
            next_seq: 1,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Append a record stamped with the current time
    pub fn record(
        &mut self,
        item_id: ItemId,
        action: MutationAction,
        actor: impl Into<String>,
        budget_before: Option<f64>,
        budget_after: Option<f64>,
    ) -> u64 {
        self.record_at(item_id, action, actor, budget_before, budget_after, Utc::now())
    }

    /// Append a record with an explicit timestamp
    pub fn record_at(
        &mut self,
        item_id: ItemId,
        action: MutationAction,
        actor: impl Into<String>,
        budget_before: Option<f64>,
        budget_after: Option<f64>,
        recorded_at: DateTime<Utc>,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let record = HistoryRecord {
            seq,
            item_id,
            action,
            actor: actor.into(),
            budget_before,
            budget_after,
            recorded_at,
        };
        debug!(
            seq,
            item = %item_id,
            action = %action,
            delta = record.delta(),
            "recorded budget change"
        );
        self.records.push(record);
        self.enforce_limits();
        seq
    }

    /// All retained records, oldest first
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Records for one item, oldest first
    pub fn records_for(&self, item_id: ItemId) -> Vec<&HistoryRecord> {
        self.records.iter().filter(|r| r.item_id == item_id).collect()
    }

    /// Most recent record for an item
    pub fn latest_for(&self, item_id: ItemId) -> Option<&HistoryRecord> {
        self.records.iter().rev().find(|r| r.item_id == item_id)
    }

    /// Look up a record by sequence number
    pub fn get(&self, seq: u64) -> Result<&HistoryRecord> {
        self.records
            .binary_search_by_key(&seq, |r| r.seq)
            .map(|idx| &self.records[idx])
            .map_err(|_| Error::RecordNotFound(seq))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records; sequence numbers keep increasing
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Get statistics about the history
    pub fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats {
            total_records: self.records.len(),
            first_seq: self.records.first().map(|r| r.seq),
            last_seq: self.records.last().map(|r| r.seq),
            first_at: self.records.first().map(|r| r.recorded_at),
            last_at: self.records.last().map(|r| r.recorded_at),
            ..HistoryStats::default()
        };

        for record in &self.records {
            match record.action {
                MutationAction::Created => stats.created += 1,
                MutationAction::Updated => stats.updated += 1,
                MutationAction::Deleted => stats.deleted += 1,
            }
        }

        stats
    }

    fn enforce_limits(&mut self) {
        if let Some(max) = self.config.max_records {
            if self.records.len() > max {
                let excess = self.records.len() - max;
                self.records.drain(0..excess);
            }
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_records: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub first_seq: Option<u64>,
    pub last_seq: Option<u64>,
    pub first_at: Option<DateTime<Utc>>,
    pub last_at: Option<DateTime<Utc>>,
}
