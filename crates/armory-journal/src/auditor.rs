//! Auditing and analytics for budget history

use crate::history::{History, HistoryRecord, MutationAction};
use armory_core::{numeric::round2, ItemId};
use std::collections::HashMap;

/// Auditor for querying and analyzing budget history
pub struct Auditor<'a> {
    history: &'a History,
}

impl<'a> Auditor<'a> {
    /// Create a new auditor for a history
    pub fn new(history: &'a History) -> Self {
        Self { history }
    }

    /// Generate an audit report
    pub fn report(&self) -> AuditReport {
        let stats = self.history.stats();
        let mut actions_by_actor: HashMap<String, usize> = HashMap::new();
        let mut net_change = 0.0;

        for record in self.history.records() {
            *actions_by_actor.entry(record.actor.clone()).or_insert(0) += 1;
            net_change += record.delta();
        }

        let mut items: Vec<ItemId> = self.history.records().iter().map(|r| r.item_id).collect();
        items.sort();
        items.dedup();

        AuditReport {
            total_records: stats.total_records,
            created: stats.created,
            updated: stats.updated,
            deleted: stats.deleted,
            items_touched: items.len(),
            first_seq: stats.first_seq,
            last_seq: stats.last_seq,
            net_change: round2(net_change),
            actions_by_actor,
        }
    }

    /// Query records matching specific criteria
    pub fn query(&self, query: &HistoryQuery) -> Vec<&'a HistoryRecord> {
        self.history
            .records()
            .iter()
            .filter(|record| query.matches(record))
            .collect()
    }

    /// The `n` records with the largest budget increase, biggest first
    ///
    /// Records that did not increase the budget are left out. Ties keep
    /// history order.
    pub fn largest_increases(&self, n: usize) -> Vec<&'a HistoryRecord> {
        let mut increases: Vec<&HistoryRecord> = self
            .history
            .records()
            .iter()
            .filter(|r| r.delta() > 0.0)
            .collect();
        increases.sort_by(|a, b| b.delta().total_cmp(&a.delta()));
        increases.truncate(n);
        increases
    }

    /// Summarize the history of one item
    pub fn item_summary(&self, item_id: ItemId) -> ItemSummary {
        let records = self.history.records_for(item_id);
        ItemSummary {
            item_id,
            changes: records.len(),
            net_change: round2(records.iter().map(|r| r.delta()).sum()),
            current_budget: records.last().and_then(|r| r.budget_after),
            deleted: records
                .last()
                .map(|r| r.action == MutationAction::Deleted)
                .unwrap_or(false),
        }
    }
}

/// An audit report over a whole history
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub total_records: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Distinct items with at least one record
    pub items_touched: usize,
    pub first_seq: Option<u64>,
    pub last_seq: Option<u64>,
    /// Sum of all record deltas
    pub net_change: f64,
    pub actions_by_actor: HashMap<String, usize>,
}

impl std::fmt::Display for AuditReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Audit Report ===")?;
        writeln!(f, "Total records: {}", self.total_records)?;
        writeln!(f, "Created: {}", self.created)?;
        writeln!(f, "Updated: {}", self.updated)?;
        writeln!(f, "Deleted: {}", self.deleted)?;
        writeln!(f, "Items touched: {}", self.items_touched)?;
        writeln!(f, "Net budget change: {:.2}", self.net_change)?;

        if let (Some(first), Some(last)) = (self.first_seq, self.last_seq) {
            writeln!(f, "Sequence range: {} - {}", first, last)?;
        }

        if !self.actions_by_actor.is_empty() {
            writeln!(f, "\nChanges by actor:")?;
            let mut sorted: Vec<_> = self.actions_by_actor.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (actor, count) in sorted {
                writeln!(f, "  {}: {}", actor, count)?;
            }
        }

        Ok(())
    }
}

/// Query criteria for filtering history records
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Start sequence number (inclusive)
    pub start_seq: Option<u64>,
    /// End sequence number (inclusive)
    pub end_seq: Option<u64>,
    pub item_id: Option<ItemId>,
    pub actor: Option<String>,
    pub action: Option<MutationAction>,
}

impl HistoryQuery {
    /// Create a new empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by sequence range
    pub fn in_range(mut self, start: u64, end: u64) -> Self {
        self.start_seq = Some(start);
        self.end_seq = Some(end);
        self
    }

    /// Filter by item
    pub fn for_item(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Filter by actor
    pub fn by_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Filter by mutation kind
    pub fn by_action(mut self, action: MutationAction) -> Self {
        self.action = Some(action);
        self
    }

    fn matches(&self, record: &HistoryRecord) -> bool {
        if self.start_seq.is_some_and(|start| record.seq < start) {
            return false;
        }
        if self.end_seq.is_some_and(|end| record.seq > end) {
            return false;
        }
        if self.item_id.is_some_and(|id| record.item_id != id) {
            return false;
        }
        if let Some(ref actor) = self.actor {
            if &record.actor != actor {
                return false;
            }
        }
        if self.action.is_some_and(|action| record.action != action) {
            return false;
        }
        true
    }
}

/// Summary of one item's budget history
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSummary {
    pub item_id: ItemId,
    pub changes: usize,
    pub net_change: f64,
    /// Budget after the most recent change
    pub current_budget: Option<f64>,
    pub deleted: bool,
}
