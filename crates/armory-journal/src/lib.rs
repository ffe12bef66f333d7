//! Armory Journal - Budget history, auditing and export
//!
//! Every item mutation leaves a [`HistoryRecord`] with the item's budget
//! before and after the change. On top of the raw history this crate
//! provides:
//!
//! - **Auditor**: Query records and summarize budget drift per item or actor
//! - **Exporter**: Export history to RON, JSON (feature `serde_json`) or text
//!
//! # Example
//!
//! ```rust,ignore
//! use armory_core::ItemId;
//! use armory_journal::{Auditor, Exporter, History, HistoryQuery, MutationAction};
//!
//! let mut history = History::new();
//! history.record(ItemId(1), MutationAction::Created, "ana", None, Some(36.0));
//! history.record(ItemId(1), MutationAction::Updated, "ana", Some(36.0), Some(42.5));
//!
//! let auditor = Auditor::new(&history);
//! println!("{}", auditor.report());
//! let by_ana = auditor.query(&HistoryQuery::new().by_actor("ana"));
//!
//! let ron = Exporter::new(&history).to_ron()?;
//! ```

mod auditor;
mod error;
mod exporter;
mod history;

pub use auditor::{AuditReport, Auditor, HistoryQuery, ItemSummary};
pub use error::{Error, Result};
pub use exporter::{ExportFormat, Exporter};
pub use history::{History, HistoryConfig, HistoryRecord, HistoryStats, MutationAction};
