//! Export budget history to various formats

use crate::history::{History, HistoryRecord, HistoryStats};
use crate::{Error, Result};
use armory_core::numeric::format_cost;
use serde::Serialize;
use std::io::Write;

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// RON format (Rust Object Notation)
    Ron,
    /// JSON format (requires serde_json feature)
    Json,
    /// Human-readable text format
    Text,
}

/// Exporter for budget history
pub struct Exporter<'a> {
    history: &'a History,
}

impl<'a> Exporter<'a> {
    /// Create a new exporter
    pub fn new(history: &'a History) -> Self {
        Self { history }
    }

    /// Export to a string in the specified format
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Ron => self.to_ron(),
            ExportFormat::Json => self.to_json(),
            ExportFormat::Text => Ok(self.to_text()),
        }
    }

    /// Export to a writer
    pub fn export_to<W: Write>(&self, writer: &mut W, format: ExportFormat) -> Result<()> {
        let content = self.export(format)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Export to RON format
    pub fn to_ron(&self) -> Result<String> {
        let export = ExportData::from_history(self.history);
        ron::ser::to_string_pretty(&export, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Export to JSON format
    #[cfg(feature = "serde_json")]
    pub fn to_json(&self) -> Result<String> {
        let export = ExportData::from_history(self.history);
        serde_json::to_string_pretty(&export).map_err(|e| Error::Serialization(e.to_string()))
    }

    #[cfg(not(feature = "serde_json"))]
    pub fn to_json(&self) -> Result<String> {
        Err(Error::ExportError(
            "JSON export requires the 'serde_json' feature".to_string(),
        ))
    }

    /// Export to human-readable text format
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        let stats = self.history.stats();

        output.push_str("=== History Export ===\n\n");
        output.push_str(&format!("Total records: {}\n", stats.total_records));
        output.push_str(&format!(
            "Created: {}, Updated: {}, Deleted: {}\n",
            stats.created, stats.updated, stats.deleted
        ));
        if let (Some(first), Some(last)) = (stats.first_at, stats.last_at) {
            output.push_str(&format!(
                "Time range: {} - {}\n",
                first.to_rfc3339(),
                last.to_rfc3339()
            ));
        }

        output.push_str("\n=== Records ===\n\n");
        for record in self.history.records() {
            output.push_str(&text_line(record));
        }

        output
    }
}

fn text_line(record: &HistoryRecord) -> String {
    let side = |v: Option<f64>| v.map(format_cost).unwrap_or_else(|| "-".to_string());
    let delta = record.delta();
    let sign = if delta > 0.0 { "+" } else { "" };

    format!(
        "  #{} {} {} by {}: {} -> {} ({}{})  at {}\n",
        record.seq,
        record.item_id,
        record.action,
        record.actor,
        side(record.budget_before),
        side(record.budget_after),
        sign,
        format_cost(delta),
        record.recorded_at.to_rfc3339(),
    )
}

/// Data structure for full history export
#[derive(Debug, Clone, Serialize)]
struct ExportData {
    version: u32,
    stats: HistoryStats,
    records: Vec<HistoryRecord>,
}

impl ExportData {
    fn from_history(history: &History) -> Self {
        Self {
            version: 1,
            stats: history.stats(),
            records: history.records().to_vec(),
        }
    }
}
