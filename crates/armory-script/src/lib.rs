//! Armory Script - definition loading for the budget engine
//!
//! Loads budget content from RON files and stored JSON blobs:
//! - Named cost formulas, validated when loaded
//! - Attribute definitions and item checks against them
//! - Weight and allowance tables
//! - The active formula selection, resolved to an expression

pub mod blob;
mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::{Definitions, Loader};
pub use schema::{AttributeDef, AttributeDefs, DefinitionIssue, FormulaBook, FormulaDef};
