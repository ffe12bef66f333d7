//! Schema definitions for RON definition files

pub mod attribute;
pub mod formula;

pub use attribute::{AttributeDef, AttributeDefs, DefinitionIssue};
pub use formula::{FormulaBook, FormulaDef};
