//! Armory Core - Item budget engine
//!
//! This crate provides the budget/balance core for game-item definitions:
//! - Formula evaluator for admin-authored cost formulas (`weight * max`, ...)
//! - Item model (`Item`, `ItemAttribute`, `AttributeBound`)
//! - Typed budget configuration (`BudgetConfig`, `WeightMap`, `AllowanceMap`)
//! - Budget aggregation with under/at/over classification
//! - Rounding and formatting helpers shared by every caller
//!
//! Everything here is pure and synchronous. The same `(item, config)` pair
//! always yields the same `BudgetBreakdown`, whether computed for a live
//! editor preview or for a history record.

mod budget;
mod config;
mod error;
mod expr;
mod identity;
mod item;
pub mod numeric;

pub use budget::{
    compute_attribute_cost, compute_item_budget, resolve_formula_expression,
    try_compute_item_budget, AttributeCost, BudgetBreakdown, BudgetStatus,
};
pub use config::{AllowanceMap, BudgetConfig, WeightMap};
pub use error::{Error, Result};
pub use expr::{
    evaluate, has_operator, validate, Expr, Formula, FormulaVars, VarMap, DEFAULT_FORMULA,
    MAX_DEPTH, MAX_TOKENS, VARIABLES,
};
pub use identity::{EquipClass, ItemId};
pub use item::{AttributeBound, AttributeCategory, BoundType, Item, ItemAttribute};
