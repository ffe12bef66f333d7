//! Parsing of loosely-typed JSON config blobs
//!
//! Stored configs keep weights, allowances and attribute definitions as
//! free-form JSON columns. These functions are the boundary where that
//! JSON becomes typed value objects: `null` or an empty string is an empty
//! table, numeric strings are accepted, and any other non-numeric entry
//! (or a negative weight) is dropped so later lookups see it as absent (and
//! therefore `0`).

use crate::error::{Error, Result};
use crate::schema::{AttributeDef, AttributeDefs};
use armory_core::{AllowanceMap, BudgetConfig, WeightMap};
use serde_json::{Map, Value};
use tracing::debug;

/// Parse a weights blob (`{"ATTACK_DAMAGE": 3, ...}`)
pub fn weights_from_json(json: &str) -> Result<WeightMap> {
    let Some(object) = parse_object(json, "weights")? else {
        return Ok(WeightMap::new());
    };

    let mut weights = WeightMap::new();
    for (name, value) in object {
        match as_number(&value) {
            Some(weight) if weight >= 0.0 => weights.set(name, weight),
            Some(_) => debug!(attribute = %name, value = %value, "dropping negative weight"),
            None => debug!(attribute = %name, value = %value, "dropping non-numeric weight"),
        }
    }
    Ok(weights)
}

/// Parse an allowances blob (`{"RARE": {"Sword": 30, ...}, ...}`)
pub fn allowances_from_json(json: &str) -> Result<AllowanceMap> {
    let Some(object) = parse_object(json, "allowances")? else {
        return Ok(AllowanceMap::new());
    };

    let mut allowances = AllowanceMap::new();
    for (rarity, classes) in object {
        let Value::Object(classes) = classes else {
            debug!(rarity = %rarity, "dropping non-object allowance row");
            continue;
        };
        for (class, value) in classes {
            match as_number(&value) {
                Some(allowed) => allowances.set_raw(rarity.clone(), class, allowed),
                None => debug!(rarity = %rarity, class = %class, "dropping non-numeric allowance"),
            }
        }
    }
    Ok(allowances)
}

/// Parse an attribute definitions blob (a JSON array of definitions)
pub fn attributes_from_json(json: &str) -> Result<AttributeDefs> {
    let mut defs = AttributeDefs::new();
    if json.trim().is_empty() {
        return Ok(defs);
    }

    let parsed: Option<Vec<AttributeDef>> = serde_json::from_str(json)?;
    for def in parsed.unwrap_or_default() {
        defs.insert(def)?;
    }
    Ok(defs)
}

/// Assemble a [`BudgetConfig`] from stored columns
pub fn budget_config_from_json(
    formula: &str,
    weights_json: &str,
    allowances_json: &str,
) -> Result<BudgetConfig> {
    Ok(BudgetConfig {
        formula: formula.to_string(),
        weights: weights_from_json(weights_json)?,
        allowances: allowances_from_json(allowances_json)?,
    })
}

fn parse_object(json: &str, what: &str) -> Result<Option<Map<String, Value>>> {
    if json.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Value>(json)? {
        Value::Null => Ok(None),
        Value::Object(object) => Ok(Some(object)),
        other => Err(Error::InvalidSchema(format!(
            "{} must be a JSON object, got {}",
            what, other
        ))),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}
