//! Budget configuration value objects
//!
//! The weight and allowance tables are typed maps whose lookups fill
//! missing keys with `0`. That default lives here and nowhere else.

use crate::expr::DEFAULT_FORMULA;
use crate::identity::EquipClass;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-attribute-name cost weights
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap(IndexMap<String, f64>);

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight of an attribute, `0` when absent
    pub fn weight(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    /// Set the weight of an attribute
    pub fn set(&mut self, name: impl Into<String>, weight: f64) {
        self.0.insert(name.into(), weight);
    }

    /// Whether an explicit weight exists for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for WeightMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Maximum total cost per rarity and equipment class
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowanceMap(IndexMap<String, IndexMap<String, f64>>);

impl AllowanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allowance for a rarity and class, `0` when either key is absent
    pub fn allowed(&self, rarity: &str, class: EquipClass) -> f64 {
        self.0
            .get(rarity)
            .and_then(|classes| classes.get(class.as_str()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Set the allowance for a rarity and class
    pub fn set(&mut self, rarity: impl Into<String>, class: EquipClass, allowed: f64) {
        self.0
            .entry(rarity.into())
            .or_default()
            .insert(class.as_str().to_string(), allowed);
    }

    /// Set an allowance by raw class name, as stored tables spell it
    pub fn set_raw(&mut self, rarity: impl Into<String>, class: impl Into<String>, allowed: f64) {
        self.0
            .entry(rarity.into())
            .or_default()
            .insert(class.into(), allowed);
    }

    /// Rarities with at least one entry, in insertion order
    pub fn rarities(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every `(rarity, class, allowed)` entry
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.0.iter().flat_map(|(rarity, classes)| {
            classes
                .iter()
                .map(move |(class, allowed)| (rarity.as_str(), class.as_str(), *allowed))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(IndexMap::is_empty)
    }
}

fn default_formula() -> String {
    DEFAULT_FORMULA.to_string()
}

/// Everything the aggregator reads besides the item itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Cost formula expression, or an unresolved raw value
    #[serde(default = "default_formula")]
    pub formula: String,
    #[serde(default)]
    pub weights: WeightMap,
    #[serde(default)]
    pub allowances: AllowanceMap,
}

impl BudgetConfig {
    /// Create a config with the given formula and empty tables
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            weights: WeightMap::new(),
            allowances: AllowanceMap::new(),
        }
    }

    /// Add a weight
    pub fn with_weight(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.weights.set(name, weight);
        self
    }

    /// Add an allowance
    pub fn with_allowance(
        mut self,
        rarity: impl Into<String>,
        class: EquipClass,
        allowed: f64,
    ) -> Self {
        self.allowances.set(rarity, class, allowed);
        self
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FORMULA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_default_to_zero() {
        let config = BudgetConfig::default()
            .with_weight("ATTACK_DAMAGE", 3.0)
            .with_allowance("RARE", EquipClass::Sword, 30.0);

        assert_eq!(config.weights.weight("ATTACK_DAMAGE"), 3.0);
        assert_eq!(config.weights.weight("ARMOR"), 0.0);
        assert_eq!(config.allowances.allowed("RARE", EquipClass::Sword), 30.0);
        assert_eq!(config.allowances.allowed("RARE", EquipClass::Bow), 0.0);
        assert_eq!(config.allowances.allowed("EPIC", EquipClass::Sword), 0.0);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: BudgetConfig = ron::from_str("(weights: { \"SPEED\": 2.0 })").unwrap();
        assert_eq!(config.formula, DEFAULT_FORMULA);
        assert_eq!(config.weights.weight("SPEED"), 2.0);
        assert!(config.allowances.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "formula": "weight * (max^2)",
            "weights": { "ARMOR": 1.5 },
            "allowances": { "COMMON": { "Helmet": 8, "Boots": 6 } }
        }"#;
        let config: BudgetConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.allowances.allowed("COMMON", EquipClass::Helmet), 8.0);
        assert_eq!(config.allowances.rarities().collect::<Vec<_>>(), vec!["COMMON"]);
        assert_eq!(config.allowances.iter().count(), 2);
    }
}
