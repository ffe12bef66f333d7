//! Item budget aggregation
//!
//! Turns an item's attributes plus a [`BudgetConfig`] into a
//! [`BudgetBreakdown`]. The computation has no hidden inputs: the live
//! editor preview and the history writer get bit-identical results for the
//! same item and config.
//!
//! Rounding happens twice on purpose, once per attribute and once on the
//! total. Stored history values were produced that way.

use crate::config::BudgetConfig;
use crate::expr::{evaluate, has_operator, validate, Formula, FormulaVars, DEFAULT_FORMULA};
use crate::item::{Item, ItemAttribute};
use crate::numeric::{parse_bound, round2};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// How an item's cost compares to its allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Under,
    At,
    Over,
}

impl BudgetStatus {
    /// Classify `used` against `allowed` (exact comparison, no epsilon)
    pub fn classify(used: f64, allowed: f64) -> Self {
        if used < allowed {
            BudgetStatus::Under
        } else if used == allowed {
            BudgetStatus::At
        } else {
            BudgetStatus::Over
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Under => "under",
            BudgetStatus::At => "at",
            BudgetStatus::Over => "over",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost of one non-bypassed attribute, rounded to 2 decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCost {
    pub name: String,
    pub cost: f64,
}

/// Result of a budget computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    /// Sum of attribute costs, rounded to 2 decimals
    pub used: f64,
    /// Allowance for the item's rarity and equipment class
    pub allowed: f64,
    pub status: BudgetStatus,
    /// Per-attribute costs in input order, bypassed attributes omitted
    pub breakdown: Vec<AttributeCost>,
}

impl BudgetBreakdown {
    /// Budget left before the item goes over (negative when over)
    pub fn remaining(&self) -> f64 {
        round2(self.allowed - self.used)
    }

    /// Fraction of the allowance in use, `None` when nothing is allowed
    pub fn ratio(&self) -> Option<f64> {
        (self.allowed != 0.0).then(|| self.used / self.allowed)
    }

    pub fn is_over(&self) -> bool {
        self.status == BudgetStatus::Over
    }
}

/// Pick the expression to evaluate for a raw formula value
///
/// A value with no arithmetic operator is an unresolved formula name and
/// is replaced by [`DEFAULT_FORMULA`]. That substitution changes budgets,
/// so it is logged.
pub fn resolve_formula_expression(raw: &str) -> &str {
    if has_operator(raw) {
        raw
    } else {
        warn!(
            formula = raw,
            fallback = DEFAULT_FORMULA,
            "formula has no operator, falling back to default"
        );
        DEFAULT_FORMULA
    }
}

/// Cost of a single numeric bound (not rounded)
pub fn compute_attribute_cost(expression: &str, weight: f64, min: f64, max: f64) -> Result<f64> {
    evaluate(expression, &FormulaVars::new(weight, min, max).to_var_map())
}

/// Compute the budget of an item
///
/// Never fails: unparsable bounds, missing weights or allowances and
/// formula evaluation errors all contribute `0`.
///
/// ```
/// use armory_core::{compute_item_budget, AttributeBound, BudgetConfig, BudgetStatus,
///     EquipClass, Item, ItemAttribute};
///
/// let config = BudgetConfig::new("weight * max")
///     .with_weight("ATTACK_DAMAGE", 3.0)
///     .with_allowance("RARE", EquipClass::Sword, 30.0);
/// let item = Item::new("Blade", "RARE", "Sword.IRON").with_attribute(
///     ItemAttribute::new("ATTACK_DAMAGE").with_bound(AttributeBound::double("0", "5")),
/// );
///
/// let budget = compute_item_budget(&item, &config);
/// assert_eq!(budget.used, 15.0);
/// assert_eq!(budget.allowed, 30.0);
/// assert_eq!(budget.status, BudgetStatus::Under);
/// ```
pub fn compute_item_budget(item: &Item, config: &BudgetConfig) -> BudgetBreakdown {
    let expression = resolve_formula_expression(&config.formula);
    let formula = match Formula::parse(expression) {
        Ok(formula) => Some(formula),
        Err(err) => {
            warn!(formula = expression, error = %err, "formula does not parse, numeric bounds cost 0");
            None
        }
    };
    aggregate(item, config, formula.as_ref())
}

/// Compute the budget of an item, refusing a structurally broken formula
///
/// For callers that would rather show "budget unavailable" than a number
/// computed with a formula that cannot be evaluated.
pub fn try_compute_item_budget(item: &Item, config: &BudgetConfig) -> Result<BudgetBreakdown> {
    let expression = resolve_formula_expression(&config.formula);
    validate(expression)?;
    let formula = Formula::parse(expression)?;
    Ok(aggregate(item, config, Some(&formula)))
}

fn aggregate(item: &Item, config: &BudgetConfig, formula: Option<&Formula>) -> BudgetBreakdown {
    let breakdown: Vec<AttributeCost> = item
        .attributes
        .iter()
        .filter(|attr| !attr.bypass_bp)
        .map(|attr| AttributeCost {
            name: attr.name.clone(),
            cost: round2(attribute_total(attr, config, formula)),
        })
        .collect();

    let used = round2(breakdown.iter().map(|c| c.cost).sum());
    let allowed = config.allowances.allowed(&item.rarity, item.equip_class());

    BudgetBreakdown {
        used,
        allowed,
        status: BudgetStatus::classify(used, allowed),
        breakdown,
    }
}

fn attribute_total(attr: &ItemAttribute, config: &BudgetConfig, formula: Option<&Formula>) -> f64 {
    let weight = config.weights.weight(&attr.name);
    let mut total = 0.0;

    for bound in &attr.bounds {
        if !bound.kind.is_numeric() {
            total += weight;
            continue;
        }
        let Some(formula) = formula else {
            continue;
        };
        let vars = FormulaVars::new(weight, parse_bound(&bound.min), parse_bound(&bound.max));
        total += formula.eval(&vars.to_var_map()).unwrap_or_else(|err| {
            warn!(attribute = %attr.name, error = %err, "attribute cost evaluation failed, counted as 0");
            0.0
        });
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EquipClass;
    use crate::item::{AttributeBound, AttributeCategory};
    use crate::Error;

    fn sword(rarity: &str) -> Item {
        Item::new("Test Sword", rarity, "Sword.IRON")
    }

    fn numeric(name: &str, min: &str, max: &str) -> ItemAttribute {
        ItemAttribute::new(name).with_bound(AttributeBound::double(min, max))
    }

    #[test]
    fn test_end_to_end() {
        let config = BudgetConfig::new("weight * max")
            .with_weight("ATTACK_DAMAGE", 3.0)
            .with_allowance("RARE", EquipClass::Sword, 30.0);
        let item = sword("RARE").with_attribute(numeric("ATTACK_DAMAGE", "0", "5"));

        let budget = compute_item_budget(&item, &config);
        assert_eq!(budget.used, 15.0);
        assert_eq!(budget.allowed, 30.0);
        assert_eq!(budget.status, BudgetStatus::Under);
        assert_eq!(
            budget.breakdown,
            vec![AttributeCost {
                name: "ATTACK_DAMAGE".to_string(),
                cost: 15.0
            }]
        );
        assert_eq!(budget.remaining(), 15.0);
        assert_eq!(budget.ratio(), Some(0.5));
    }

    #[test]
    fn test_string_bound_costs_weight() {
        let config = BudgetConfig::new("weight * max^3").with_weight("LORE", 4.0);
        let item = sword("RARE")
            .with_attribute(ItemAttribute::new("LORE").with_bound(AttributeBound::string("x")));

        let budget = compute_item_budget(&item, &config);
        assert_eq!(budget.used, 4.0);
        assert_eq!(budget.breakdown[0].cost, 4.0);
    }

    #[test]
    fn test_int_bound_uses_formula() {
        let config = BudgetConfig::new("weight * max").with_weight("ATTACK_DAMAGE", 3.0);
        let item = sword("RARE").with_attribute(
            ItemAttribute::new("ATTACK_DAMAGE").with_bound(AttributeBound::int("0", "5")),
        );
        assert_eq!(compute_item_budget(&item, &config).used, 15.0);

        let quadratic = BudgetConfig {
            formula: "weight * (max^2)".to_string(),
            ..config
        };
        assert_eq!(compute_item_budget(&item, &quadratic).used, 75.0);
    }

    #[test]
    fn test_category_does_not_affect_cost() {
        let config = BudgetConfig::new("weight * avg").with_weight("ARMOR", 2.0);
        let custom = sword("RARE").with_attribute(numeric("ARMOR", "2", "6"));
        let vanilla = sword("RARE")
            .with_attribute(numeric("ARMOR", "2", "6").with_category(AttributeCategory::Vanilla));

        let custom_budget = compute_item_budget(&custom, &config);
        assert_eq!(custom_budget.used, 8.0);
        assert_eq!(compute_item_budget(&vanilla, &config), custom_budget);
    }

    #[test]
    fn test_bypassed_attribute_is_excluded() {
        let config = BudgetConfig::default()
            .with_weight("ATTACK_DAMAGE", 100.0)
            .with_weight("SPEED", 1.0);
        let item = sword("RARE")
            .with_attribute(numeric("ATTACK_DAMAGE", "0", "1000").bypassed())
            .with_attribute(numeric("SPEED", "0", "2"));

        let budget = compute_item_budget(&item, &config);
        assert_eq!(budget.used, 2.0);
        assert_eq!(budget.breakdown.len(), 1);
        assert_eq!(budget.breakdown[0].name, "SPEED");
    }

    #[test]
    fn test_status_boundary() {
        let config = BudgetConfig::new("weight * max")
            .with_weight("A", 1.0)
            .with_allowance("RARE", EquipClass::Sword, 10.0);

        let status_for = |max: &str| {
            let item = sword("RARE").with_attribute(numeric("A", "0", max));
            compute_item_budget(&item, &config).status
        };

        assert_eq!(status_for("10"), BudgetStatus::At);
        assert_eq!(status_for("10.00"), BudgetStatus::At);
        assert_eq!(status_for("10.01"), BudgetStatus::Over);
        assert_eq!(status_for("9.99"), BudgetStatus::Under);
    }

    #[test]
    fn test_deterministic_and_ordered() {
        let config = BudgetConfig::new("weight * (max^2) - min")
            .with_weight("C", 0.7)
            .with_weight("A", 1.3)
            .with_weight("B", 2.1);
        let item = sword("EPIC")
            .with_attribute(numeric("C", "1", "3.3"))
            .with_attribute(numeric("A", "0.1", "7"))
            .with_attribute(numeric("B", "-2", "1.25"));

        let first = compute_item_budget(&item, &config);
        let second = compute_item_budget(&item, &config);
        assert_eq!(first, second);
        assert_eq!(first.used.to_bits(), second.used.to_bits());
        let names: Vec<_> = first.breakdown.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_equipment_class_fallback() {
        let config = BudgetConfig::default().with_allowance("RARE", EquipClass::Sword, 30.0);
        let item = Item::new("Odd", "RARE", "Gadget.WEIRD");
        assert_eq!(compute_item_budget(&item, &config).allowed, 30.0);
    }

    #[test]
    fn test_double_rounding_is_preserved() {
        let config = BudgetConfig::new("weight / 3").with_weight("A", 1.0);

        // rounded per attribute: 0.33 + 0.33
        let two_attrs = sword("RARE")
            .with_attribute(numeric("A", "0", "0"))
            .with_attribute(numeric("A", "0", "0"));
        assert_eq!(compute_item_budget(&two_attrs, &config).used, 0.66);

        // bounds of one attribute are summed before rounding: 0.666.. -> 0.67
        let two_bounds = sword("RARE").with_attribute(
            numeric("A", "0", "0").with_bound(AttributeBound::double("0", "0")),
        );
        assert_eq!(compute_item_budget(&two_bounds, &config).used, 0.67);
    }

    #[test]
    fn test_formula_without_operator_falls_back() {
        let config = BudgetConfig::new("linear").with_weight("A", 2.0);
        let item = sword("RARE").with_attribute(numeric("A", "1", "4"));
        assert_eq!(compute_item_budget(&item, &config).used, 8.0);
        assert_eq!(resolve_formula_expression("linear"), DEFAULT_FORMULA);
        assert_eq!(resolve_formula_expression("weight + 1"), "weight + 1");
    }

    #[test]
    fn test_bad_data_degrades_to_zero() {
        let config = BudgetConfig::new("weight * max").with_weight("A", 2.0);
        let item = sword("NOPE")
            .with_attribute(numeric("A", "lots", "many"))
            .with_attribute(numeric("UNWEIGHTED", "0", "50"));

        let budget = compute_item_budget(&item, &config);
        assert_eq!(budget.used, 0.0);
        assert_eq!(budget.allowed, 0.0);
        assert_eq!(budget.status, BudgetStatus::At);
        assert_eq!(budget.breakdown.len(), 2);
        assert_eq!(budget.ratio(), None);
    }

    #[test]
    fn test_broken_formula_keeps_flat_costs() {
        let config = BudgetConfig::new("weight * bogus")
            .with_weight("A", 2.0)
            .with_weight("LORE", 3.0);
        let item = sword("RARE")
            .with_attribute(numeric("A", "0", "5"))
            .with_attribute(ItemAttribute::new("LORE").with_bound(AttributeBound::string("x")));

        let budget = compute_item_budget(&item, &config);
        assert_eq!(budget.used, 3.0);

        assert_eq!(
            try_compute_item_budget(&item, &config),
            Err(Error::UnknownVariable("bogus".to_string()))
        );
        let config = BudgetConfig::new("weight * (max").with_weight("LORE", 3.0);
        assert_eq!(compute_item_budget(&item, &config).used, 3.0);
        assert!(try_compute_item_budget(&item, &config).is_err());
    }

    #[test]
    fn test_try_compute_matches_compute() {
        let config = BudgetConfig::new("weight * avg + range")
            .with_weight("A", 1.5)
            .with_allowance("RARE", EquipClass::Sword, 12.0);
        let item = sword("RARE").with_attribute(numeric("A", "2", "6"));

        let lenient = compute_item_budget(&item, &config);
        let strict = try_compute_item_budget(&item, &config).unwrap();
        assert_eq!(lenient, strict);
        assert_eq!(strict.used, 10.0);
    }

    #[test]
    fn test_compute_attribute_cost() {
        assert_eq!(compute_attribute_cost("weight * max", 3.0, 0.0, 5.0).unwrap(), 15.0);
        assert_eq!(compute_attribute_cost("weight * range", 2.0, 1.0, 4.0).unwrap(), 6.0);
        assert_eq!(compute_attribute_cost("weight / min", 2.0, 0.0, 4.0).unwrap(), 0.0);
        assert!(compute_attribute_cost("weight * x", 2.0, 0.0, 4.0).is_err());
    }

    #[test]
    fn test_serialized_status_is_lowercase() {
        let json = serde_json::to_string(&BudgetStatus::Over).unwrap();
        assert_eq!(json, "\"over\"");
    }
}
