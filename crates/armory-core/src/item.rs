//! Item definitions and their attributes
//!
//! Field names serialize the way stored item documents spell them
//! (`type`, `bypassBP`), so an item read from storage deserializes as-is.

use crate::identity::EquipClass;
use serde::{Deserialize, Serialize};

/// Value type of an attribute bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BoundType {
    #[default]
    Double,
    Int,
    String,
}

impl BoundType {
    /// Whether bounds of this type go through the cost formula
    pub fn is_numeric(&self) -> bool {
        !matches!(self, BoundType::String)
    }
}

/// One min/max range within an attribute
///
/// Endpoints are kept as the text the user typed and only parsed when a
/// budget is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeBound {
    #[serde(rename = "type", default)]
    pub kind: BoundType,
    #[serde(default)]
    pub min: String,
    #[serde(default)]
    pub max: String,
}

impl AttributeBound {
    /// A `Double` bound
    pub fn double(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            kind: BoundType::Double,
            min: min.into(),
            max: max.into(),
        }
    }

    /// An `Int` bound
    pub fn int(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            kind: BoundType::Int,
            min: min.into(),
            max: max.into(),
        }
    }

    /// A `String` bound holding a literal value
    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            kind: BoundType::String,
            min: value.clone(),
            max: value,
        }
    }
}

/// Where an attribute comes from; informational only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttributeCategory {
    #[default]
    Custom,
    Vanilla,
}

/// A named effect attached to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAttribute {
    #[serde(default)]
    pub category: AttributeCategory,
    /// Key into the weight and definition tables
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<AttributeBound>,
    /// Excluded from budget accounting when set
    #[serde(rename = "bypassBP", default)]
    pub bypass_bp: bool,
}

impl ItemAttribute {
    /// Create a custom attribute with no bounds
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            category: AttributeCategory::Custom,
            name: name.into(),
            bounds: Vec::new(),
            bypass_bp: false,
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: AttributeCategory) -> Self {
        self.category = category;
        self
    }

    /// Append a bound
    pub fn with_bound(mut self, bound: AttributeBound) -> Self {
        self.bounds.push(bound);
        self
    }

    /// Exclude from budget accounting
    pub fn bypassed(mut self) -> Self {
        self.bypass_bp = true;
        self
    }
}

/// The parts of an item the budget depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Rarity key into the allowance table (e.g. `"RARE"`)
    pub rarity: String,
    /// Equipment string (e.g. `"Sword.NETHERITE"`)
    pub equipment: String,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
}

impl Item {
    /// Create an item with no attributes
    pub fn new(
        name: impl Into<String>,
        rarity: impl Into<String>,
        equipment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            rarity: rarity.into(),
            equipment: equipment.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute
    pub fn with_attribute(mut self, attribute: ItemAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Equipment class used for the allowance lookup
    pub fn equip_class(&self) -> EquipClass {
        EquipClass::from_equipment(&self.equipment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_json_shape() {
        let json = r#"{
            "name": "Cleaver",
            "rarity": "RARE",
            "equipment": "Axe.DIAMOND",
            "attributes": [
                {
                    "category": "Vanilla",
                    "name": "ATTACK_DAMAGE",
                    "bounds": [{ "type": "Double", "min": "1", "max": "4.5" }],
                    "bypassBP": false
                },
                {
                    "name": "LORE",
                    "bounds": [{ "type": "String", "min": "sharp", "max": "sharp" }],
                    "bypassBP": true
                }
            ]
        }"#;

        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.equip_class(), EquipClass::Axe);
        assert_eq!(item.attributes.len(), 2);
        assert_eq!(item.attributes[0].category, AttributeCategory::Vanilla);
        assert_eq!(item.attributes[0].bounds[0], AttributeBound::double("1", "4.5"));
        assert_eq!(item.attributes[1].category, AttributeCategory::Custom);
        assert!(item.attributes[1].bypass_bp);
        assert!(!item.attributes[1].bounds[0].kind.is_numeric());

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["attributes"][1]["bypassBP"], true);
        assert_eq!(back["attributes"][0]["bounds"][0]["type"], "Double");
    }

    #[test]
    fn test_builders() {
        let item = Item::new("Needle", "COMMON", "Sword.IRON").with_attribute(
            ItemAttribute::new("SPEED")
                .with_bound(AttributeBound::int("1", "2"))
                .bypassed(),
        );
        assert_eq!(item.attributes[0].bounds[0].kind, BoundType::Int);
        assert!(item.attributes[0].bypass_bp);
    }
}
