//! Identity types for items and equipment classes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a stored item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Create a new item ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item:{}", self.0)
    }
}

/// Equipment class used as the second key of the allowance table
///
/// An item's equipment string looks like `"Sword.NETHERITE"`; the part
/// before the first `.` names the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipClass {
    Sword,
    Axe,
    Pickaxe,
    Shovel,
    Hoe,
    Bow,
    Crossbow,
    Trident,
    Mace,
    Shield,
    Helmet,
    Chestplate,
    Leggings,
    Boots,
    Elytra,
    Trinket,
}

impl EquipClass {
    /// Every recognized class
    pub const ALL: [EquipClass; 16] = [
        EquipClass::Sword,
        EquipClass::Axe,
        EquipClass::Pickaxe,
        EquipClass::Shovel,
        EquipClass::Hoe,
        EquipClass::Bow,
        EquipClass::Crossbow,
        EquipClass::Trident,
        EquipClass::Mace,
        EquipClass::Shield,
        EquipClass::Helmet,
        EquipClass::Chestplate,
        EquipClass::Leggings,
        EquipClass::Boots,
        EquipClass::Elytra,
        EquipClass::Trinket,
    ];

    /// The allowance-table key for this class
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipClass::Sword => "Sword",
            EquipClass::Axe => "Axe",
            EquipClass::Pickaxe => "Pickaxe",
            EquipClass::Shovel => "Shovel",
            EquipClass::Hoe => "Hoe",
            EquipClass::Bow => "Bow",
            EquipClass::Crossbow => "Crossbow",
            EquipClass::Trident => "Trident",
            EquipClass::Mace => "Mace",
            EquipClass::Shield => "Shield",
            EquipClass::Helmet => "Helmet",
            EquipClass::Chestplate => "Chestplate",
            EquipClass::Leggings => "Leggings",
            EquipClass::Boots => "Boots",
            EquipClass::Elytra => "Elytra",
            EquipClass::Trinket => "Trinket",
        }
    }

    /// Look up a class by its exact name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.as_str() == name)
    }

    /// Resolve the class of an equipment string
    ///
    /// Unrecognized prefixes fall back to [`EquipClass::Sword`].
    pub fn from_equipment(equipment: &str) -> Self {
        let prefix = equipment.split('.').next().unwrap_or_default();
        Self::from_name(prefix).unwrap_or(EquipClass::Sword)
    }
}

impl fmt::Display for EquipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
