//! Attribute definition schema

use crate::error::{Error, Result};
use armory_core::{AttributeCategory, BoundType, Item};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Definition of an attribute an item may carry (e.g. `ATTACK_DAMAGE`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Key shared with the weight table and item attributes
    pub name: String,
    #[serde(default)]
    pub category: AttributeCategory,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Bound types an item may use for this attribute (empty = any)
    #[serde(default)]
    pub bound_types: Vec<BoundType>,
}

impl AttributeDef {
    /// Create a new custom attribute definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: AttributeCategory::Custom,
            display_name: String::new(),
            description: String::new(),
            bound_types: Vec::new(),
        }
    }

    /// Whether a bound of `kind` may be used with this attribute
    pub fn permits(&self, kind: BoundType) -> bool {
        self.bound_types.is_empty() || self.bound_types.contains(&kind)
    }
}

/// A problem found when checking an item against attribute definitions
///
/// Issues are advisory; they never change a computed budget.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionIssue {
    UnknownAttribute {
        attribute: String,
    },
    BoundTypeNotAllowed {
        attribute: String,
        bound_type: BoundType,
    },
    CategoryMismatch {
        attribute: String,
        expected: AttributeCategory,
        found: AttributeCategory,
    },
}

impl fmt::Display for DefinitionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionIssue::UnknownAttribute { attribute } => {
                write!(f, "{}: no such attribute", attribute)
            }
            DefinitionIssue::BoundTypeNotAllowed {
                attribute,
                bound_type,
            } => write!(f, "{}: {:?} bounds are not allowed", attribute, bound_type),
            DefinitionIssue::CategoryMismatch {
                attribute,
                expected,
                found,
            } => write!(f, "{}: expected {:?}, found {:?}", attribute, expected, found),
        }
    }
}

/// Attribute definitions by name
#[derive(Debug, Clone, Default)]
pub struct AttributeDefs {
    defs: IndexMap<String, AttributeDef>,
}

impl AttributeDefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: AttributeDef) -> Result<()> {
        if self.defs.contains_key(&def.name) {
            return Err(Error::DuplicateDefinition(format!("attribute {}", def.name)));
        }
        self.defs.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDef> {
        self.defs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDef> {
        self.defs.values()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Check every attribute of an item, bypassed ones included
    pub fn check_item(&self, item: &Item) -> Vec<DefinitionIssue> {
        let mut issues = Vec::new();

        for attr in &item.attributes {
            let Some(def) = self.defs.get(&attr.name) else {
                issues.push(DefinitionIssue::UnknownAttribute {
                    attribute: attr.name.clone(),
                });
                continue;
            };

            if def.category != attr.category {
                issues.push(DefinitionIssue::CategoryMismatch {
                    attribute: attr.name.clone(),
                    expected: def.category,
                    found: attr.category,
                });
            }

            for bound in &attr.bounds {
                if !def.permits(bound.kind) {
                    issues.push(DefinitionIssue::BoundTypeNotAllowed {
                        attribute: attr.name.clone(),
                        bound_type: bound.kind,
                    });
                }
            }
        }

        issues
    }
}
