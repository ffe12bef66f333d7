//! RON definition loader

use crate::error::{Error, Result};
use crate::schema::{AttributeDef, AttributeDefs, FormulaBook, FormulaDef};
use armory_core::{AllowanceMap, BudgetConfig, WeightMap, DEFAULT_FORMULA};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Loaded budget definitions
#[derive(Debug, Default)]
pub struct Definitions {
    /// Named cost formulas
    pub formulas: FormulaBook,
    /// Attribute definitions by name
    pub attributes: AttributeDefs,
    /// Attribute weights
    pub weights: WeightMap,
    /// Allowances per rarity and equipment class
    pub allowances: AllowanceMap,
    /// Formula name or expression the budget uses
    pub active_formula: Option<String>,
}

impl Definitions {
    /// Create empty definitions
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the aggregator's config with the active formula resolved
    ///
    /// A name that cannot be resolved is passed through unchanged, leaving
    /// the aggregator's own fallback in charge.
    pub fn budget_config(&self) -> BudgetConfig {
        let raw = self.active_formula.as_deref().unwrap_or(DEFAULT_FORMULA);
        let formula = match self.formulas.resolve(raw) {
            Ok(expression) => expression.to_string(),
            Err(err) => {
                warn!(formula = raw, error = %err, "active formula does not resolve");
                raw.to_string()
            }
        };

        BudgetConfig {
            formula,
            weights: self.weights.clone(),
            allowances: self.allowances.clone(),
        }
    }
}

#[derive(Deserialize)]
struct FormulaFile {
    formulas: Vec<FormulaDef>,
}

#[derive(Deserialize)]
struct AttributeFile {
    attributes: Vec<AttributeDef>,
}

#[derive(Deserialize)]
struct WeightFile {
    weights: IndexMap<String, f64>,
}

#[derive(Deserialize)]
struct AllowanceFile {
    allowances: IndexMap<String, IndexMap<String, f64>>,
}

#[derive(Deserialize)]
struct BudgetFile {
    active_formula: String,
}

/// Loader for RON definition files
pub struct Loader {
    defs: Definitions,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            defs: Definitions::new(),
        }
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading definitions");

        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        if content.contains("active_formula:") {
            self.load_budget_str(&content)
        } else if filename.contains("formula") || content.contains("formulas:") {
            self.load_formulas_str(&content)
        } else if filename.contains("attribute") || content.contains("attributes:") {
            self.load_attributes_str(&content)
        } else if filename.contains("weight") || content.contains("weights:") {
            self.load_weights_str(&content)
        } else if filename.contains("allowance") || content.contains("allowances:") {
            self.load_allowances_str(&content)
        } else {
            self.load_single_definition(&content)
        }
    }

    /// Load named formulas from a RON string
    pub fn load_formulas_str(&mut self, content: &str) -> Result<()> {
        let file: FormulaFile = ron::from_str(content)?;
        for formula in file.formulas {
            self.defs.formulas.insert(formula)?;
        }
        Ok(())
    }

    /// Load attribute definitions from a RON string
    pub fn load_attributes_str(&mut self, content: &str) -> Result<()> {
        let file: AttributeFile = ron::from_str(content)?;
        for attribute in file.attributes {
            self.defs.attributes.insert(attribute)?;
        }
        Ok(())
    }

    /// Load attribute weights from a RON string
    ///
    /// The whole file is checked before any weight is added.
    pub fn load_weights_str(&mut self, content: &str) -> Result<()> {
        let file: WeightFile = ron::from_str(content)?;
        for (name, weight) in &file.weights {
            if self.defs.weights.contains(name) {
                return Err(Error::DuplicateDefinition(format!("weight {}", name)));
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::InvalidSchema(format!(
                    "weight {} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        for (name, weight) in file.weights {
            self.defs.weights.set(name, weight);
        }
        Ok(())
    }

    /// Load allowances from a RON string
    ///
    /// The whole file is checked before any allowance is added.
    pub fn load_allowances_str(&mut self, content: &str) -> Result<()> {
        let file: AllowanceFile = ron::from_str(content)?;
        for (rarity, classes) in &file.allowances {
            for (class, allowed) in classes {
                let exists = self
                    .defs
                    .allowances
                    .iter()
                    .any(|(r, c, _)| r == rarity && c == class);
                if exists {
                    return Err(Error::DuplicateDefinition(format!(
                        "allowance {}/{}",
                        rarity, class
                    )));
                }
                if !allowed.is_finite() {
                    return Err(Error::InvalidSchema(format!(
                        "allowance {}/{} must be a number",
                        rarity, class
                    )));
                }
            }
        }
        for (rarity, classes) in file.allowances {
            for (class, allowed) in classes {
                self.defs.allowances.set_raw(rarity.clone(), class, allowed);
            }
        }
        Ok(())
    }

    /// Load the active formula selection from a RON string
    pub fn load_budget_str(&mut self, content: &str) -> Result<()> {
        let file: BudgetFile = ron::from_str(content)?;
        if self.defs.active_formula.is_some() {
            return Err(Error::DuplicateDefinition("active_formula".to_string()));
        }
        self.defs.active_formula = Some(file.active_formula);
        Ok(())
    }

    /// Try to load a single definition
    fn load_single_definition(&mut self, content: &str) -> Result<()> {
        if let Ok(formula) = ron::from_str::<FormulaDef>(content) {
            return self.defs.formulas.insert(formula);
        }

        if let Ok(attribute) = ron::from_str::<AttributeDef>(content) {
            return self.defs.attributes.insert(attribute);
        }

        Err(Error::InvalidSchema(
            "Could not parse as any known definition type".to_string(),
        ))
    }

    /// Load all RON files from a directory
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        // sorted for a deterministic load order
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.extension().map(|e| e == "ron").unwrap_or(false) {
                self.load_file(&file_path)?;
            } else if file_path.is_dir() {
                self.load_directory(&file_path)?;
            }
        }

        Ok(())
    }

    /// Finish loading and return the definitions
    pub fn finish(self) -> Definitions {
        self.defs
    }

    /// Get the current definitions (for inspection during loading)
    pub fn defs(&self) -> &Definitions {
        &self.defs
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
