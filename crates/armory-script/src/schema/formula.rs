//! Named cost formula schema

use crate::error::{Error, Result};
use armory_core::{has_operator, validate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named cost formula (e.g. `"quadratic"` → `"weight * (max^2)"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaDef {
    /// Name referenced from the budget config
    pub name: String,
    /// Arithmetic expression over `weight, min, max, avg, range, value`
    pub expression: String,
    #[serde(default)]
    pub description: String,
}

impl FormulaDef {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            description: String::new(),
        }
    }
}

/// Validated named formulas
///
/// Resolves a configured formula value to the expression the aggregator
/// should evaluate.
#[derive(Debug, Clone, Default)]
pub struct FormulaBook {
    formulas: IndexMap<String, FormulaDef>,
}

impl FormulaBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a formula after validating its expression
    pub fn insert(&mut self, def: FormulaDef) -> Result<()> {
        if self.formulas.contains_key(&def.name) {
            return Err(Error::DuplicateDefinition(format!("formula {}", def.name)));
        }
        validate(&def.expression).map_err(|source| Error::InvalidFormula {
            name: def.name.clone(),
            source,
        })?;
        self.formulas.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FormulaDef> {
        self.formulas.get(name)
    }

    /// Resolve a formula name or literal expression to an expression
    ///
    /// Known names resolve to their stored expression; a value that already
    /// carries an operator is returned unchanged. Anything else is an
    /// unknown name.
    pub fn resolve<'a>(&'a self, name_or_expr: &'a str) -> Result<&'a str> {
        if let Some(def) = self.formulas.get(name_or_expr) {
            return Ok(&def.expression);
        }
        if has_operator(name_or_expr) {
            return Ok(name_or_expr);
        }
        Err(Error::UnknownFormula(name_or_expr.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormulaDef> {
        self.formulas.values()
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_def_ron() {
        let ron_str = r#"
        (
            name: "quadratic",
            expression: "weight * (max^2)",
        )
        "#;

        let def: FormulaDef = ron::from_str(ron_str).unwrap();
        assert_eq!(def.name, "quadratic");
        assert!(def.description.is_empty());
    }

    #[test]
    fn test_resolve() {
        let mut book = FormulaBook::new();
        book.insert(FormulaDef::new("linear", "weight * max")).unwrap();

        assert_eq!(book.resolve("linear").unwrap(), "weight * max");
        assert_eq!(book.resolve("weight * avg").unwrap(), "weight * avg");
        assert!(matches!(
            book.resolve("deleted"),
            Err(Error::UnknownFormula(name)) if name == "deleted"
        ));
    }

    #[test]
    fn test_insert_rejects_bad_formulas() {
        let mut book = FormulaBook::new();
        assert!(matches!(
            book.insert(FormulaDef::new("broken", "weight +")),
            Err(Error::InvalidFormula { .. })
        ));
        assert!(matches!(
            book.insert(FormulaDef::new("call", "banana(weight)")),
            Err(Error::InvalidFormula { .. })
        ));

        book.insert(FormulaDef::new("linear", "weight * max")).unwrap();
        assert!(matches!(
            book.insert(FormulaDef::new("linear", "weight * min")),
            Err(Error::DuplicateDefinition(_))
        ));
        assert_eq!(book.len(), 1);
    }
}
