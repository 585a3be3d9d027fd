//! Unit registry
//!
//! Owns base dimensions, derived dimension declarations, prefixes and unit
//! definitions, plus the index of every spelling (name, symbol, alias) that
//! resolves to a definition. Mutation goes through the `define_*` methods,
//! each of which validates completely before touching any table, so a
//! failed definition leaves the registry unchanged.

use std::borrow::Cow;
use std::collections::HashMap;

use gauge_core::{DimensionVector, Result, UnitError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ast::UnitExpr;
use crate::definition::{Prefix, UnitBody, UnitDefinition, UnitSpec};
use crate::format::format_terms;
use crate::parser::parse_expression;
use crate::resolved::ResolvedUnit;

/// A declared dimension: a base axis or a named derived combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDecl {
    /// Bracketed name (`[length]`, `[volumetric_flow_rate]`)
    pub name: String,
    /// Reduced to base dimensions
    pub dimension: DimensionVector,
    pub is_base: bool,
}

/// Registry of units, prefixes and dimensions
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Vec<UnitDefinition>,
    spellings: HashMap<String, usize>,
    prefixes: Vec<Prefix>,
    /// `(spelling, prefix index)`, longest spelling first
    prefix_spellings: Vec<(String, usize)>,
    dimensions: Vec<DimensionDecl>,
    dimension_index: HashMap<String, usize>,
    /// Base dimension name -> index of its reference unit
    references: HashMap<String, usize>,
}

impl UnitRegistry {
    /// Registry loaded from the bundled tables with the default patches
    pub fn new() -> Result<Self> {
        crate::bootstrap::Bootstrap::new().load()
    }

    /// Registry with no units, prefixes or dimensions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of registered units (prefixed forms not counted)
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Registered units in registration order
    pub fn units(&self) -> impl Iterator<Item = &UnitDefinition> + '_ {
        self.units.iter()
    }

    /// Declared dimensions, base and derived, in declaration order
    pub fn dimensions(&self) -> impl Iterator<Item = &DimensionDecl> + '_ {
        self.dimensions.iter()
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &Prefix> + '_ {
        self.prefixes.iter()
    }

    /// Look up a declared dimension by bracketed name
    pub fn dimension(&self, name: &str) -> Option<&DimensionDecl> {
        self.dimension_index.get(name).map(|&i| &self.dimensions[i])
    }

    /// Reference unit of a base dimension
    pub fn reference_of(&self, base: &str) -> Option<&UnitDefinition> {
        self.references.get(base).map(|&i| &self.units[i])
    }

    // ------------------------------------------------------------------
    // Definition
    // ------------------------------------------------------------------

    /// Register a unit.
    ///
    /// A dimension body naming a single undeclared dimension with scale 1 and
    /// no offset declares a new base dimension with this unit as its
    /// reference. Re-registering an identical definition merges any new
    /// spellings; any spelling owned by a different unit is a
    /// `DuplicateUnit`.
    pub fn define_unit(&mut self, spec: UnitSpec) -> Result<()> {
        if spec.name.is_empty() {
            return Err(UnitError::syntax("", 0, "", "empty unit name"));
        }

        let mut new_base = None;
        let (dimension, scale, offset) = match &spec.body {
            UnitBody::Dimension(text) => {
                let expr = parse_expression(text)?;
                let dimension = match &expr {
                    UnitExpr::Dimension(name)
                        if !name.is_empty()
                            && spec.scale == 1.0
                            && spec.offset == 0.0
                            && !self.dimension_index.contains_key(&bracketed(name)) =>
                    {
                        let base = bracketed(name);
                        validate_dimension_name(&base)?;
                        new_base = Some(base.clone());
                        DimensionVector::base(base)
                    }
                    _ => self.evaluate_dimension(&spec.name, &expr)?,
                };
                (dimension, spec.scale, spec.offset)
            }
            UnitBody::Expression(text) => scaled(&spec, self.resolve(text)?),
            UnitBody::Parsed(expr) => scaled(&spec, self.resolve_expr(expr)?),
        };

        if !scale.is_finite() || scale == 0.0 || !offset.is_finite() {
            return Err(UnitError::invalid_dimension(
                spec.name.clone(),
                format!("unit scale must be finite and non-zero (got {})", scale),
            ));
        }

        let mut definition = UnitDefinition::new(spec.name.clone(), dimension, scale);
        definition.offset = offset;
        definition.symbol = spec.symbol.clone().filter(|s| *s != spec.name);
        for alias in &spec.aliases {
            if alias != &spec.name
                && definition.symbol.as_ref() != Some(alias)
                && !definition.aliases.contains(alias)
            {
                definition.aliases.push(alias.clone());
            }
        }

        // Identical re-registration: merge spellings
        if let Some(&idx) = self.spellings.get(&definition.name) {
            let existing = &self.units[idx];
            if existing.name != definition.name || !existing.same_quantity(&definition) {
                return Err(UnitError::duplicate(definition.name));
            }
            for spelling in definition.spellings() {
                if let Some(&owner) = self.spellings.get(spelling) {
                    if owner != idx {
                        return Err(UnitError::duplicate(spelling));
                    }
                }
            }
            if let Some(symbol) = definition.symbol.filter(|s| !self.spellings.contains_key(s)) {
                let unit = &mut self.units[idx];
                if unit.symbol.is_none() {
                    unit.symbol = Some(symbol.clone());
                } else {
                    unit.aliases.push(symbol.clone());
                }
                self.spellings.insert(symbol, idx);
            }
            for alias in definition.aliases {
                if !self.spellings.contains_key(&alias) {
                    self.units[idx].aliases.push(alias.clone());
                    self.spellings.insert(alias, idx);
                }
            }
            debug!(unit = %self.units[idx].name, "unit re-registered");
            return Ok(());
        }

        for spelling in definition.spellings() {
            if self.spellings.contains_key(spelling) {
                return Err(UnitError::duplicate(spelling));
            }
        }

        let idx = self.units.len();
        for spelling in definition.spellings() {
            self.spellings.insert(spelling.to_string(), idx);
        }

        if let Some(base) = new_base {
            self.push_dimension(DimensionDecl {
                name: base.clone(),
                dimension: definition.dimension.clone(),
                is_base: true,
            });
            self.references.insert(base, idx);
        } else if definition.is_reference() && definition.dimension.len() == 1 {
            if let Some((base, exp)) = definition.dimension.iter().next() {
                if exp == gauge_core::Exponent::from_integer(1) && !self.references.contains_key(base) {
                    self.references.insert(base.to_string(), idx);
                }
            }
        }

        debug!(
            unit = %definition.name,
            dimension = %definition.dimension,
            scale = definition.scale,
            offset = definition.offset,
            "unit defined"
        );
        self.units.push(definition);
        Ok(())
    }

    /// Add another spelling for an existing unit
    pub fn define_alias(&mut self, existing: &str, alias: &str) -> Result<()> {
        let idx = match self.spellings.get(existing) {
            Some(&idx) => idx,
            None => {
                return Err(UnitError::UnknownUnit {
                    name: existing.to_string(),
                })
            }
        };
        match self.spellings.get(alias) {
            Some(&owner) if owner == idx => return Ok(()),
            Some(_) => return Err(UnitError::duplicate(alias)),
            None => {}
        }
        if alias.is_empty() {
            return Err(UnitError::syntax(alias, 0, "", "empty alias"));
        }

        self.units[idx].aliases.push(alias.to_string());
        self.spellings.insert(alias.to_string(), idx);
        debug!(unit = %self.units[idx].name, alias, "alias defined");
        Ok(())
    }

    /// Register a prefix; identical re-registration is a no-op
    pub fn define_prefix(&mut self, prefix: Prefix) -> Result<()> {
        if !prefix.factor.is_finite() || prefix.factor == 0.0 {
            return Err(UnitError::invalid_dimension(
                format!("{}-", prefix.name),
                "prefix factor must be finite and non-zero",
            ));
        }
        if let Some(existing) = self.prefixes.iter().find(|p| p.name == prefix.name) {
            if existing.factor == prefix.factor {
                return Ok(());
            }
            return Err(UnitError::duplicate(format!("{}-", prefix.name)));
        }
        for spelling in prefix.spellings() {
            if self.prefix_spellings.iter().any(|(s, _)| s == spelling) {
                return Err(UnitError::duplicate(format!("{}-", spelling)));
            }
        }

        let idx = self.prefixes.len();
        for spelling in prefix.spellings().filter(|s| !s.is_empty()) {
            self.prefix_spellings.push((spelling.to_string(), idx));
        }
        self.prefix_spellings
            .sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        debug!(prefix = %prefix.name, factor = prefix.factor, "prefix defined");
        self.prefixes.push(prefix);
        Ok(())
    }

    /// Declare a named derived dimension such as
    /// `[volumetric_flow_rate] = [length] ** 3 / [time]`.
    pub fn define_dimension(&mut self, name: &str, expression: &str) -> Result<()> {
        validate_dimension_name(name)?;
        let expr = parse_expression(expression)?;
        let dimension = self.evaluate_dimension(name, &expr)?;

        if let Some(existing) = self.dimension(name) {
            if existing.dimension == dimension {
                return Ok(());
            }
            return Err(UnitError::invalid_dimension(
                name,
                format!("already declared as {}", existing.dimension),
            ));
        }

        debug!(dimension = name, reduced = %dimension, "dimension declared");
        self.push_dimension(DimensionDecl {
            name: name.to_string(),
            dimension,
            is_base: false,
        });
        Ok(())
    }

    fn push_dimension(&mut self, decl: DimensionDecl) {
        self.dimension_index
            .insert(decl.name.clone(), self.dimensions.len());
        self.dimensions.push(decl);
    }

    /// Reduce a dimension expression to base dimensions
    fn evaluate_dimension(&self, owner: &str, expr: &UnitExpr) -> Result<DimensionVector> {
        match expr {
            UnitExpr::Dimension(name) if name.is_empty() => Ok(DimensionVector::dimensionless()),
            UnitExpr::Dimension(name) => {
                let name = bracketed(name);
                self.dimension(&name)
                    .map(|d| d.dimension.clone())
                    .ok_or_else(|| {
                        UnitError::invalid_dimension(owner, format!("unknown dimension '{}'", name))
                    })
            }
            UnitExpr::Number(_) => Ok(DimensionVector::dimensionless()),
            UnitExpr::UnitRef(unit) => Err(UnitError::invalid_dimension(
                owner,
                format!("'{}' is a unit, not a dimension", unit),
            )),
            UnitExpr::Product(l, r) => {
                let (l, r) = (self.evaluate_dimension(owner, l)?, self.evaluate_dimension(owner, r)?);
                l.multiply(&r).ok_or_else(|| dimension_overflow(owner))
            }
            UnitExpr::Quotient(l, r) => {
                let (l, r) = (self.evaluate_dimension(owner, l)?, self.evaluate_dimension(owner, r)?);
                l.divide(&r).ok_or_else(|| dimension_overflow(owner))
            }
            UnitExpr::Power(base, n) => self
                .evaluate_dimension(owner, base)?
                .power(*n)
                .ok_or_else(|| dimension_overflow(owner)),
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Find a unit by spelling, then by prefix decomposition (`kW`), then
    /// with a plural `s` removed (`days`, `kilometers`).
    ///
    /// Prefixed units are synthesized, so they come back owned.
    pub fn get(&self, name: &str) -> Option<Cow<'_, UnitDefinition>> {
        if let Some(def) = self.lookup(name) {
            return Some(def);
        }
        let stem = name.strip_suffix('s').filter(|s| !s.is_empty())?;
        self.lookup(stem)
    }

    fn lookup(&self, name: &str) -> Option<Cow<'_, UnitDefinition>> {
        if let Some(&idx) = self.spellings.get(name) {
            return Some(Cow::Borrowed(&self.units[idx]));
        }
        for (spelling, p) in &self.prefix_spellings {
            let rest = match name.strip_prefix(spelling.as_str()) {
                Some(rest) if !rest.is_empty() => rest,
                _ => continue,
            };
            if let Some(&idx) = self.spellings.get(rest) {
                let unit = &self.units[idx];
                if unit.is_affine() {
                    continue;
                }
                return Some(Cow::Owned(self.prefixes[*p].apply(unit)));
            }
        }
        None
    }

    /// As `get`, failing with `UndefinedUnit`
    pub fn definition(&self, name: &str) -> Result<Cow<'_, UnitDefinition>> {
        self.get(name).ok_or_else(|| UnitError::undefined(name))
    }

    /// Check whether a spelling resolves to a unit
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Parse and resolve unit text. Empty text is dimensionless.
    pub fn resolve(&self, text: &str) -> Result<ResolvedUnit> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(ResolvedUnit::dimensionless());
        }
        if let Some(def) = self.get(text) {
            trace!(unit = text, canonical = %def.name, "resolved by name");
            return Ok(ResolvedUnit::from_definition(&def));
        }
        let expr = parse_expression(text)?;
        let resolved = self.resolve_expr(&expr)?;
        trace!(
            unit = text,
            dimension = %resolved.dimension,
            scale = resolved.scale,
            "resolved expression"
        );
        Ok(resolved)
    }

    /// Resolve an already parsed expression
    pub fn resolve_expr(&self, expr: &UnitExpr) -> Result<ResolvedUnit> {
        if let Some(name) = expr.as_unit_ref() {
            let def = self.definition(name)?;
            return Ok(ResolvedUnit::from_definition(&def));
        }
        self.evaluate(expr)
    }

    fn evaluate(&self, expr: &UnitExpr) -> Result<ResolvedUnit> {
        let combined = match expr {
            UnitExpr::UnitRef(name) => {
                let def = self.definition(name)?;
                return Ok(ResolvedUnit::ratio_of(&def));
            }
            UnitExpr::Dimension(name) => return Err(UnitError::undefined(bracketed(name))),
            UnitExpr::Number(value) => return Ok(ResolvedUnit::number(*value)),
            UnitExpr::Product(l, r) => self.evaluate(l)?.multiply(self.evaluate(r)?),
            UnitExpr::Quotient(l, r) => self.evaluate(l)?.divide(self.evaluate(r)?),
            UnitExpr::Power(base, n) => self.evaluate(base)?.power(*n),
        };
        combined.ok_or_else(|| UnitError::overflow(expr.to_string()))
    }

    /// Dimensionality of unit text; anything that fails to resolve
    /// (including empty text) is dimensionless.
    pub fn dimensionality_of(&self, text: &str) -> DimensionVector {
        match self.resolve(text) {
            Ok(resolved) => resolved.dimension,
            Err(e) => {
                trace!(unit = text, error = %e, "dimensionality defaulted to dimensionless");
                DimensionVector::dimensionless()
            }
        }
    }

    /// Pretty text of the reference units for a dimension (`kg·m²/s³`).
    ///
    /// Base dimensions without a reference unit render as their own name.
    pub fn reference_unit(&self, dimension: &DimensionVector) -> String {
        let terms = dimension.iter().map(|(base, exp)| {
            let symbol = self
                .reference_of(base)
                .map(|u| u.display_symbol().to_string())
                .unwrap_or_else(|| base.to_string());
            (symbol, exp)
        });
        format_terms(terms).unwrap_or_else(|| dimension.to_string())
    }
}

/// Dimension, scale and offset of a unit defined by an expression.
/// An explicit offset wins over one inherited from a bare affine unit.
fn scaled(spec: &UnitSpec, resolved: ResolvedUnit) -> (DimensionVector, f64, f64) {
    let offset = if spec.offset != 0.0 {
        spec.offset
    } else {
        resolved.offset
    };
    (resolved.dimension, spec.scale * resolved.scale, offset)
}

fn dimension_overflow(owner: &str) -> UnitError {
    UnitError::invalid_dimension(owner, "exponent out of range")
}

fn bracketed(name: &str) -> String {
    format!("[{}]", name)
}

fn validate_dimension_name(name: &str) -> Result<()> {
    let inner = name
        .strip_prefix('[')
        .and_then(|n| n.strip_suffix(']'))
        .unwrap_or("");
    let valid_first = inner
        .chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_');
    if !valid_first || !inner.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(UnitError::invalid_dimension(
            name,
            "dimension names must be written as [name]",
        ));
    }
    Ok(())
}
