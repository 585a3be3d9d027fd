//! Loading unit definition tables
//!
//! Tables are line oriented, one definition per line:
//!
//! ```text
//! meter = [length] = m = metre            # base unit
//! inch = 0.0254 * meter = in              # derived unit
//! degree_Celsius = kelvin; offset: 273.15 = °C = degC
//! kilo- = 1e3 = k-                        # prefix
//! [area] = [length] ** 2                  # derived dimension
//! @alias meter = meters_alias
//! @import constants_en.txt
//! ```
//!
//! `_` in the symbol slot means the unit has no symbol. Definitions may
//! refer to units defined further down; the loader retries them until no
//! more progress is made.

use std::collections::HashSet;

use gauge_core::{Result, UnitError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ast::UnitExpr;
use crate::definition::{Prefix, UnitSpec};
use crate::parser::parse_expression;
use crate::registry::UnitRegistry;

pub const DEFAULT_TABLE: &str = "default_en.txt";
pub const CONSTANTS_TABLE: &str = "constants_en.txt";

/// Tables compiled into the crate
pub const BUNDLED_TABLES: &[(&str, &str)] = &[
    (DEFAULT_TABLE, include_str!("../data/default_en.txt")),
    (CONSTANTS_TABLE, include_str!("../data/constants_en.txt")),
];

/// Right-hand side of a unit definition
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionBody {
    /// Dimension text of a base or dimension-scaled unit (`[length]`, `[]`)
    Dimension(String),
    Expression(UnitExpr),
}

/// One parsed table line
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Unit {
        name: String,
        body: DefinitionBody,
        offset: Option<UnitExpr>,
        symbol: Option<String>,
        aliases: Vec<String>,
    },
    Prefix {
        name: String,
        factor: UnitExpr,
        symbol: Option<String>,
        aliases: Vec<String>,
    },
    Dimension {
        name: String,
        expression: String,
    },
    Alias {
        unit: String,
        aliases: Vec<String>,
    },
    Import(String),
}

impl Definition {
    /// Parse one line. Blank lines and comments yield `Ok(None)`; errors are
    /// reported as a plain reason for the caller to place.
    pub fn parse(line: &str) -> std::result::Result<Option<Definition>, String> {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();
        if line.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = line.strip_prefix("@import") {
            let file = rest.trim();
            if file.is_empty() {
                return Err("missing file name after @import".to_string());
            }
            return Ok(Some(Definition::Import(file.to_string())));
        }
        if let Some(rest) = line.strip_prefix("@alias") {
            let mut parts = split_equals(rest);
            if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
                return Err("expected '@alias unit = alias [= alias...]'".to_string());
            }
            let unit = parts.remove(0);
            return Ok(Some(Definition::Alias { unit, aliases: parts }));
        }
        if line.starts_with('@') {
            return Err(format!("unsupported directive '{}'", line));
        }

        let parts = split_equals(line);
        if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err("expected 'name = definition'".to_string());
        }
        let name = &parts[0];

        if name.starts_with('[') {
            if parts.len() > 2 {
                return Err("dimension declarations take a single expression".to_string());
            }
            return Ok(Some(Definition::Dimension {
                name: name.clone(),
                expression: parts[1].clone(),
            }));
        }

        if let Some(prefix) = name.strip_suffix('-') {
            let factor = parse_expression(&parts[1]).map_err(|e| e.to_string())?;
            let mut spellings = parts[2..].iter().map(|p| p.trim_end_matches('-').to_string());
            let symbol = spellings.next().filter(|s| s != "_" && !s.is_empty());
            return Ok(Some(Definition::Prefix {
                name: prefix.to_string(),
                factor,
                symbol,
                aliases: spellings.filter(|s| !s.is_empty()).collect(),
            }));
        }

        let (body_text, offset_text) = match parts[1].split_once(';') {
            Some((body, modifier)) => {
                let value = modifier
                    .trim()
                    .strip_prefix("offset:")
                    .ok_or_else(|| format!("unknown modifier '{}'", modifier.trim()))?;
                (body.trim(), Some(value.trim()))
            }
            None => (parts[1].as_str(), None),
        };
        let body = if body_text.starts_with('[') {
            DefinitionBody::Dimension(body_text.to_string())
        } else {
            DefinitionBody::Expression(parse_expression(body_text).map_err(|e| e.to_string())?)
        };
        let offset = offset_text
            .map(|text| parse_expression(text).map_err(|e| e.to_string()))
            .transpose()?;
        let symbol = parts
            .get(2)
            .filter(|s| !s.is_empty() && s.as_str() != "_")
            .cloned();
        let aliases = parts.iter().skip(3).filter(|s| !s.is_empty()).cloned().collect();

        Ok(Some(Definition::Unit {
            name: name.clone(),
            body,
            offset,
            symbol,
            aliases,
        }))
    }

    /// Register this definition
    pub fn apply(&self, registry: &mut UnitRegistry) -> Result<()> {
        match self {
            Definition::Unit {
                name,
                body,
                offset,
                symbol,
                aliases,
            } => {
                let mut spec = match body {
                    DefinitionBody::Dimension(text) => UnitSpec::new(name.clone(), text.clone(), 1.0),
                    DefinitionBody::Expression(expr) => UnitSpec::parsed(name.clone(), expr.clone()),
                };
                if let Some(offset) = offset {
                    spec.offset = number_value(registry, offset)?;
                }
                spec.symbol = symbol.clone();
                spec.aliases = aliases.clone();
                registry.define_unit(spec)
            }
            Definition::Prefix {
                name,
                factor,
                symbol,
                aliases,
            } => {
                let mut prefix = Prefix::new(name.clone(), number_value(registry, factor)?);
                prefix.symbol = symbol.clone();
                prefix.aliases = aliases.clone();
                registry.define_prefix(prefix)
            }
            Definition::Dimension { name, expression } => registry.define_dimension(name, expression),
            Definition::Alias { unit, aliases } => {
                for alias in aliases {
                    registry.define_alias(unit, alias)?;
                }
                Ok(())
            }
            Definition::Import(file) => Err(UnitError::syntax(
                format!("@import {}", file),
                0,
                "@import",
                "imports are only resolved while loading tables",
            )),
        }
    }
}

fn split_equals(text: &str) -> Vec<String> {
    text.split('=').map(|p| p.trim().to_string()).collect()
}

/// Value of a dimensionless numeric expression such as `pi / 180`
fn number_value(registry: &UnitRegistry, expr: &UnitExpr) -> Result<f64> {
    let resolved = registry.resolve_expr(expr)?;
    if !resolved.is_dimensionless() {
        return Err(UnitError::invalid_dimension(
            expr.to_string(),
            format!("expected a dimensionless number, found {}", resolved.dimension),
        ));
    }
    Ok(resolved.scale)
}

/// A structured override applied to parsed definitions before they are
/// registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "patch", rename_all = "snake_case")]
pub enum Patch {
    /// Remove a symbol (or alias) from a unit
    DropSymbol { unit: String, symbol: String },
    /// Rewrite references to one unit name inside unit expressions
    RenameReference { from: String, to: String },
    /// Give a unit one more alias
    AddAlias { unit: String, alias: String },
}

impl Patch {
    pub fn apply(&self, definition: &mut Definition) {
        let Definition::Unit {
            name,
            body,
            offset,
            symbol,
            aliases,
        } = definition
        else {
            return;
        };
        match self {
            Patch::DropSymbol { unit, symbol: dropped } if *unit == *name => {
                if symbol.as_ref() == Some(dropped) {
                    *symbol = None;
                }
                aliases.retain(|a| a != dropped);
            }
            Patch::RenameReference { from, to } => {
                if let DefinitionBody::Expression(expr) = body {
                    expr.rename_refs(from, to);
                }
                if let Some(expr) = offset {
                    expr.rename_refs(from, to);
                }
            }
            Patch::AddAlias { unit, alias } if *unit == *name => {
                if symbol.as_ref() != Some(alias) && !aliases.contains(alias) {
                    aliases.push(alias.clone());
                }
            }
            _ => {}
        }
    }
}

/// The standard overrides: `h` means hour, and Planck's constant is only
/// reachable as `planck_constant`.
pub fn default_patches() -> Vec<Patch> {
    vec![
        Patch::DropSymbol {
            unit: "planck_constant".to_string(),
            symbol: "h".to_string(),
        },
        Patch::RenameReference {
            from: "h".to_string(),
            to: "planck_constant".to_string(),
        },
        Patch::AddAlias {
            unit: "hour".to_string(),
            alias: "h".to_string(),
        },
    ]
}

/// Which tables to load and which patches to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Tables loaded in order, by bundled name
    pub tables: Vec<String>,
    pub patches: Vec<Patch>,
    /// Follow `@import` of the physical constants table
    pub load_constants: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            tables: vec![DEFAULT_TABLE.to_string()],
            patches: default_patches(),
            load_constants: true,
        }
    }
}

/// A definition with the place it came from
#[derive(Debug, Clone)]
struct Located {
    source: String,
    line: usize,
    text: String,
    definition: Definition,
}

impl Located {
    fn fail(&self, reason: impl Into<String>) -> UnitError {
        UnitError::MalformedDefinition {
            source_name: self.source.clone(),
            line: self.line,
            text: self.text.clone(),
            reason: reason.into(),
        }
    }
}

/// Builds a registry from definition tables
#[derive(Debug, Clone)]
pub struct Bootstrap {
    /// Tables available to load or import
    available: Vec<(String, String)>,
    /// Tables loaded, in order
    tables: Vec<String>,
    patches: Vec<Patch>,
    skip_imports: Vec<String>,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrap {
    /// Bundled default table with the default patches
    pub fn new() -> Self {
        Self::from_config(&BootstrapConfig::default())
    }

    /// No tables and no patches; bundled tables stay importable
    pub fn empty() -> Self {
        Bootstrap {
            available: bundled(),
            tables: Vec::new(),
            patches: Vec::new(),
            skip_imports: Vec::new(),
        }
    }

    pub fn from_config(config: &BootstrapConfig) -> Self {
        Bootstrap {
            available: bundled(),
            tables: config.tables.clone(),
            patches: config.patches.clone(),
            skip_imports: if config.load_constants {
                Vec::new()
            } else {
                vec![CONSTANTS_TABLE.to_string()]
            },
        }
    }

    /// Add a table and load it after the ones already configured
    pub fn with_source(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        self.available.retain(|(n, _)| *n != name);
        self.available.push((name.clone(), text.into()));
        self.tables.push(name);
        self
    }

    pub fn with_patch(mut self, patch: Patch) -> Self {
        self.patches.push(patch);
        self
    }

    pub fn without_patches(mut self) -> Self {
        self.patches.clear();
        self
    }

    /// Build a fresh registry
    pub fn load(&self) -> Result<UnitRegistry> {
        let mut registry = UnitRegistry::empty();
        self.load_into(&mut registry)?;
        Ok(registry)
    }

    /// Load every configured table into `registry`; returns the number of
    /// definitions applied.
    pub fn load_into(&self, registry: &mut UnitRegistry) -> Result<usize> {
        let mut pending = Vec::new();
        for table in &self.tables {
            let mut stack = HashSet::new();
            self.collect(table, None, &mut stack, &mut pending)?;
        }
        for located in &mut pending {
            for patch in &self.patches {
                patch.apply(&mut located.definition);
            }
        }

        let total = pending.len();
        let mut passes = 0;
        while !pending.is_empty() {
            passes += 1;
            let before = pending.len();
            let mut deferred = Vec::new();
            let mut last_error = None;
            for located in pending {
                match located.definition.apply(registry) {
                    Ok(()) => {}
                    Err(e) if is_deferrable(&e) => {
                        last_error.get_or_insert_with(|| (located.clone(), e));
                        deferred.push(located);
                    }
                    Err(e) => return Err(located.fail(e.to_string())),
                }
            }
            if deferred.len() == before {
                if let Some((located, e)) = last_error {
                    return Err(located.fail(e.to_string()));
                }
            }
            pending = deferred;
        }

        info!(
            definitions = total,
            units = registry.len(),
            prefixes = registry.prefixes().count(),
            dimensions = registry.dimensions().count(),
            passes,
            "unit registry loaded"
        );
        Ok(total)
    }

    fn source(&self, name: &str) -> Option<&str> {
        self.available
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
    }

    /// Parse a table, inlining imports depth first
    fn collect(
        &self,
        name: &str,
        importer: Option<&Located>,
        stack: &mut HashSet<String>,
        out: &mut Vec<Located>,
    ) -> Result<()> {
        let missing = |reason: String| match importer {
            Some(located) => located.fail(reason),
            None => UnitError::MalformedDefinition {
                source_name: name.to_string(),
                line: 0,
                text: String::new(),
                reason,
            },
        };
        let text = self
            .source(name)
            .ok_or_else(|| missing(format!("no definition table named '{}'", name)))?;
        if !stack.insert(name.to_string()) {
            return Err(missing(format!("circular import of '{}'", name)));
        }
        debug!(table = name, "loading definition table");

        for (i, raw) in text.lines().enumerate() {
            let parsed = Definition::parse(raw).map_err(|reason| UnitError::MalformedDefinition {
                source_name: name.to_string(),
                line: i + 1,
                text: raw.trim().to_string(),
                reason,
            })?;
            let Some(definition) = parsed else {
                continue;
            };
            let located = Located {
                source: name.to_string(),
                line: i + 1,
                text: raw.trim().to_string(),
                definition,
            };
            if let Definition::Import(file) = &located.definition {
                if self.skip_imports.contains(file) {
                    debug!(table = %file, "import skipped");
                } else {
                    self.collect(file, Some(&located), stack, out)?;
                }
                continue;
            }
            out.push(located);
        }
        stack.remove(name);
        Ok(())
    }
}

fn bundled() -> Vec<(String, String)> {
    BUNDLED_TABLES
        .iter()
        .map(|(name, text)| (name.to_string(), text.to_string()))
        .collect()
}

/// Errors a later definition in the same load may fix
fn is_deferrable(e: &UnitError) -> bool {
    matches!(
        e,
        UnitError::UndefinedUnit { .. }
            | UnitError::UnknownUnit { .. }
            | UnitError::InvalidDimensionDeclaration { .. }
    )
}

impl UnitRegistry {
    /// Register one definition line using the table grammar
    pub fn define(&mut self, line: &str) -> Result<()> {
        let parsed = Definition::parse(line).map_err(|reason| UnitError::MalformedDefinition {
            source_name: "<define>".to_string(),
            line: 1,
            text: line.trim().to_string(),
            reason,
        })?;
        match parsed {
            Some(definition) => definition.apply(self),
            None => Ok(()),
        }
    }
}
