//! Unit and prefix definitions

use gauge_core::DimensionVector;
use serde::{Deserialize, Serialize};

use crate::ast::UnitExpr;

/// A registered unit: how one unit of it relates to the reference units of
/// its dimension.
///
/// `value_in_reference = value * scale + offset`. Only affine units such as
/// degree Celsius carry a non-zero offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Canonical name (e.g., "inch", "degree_Fahrenheit")
    pub name: String,
    /// Display symbol (e.g., "in", "°F"); `None` renders the canonical name
    pub symbol: Option<String>,
    /// Additional spellings accepted on lookup
    pub aliases: Vec<String>,
    /// The dimensional signature
    pub dimension: DimensionVector,
    /// Value of one unit in reference units
    pub scale: f64,
    /// Affine shift in reference units
    pub offset: f64,
}

impl UnitDefinition {
    pub fn new(name: impl Into<String>, dimension: DimensionVector, scale: f64) -> Self {
        UnitDefinition {
            name: name.into(),
            symbol: None,
            aliases: Vec::new(),
            dimension,
            scale,
            offset: 0.0,
        }
    }

    /// Check if this unit has an offset (non-proportional conversion)
    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }

    /// Check if this is the reference unit of its dimension
    pub fn is_reference(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }

    /// Check if two units are dimensionally compatible (can be converted)
    pub fn is_compatible(&self, other: &UnitDefinition) -> bool {
        self.dimension == other.dimension
    }

    /// Same dimension, scale and offset; spellings may differ
    pub fn same_quantity(&self, other: &UnitDefinition) -> bool {
        self.dimension == other.dimension && self.scale == other.scale && self.offset == other.offset
    }

    /// Convert a value in this unit to reference units
    pub fn to_base(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// Convert a value in reference units to this unit
    pub fn from_base(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }

    /// Text used when rendering this unit
    pub fn display_symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.name)
    }

    /// Name, symbol and aliases, in that order
    pub fn spellings(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.name.as_str())
            .chain(self.symbol.as_deref())
            .chain(self.aliases.iter().map(String::as_str))
    }
}

/// What a new unit is defined in terms of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitBody {
    /// Dimension expression (`[length] ** 3 / [time]`) with an explicit scale
    Dimension(String),
    /// Unit expression evaluated against the registry (`cu_ft / min`)
    Expression(String),
    /// Already parsed unit expression
    Parsed(UnitExpr),
}

/// Request to register a unit, consumed by `UnitRegistry::define_unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    pub body: UnitBody,
    /// Multiplies the body's own scale
    pub scale: f64,
    pub offset: f64,
    pub symbol: Option<String>,
    pub aliases: Vec<String>,
}

impl UnitSpec {
    /// A unit given directly by its dimensionality and scale
    pub fn new(name: impl Into<String>, dimension: impl Into<String>, scale: f64) -> Self {
        UnitSpec {
            name: name.into(),
            body: UnitBody::Dimension(dimension.into()),
            scale,
            offset: 0.0,
            symbol: None,
            aliases: Vec::new(),
        }
    }

    /// A unit defined as an expression of existing units
    pub fn derived(name: impl Into<String>, expression: impl Into<String>) -> Self {
        UnitSpec {
            name: name.into(),
            body: UnitBody::Expression(expression.into()),
            scale: 1.0,
            offset: 0.0,
            symbol: None,
            aliases: Vec::new(),
        }
    }

    /// A unit defined by a parsed expression
    pub fn parsed(name: impl Into<String>, expression: UnitExpr) -> Self {
        UnitSpec {
            body: UnitBody::Parsed(expression),
            ..UnitSpec::derived(name, "")
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Name, symbol and aliases, in that order
    pub fn spellings(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.name.as_str())
            .chain(self.symbol.as_deref())
            .chain(self.aliases.iter().map(String::as_str))
    }
}

/// Multiplicative prefix such as `kilo-` / `k-`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    pub name: String,
    pub symbol: Option<String>,
    pub aliases: Vec<String>,
    pub factor: f64,
}

impl Prefix {
    pub fn new(name: impl Into<String>, factor: f64) -> Self {
        Prefix {
            name: name.into(),
            symbol: None,
            aliases: Vec::new(),
            factor,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn spellings(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.name.as_str())
            .chain(self.symbol.as_deref())
            .chain(self.aliases.iter().map(String::as_str))
    }

    /// Synthesize the definition of `unit` carrying this prefix.
    ///
    /// The symbol is the prefix symbol followed by the unit symbol, falling
    /// back to names on either side; `None` when neither side has a symbol.
    pub fn apply(&self, unit: &UnitDefinition) -> UnitDefinition {
        let symbol = match (&self.symbol, &unit.symbol) {
            (None, None) => None,
            (p, u) => Some(format!(
                "{}{}",
                p.as_deref().unwrap_or(&self.name),
                u.as_deref().unwrap_or(&unit.name)
            )),
        };
        UnitDefinition {
            name: format!("{}{}", self.name, unit.name),
            symbol,
            aliases: Vec::new(),
            dimension: unit.dimension.clone(),
            scale: self.factor * unit.scale,
            offset: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::dimension::{LENGTH, TEMPERATURE};

    fn meter() -> UnitDefinition {
        let mut m = UnitDefinition::new("meter", DimensionVector::base(LENGTH), 1.0);
        m.symbol = Some("m".to_string());
        m.aliases.push("metre".to_string());
        m
    }

    fn celsius() -> UnitDefinition {
        let mut c = UnitDefinition::new("degree_Celsius", DimensionVector::base(TEMPERATURE), 1.0);
        c.offset = 273.15;
        c.symbol = Some("°C".to_string());
        c
    }

    #[test]
    fn test_affine_conversion() {
        let c = celsius();
        assert!(c.is_affine());
        assert!((c.to_base(100.0) - 373.15).abs() < 1e-12);
        assert!((c.from_base(273.15)).abs() < 1e-12);
    }

    #[test]
    fn test_reference_unit() {
        assert!(meter().is_reference());
        assert!(!celsius().is_reference());
    }

    #[test]
    fn test_spellings_order() {
        let unit = meter();
        let spellings: Vec<&str> = unit.spellings().collect();
        assert_eq!(spellings, vec!["meter", "m", "metre"]);
    }

    #[test]
    fn test_display_symbol_falls_back_to_name() {
        let unit = UnitDefinition::new("inch_H2O_39F", DimensionVector::base(LENGTH), 1.0);
        assert_eq!(unit.display_symbol(), "inch_H2O_39F");
        assert_eq!(meter().display_symbol(), "m");
    }

    #[test]
    fn test_prefix_apply() {
        let centi = Prefix::new("centi", 1e-2).with_symbol("c");
        let cm = centi.apply(&meter());
        assert_eq!(cm.name, "centimeter");
        assert_eq!(cm.symbol.as_deref(), Some("cm"));
        assert!((cm.scale - 0.01).abs() < 1e-15);
        assert!(cm.is_compatible(&meter()));
    }

    #[test]
    fn test_prefix_apply_without_symbols() {
        let prefix = Prefix::new("kibi", 1024.0);
        let bit = UnitDefinition::new("bit", DimensionVector::dimensionless(), 1.0);
        assert_eq!(prefix.apply(&bit).symbol, None);
    }

    #[test]
    fn test_spec_builder() {
        let spec = UnitSpec::derived("cubic_feet_per_minute", "cu_ft / min")
            .with_symbol("cfm")
            .with_alias("CFM");
        let spellings: Vec<&str> = spec.spellings().collect();
        assert_eq!(spellings, vec!["cubic_feet_per_minute", "cfm", "CFM"]);
        assert_eq!(spec.body, UnitBody::Expression("cu_ft / min".to_string()));
    }
}
