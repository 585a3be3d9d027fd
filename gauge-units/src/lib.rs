//! Gauge Units - Dimensional unit registry and conversion
//!
//! Parses unit expressions (`kg*m/s**2`, `ft²`, `°F`), resolves them against a
//! registry of units with dimension vectors, converts magnitudes between
//! compatible units (including affine temperature scales) and renders unit
//! text with Unicode exponents.
//!
//! ```no_run
//! use gauge_units::UnitRegistry;
//!
//! let units = UnitRegistry::new()?;
//! let celsius = units.convert(212.0, "°F", "°C")?;
//! assert!((celsius - 100.0).abs() < 1e-9);
//! assert_eq!(units.format_units("m**2*K/W")?, "K·m²/W");
//! # Ok::<(), gauge_units::UnitError>(())
//! ```

pub mod ast;
pub mod bootstrap;
mod convert;
mod definition;
mod format;
mod listing;
pub mod parser;
mod quantity;
mod registry;
mod resolved;

pub use ast::UnitExpr;
pub use bootstrap::{default_patches, Bootstrap, BootstrapConfig, Definition, Patch};
pub use convert::{Conversion, Magnitude};
pub use definition::{Prefix, UnitBody, UnitDefinition, UnitSpec};
pub use format::{format_terms, superscript, Formatter};
pub use listing::{DimensionGroup, UnitEntry, UnitListing, DIMENSIONLESS_KEY};
pub use parser::parse_expression;
pub use quantity::Quantity;
pub use registry::{DimensionDecl, UnitRegistry};
pub use resolved::ResolvedUnit;

pub use gauge_core::{DimensionVector, Exponent, Result, UnitError};

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::dimension::{LENGTH, MASS, TEMPERATURE, TIME};

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = 1e-9 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {} but got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_default_registry_loads() {
        let units = UnitRegistry::new().unwrap();
        assert!(units.len() > 80);
        assert!(units.prefixes().count() >= 20);
        assert!(units.dimension("[power]").is_some());
    }

    #[test]
    fn test_reference_units() {
        let units = UnitRegistry::new().unwrap();
        assert_eq!(units.reference_of(LENGTH).unwrap().name, "meter");
        assert_eq!(units.reference_of(MASS).unwrap().name, "kilogram");
        assert_eq!(units.reference_of(TIME).unwrap().name, "second");
        assert_eq!(units.reference_of(TEMPERATURE).unwrap().name, "kelvin");
    }

    #[test]
    fn test_h_is_hour() {
        let units = UnitRegistry::new().unwrap();
        assert_eq!(units.get("h").unwrap().name, "hour");
        assert_eq!(units.dimensionality_of("h"), units.dimensionality_of("s"));
        assert_eq!(
            units.dimensionality_of("hbar"),
            units.dimensionality_of("planck_constant")
        );
        assert!(units.get("planck_constant").unwrap().symbol.is_none());
    }

    #[test]
    fn test_unpatched_h_is_planck_constant() {
        let units = Bootstrap::new().without_patches().load().unwrap();
        assert_eq!(units.get("h").unwrap().name, "planck_constant");
        assert_ne!(units.dimensionality_of("h"), units.dimensionality_of("s"));
    }

    #[test]
    fn test_without_constants() {
        let config = BootstrapConfig {
            load_constants: false,
            ..BootstrapConfig::default()
        };
        let units = Bootstrap::from_config(&config).load().unwrap();
        assert!(units.get("planck_constant").is_none());
        assert!(units.get("lbf").is_some());
    }

    #[test]
    fn test_common_conversions() {
        let units = UnitRegistry::new().unwrap();
        assert_close(units.to_base(1.0, "in").unwrap(), 0.0254);
        assert_close(units.to_base(1.0, "lb").unwrap(), 0.45359237);
        assert_close(units.convert(1.0, "gal", "L").unwrap(), 3.785411784);
        assert_close(units.convert(1.0, "kWh", "J").unwrap(), 3.6e6);
        assert_close(units.convert(1.0, "atm", "psi").unwrap(), 14.695948775513449);
        assert_close(units.convert(90.0, "deg", "rad").unwrap(), std::f64::consts::FRAC_PI_2);
        assert_close(units.convert(1.0, "RT", "W").unwrap(), 3516.8528420666666);
    }

    #[test]
    fn test_listing_of_default_registry() {
        let units = UnitRegistry::new().unwrap();
        let listing = units.list_units();
        let power = listing.get("[length] ** 2 * [mass] / [time] ** 3").unwrap();
        assert!(power.aliases.contains(&"[power]".to_string()));
        assert!(power.units.iter().any(|u| u.name == "watt"));
        assert_eq!(listing.iter().next().unwrap().dimensionality, DIMENSIONLESS_KEY);
    }
}
