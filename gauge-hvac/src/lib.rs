//! Gauge HVAC - unit conventions for building energy calculations
//!
//! Extends the default registry with the spellings HVAC practitioners use
//! (`in_H2O`, `ton_ref`, `lb_m`), the thermal resistance and conductance
//! dimensions, and airflow/insulation units (`cfm`, `gpm`, `R_IP`, `U_SI`).
//!
//! The free functions work against one shared, lazily built registry and
//! accept scalars or sequences:
//!
//! ```no_run
//! let si = gauge_hvac::fr_u(70.0, "°F")?;          // kelvin
//! let ip = gauge_hvac::to_u(si, "°F")?;
//! assert!((ip - 70.0).abs() < 1e-9);
//! let flows = gauge_hvac::convert(vec![400.0, 800.0], "cfm", "m**3/s")?;
//! # Ok::<(), gauge_core::UnitError>(())
//! ```

use std::sync::LazyLock;

use gauge_core::{DimensionVector, Result};
use gauge_units::{Magnitude, UnitListing, UnitRegistry};
use tracing::debug;

/// `(existing unit, new alias)`
pub const ALIASES: &[(&str, &str)] = &[
    ("inch_H2O_39F", "in_H2O"),
    ("ton_of_refrigeration", "ton_ref"),
    ("pound", "lb_m"),
    ("force_pound", "lb_f"),
];

/// `(name, dimension expression)`
pub const DIMENSIONS: &[(&str, &str)] = &[
    ("[thermal_resistance]", "[area] * [temperature] / [power]"),
    ("[thermal_conductance]", "[power] / ([area] * [temperature])"),
    ("[volumetric_flow_rate]", "[length] ** 3 / [time]"),
];

/// Unit definitions in table syntax
pub const UNITS: &[&str] = &[
    "cubic_feet_per_minute = cu_ft / min = cfm",
    "gallons_per_minute = gallon / min = gpm",
    "thermal_resistance_SI = m**2*K/W = R_value_SI = R_SI",
    "thermal_resistance_IP = ft**2*degR*h/Btu = R_value_IP = R_IP",
    "thermal_conductance_SI = W/(m**2*K) = U_factor_SI = U_SI",
    "thermal_conductance_IP = Btu/(ft**2*degR*h) = U_factor_IP = U_IP",
];

/// Add the HVAC aliases, dimensions and units to a registry
pub fn extend(registry: &mut UnitRegistry) -> Result<()> {
    for (unit, alias) in ALIASES {
        registry.define_alias(unit, alias)?;
    }
    for (name, expression) in DIMENSIONS {
        registry.define_dimension(name, expression)?;
    }
    for line in UNITS {
        registry.define(line)?;
    }
    debug!(
        aliases = ALIASES.len(),
        dimensions = DIMENSIONS.len(),
        units = UNITS.len(),
        "HVAC units registered"
    );
    Ok(())
}

/// Default registry plus the HVAC extensions
pub fn hvac_registry() -> Result<UnitRegistry> {
    let mut registry = UnitRegistry::new()?;
    extend(&mut registry)?;
    Ok(registry)
}

static REGISTRY: LazyLock<Result<UnitRegistry>> = LazyLock::new(hvac_registry);

/// Shared HVAC registry, built on first use.
///
/// A failed build is kept and returned to every caller.
pub fn registry() -> Result<&'static UnitRegistry> {
    REGISTRY.as_ref().map_err(Clone::clone)
}

/// Convert from the given units to SI reference units
pub fn fr_u<M: Magnitude>(value: M, from_units: &str) -> Result<M::Output> {
    registry()?.to_base(value, from_units)
}

/// Convert from SI reference units to the given units
pub fn to_u<M: Magnitude>(value: M, to_units: &str) -> Result<M::Output> {
    registry()?.from_base(value, to_units)
}

/// Convert between any two units of the same dimension
pub fn convert<M: Magnitude>(value: M, from_units: &str, to_units: &str) -> Result<M::Output> {
    registry()?.convert(value, from_units, to_units)
}

/// Dimensionality of unit text; unknown or malformed text is dimensionless
pub fn get_dimensionality(units: &str) -> DimensionVector {
    match registry() {
        Ok(registry) => registry.dimensionality_of(units),
        Err(_) => DimensionVector::dimensionless(),
    }
}

/// Pretty unit text (`m**2*K/W` -> `K·m²/W`)
pub fn format_units(units: &str) -> Result<String> {
    registry()?.format_units(units)
}

/// Every known unit grouped by dimensionality
pub fn get_unit_list() -> Result<UnitListing> {
    Ok(registry()?.list_units())
}
