//! Conversion between units
//!
//! Values go through reference units: `to.from_base(from.to_base(v))`.
//! Dimensions are compared before any arithmetic happens, so an
//! incompatible request never produces a number.

use gauge_core::{Result, UnitError};

use crate::quantity::Quantity;
use crate::registry::UnitRegistry;
use crate::resolved::ResolvedUnit;

/// A value, or a sequence of values, that can be converted.
///
/// `f64` produces `f64`; `Vec` and slices produce `Vec<f64>`; arrays keep
/// their length. Order is always preserved.
pub trait Magnitude {
    type Output;

    fn map_magnitude<F: FnMut(f64) -> f64>(self, f: F) -> Self::Output;
}

impl Magnitude for f64 {
    type Output = f64;

    fn map_magnitude<F: FnMut(f64) -> f64>(self, mut f: F) -> f64 {
        f(self)
    }
}

impl Magnitude for Vec<f64> {
    type Output = Vec<f64>;

    fn map_magnitude<F: FnMut(f64) -> f64>(self, f: F) -> Vec<f64> {
        self.into_iter().map(f).collect()
    }
}

impl Magnitude for &[f64] {
    type Output = Vec<f64>;

    fn map_magnitude<F: FnMut(f64) -> f64>(self, f: F) -> Vec<f64> {
        self.iter().copied().map(f).collect()
    }
}

impl<const N: usize> Magnitude for [f64; N] {
    type Output = [f64; N];

    fn map_magnitude<F: FnMut(f64) -> f64>(self, f: F) -> [f64; N] {
        self.map(f)
    }
}

/// A checked conversion between two resolved units
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub from: ResolvedUnit,
    pub to: ResolvedUnit,
}

impl Conversion {
    pub fn apply(&self, value: f64) -> f64 {
        self.to.from_base(self.from.to_base(value))
    }
}

/// A unit whose scale is zero or not finite has no inverse
fn convertible(text: &str, unit: ResolvedUnit) -> Result<ResolvedUnit> {
    if unit.scale == 0.0 || !unit.scale.is_finite() {
        return Err(UnitError::DegenerateUnit {
            unit: text.to_string(),
            scale: unit.scale,
        });
    }
    Ok(unit)
}

impl UnitRegistry {
    fn resolve_convertible(&self, text: &str) -> Result<ResolvedUnit> {
        convertible(text, self.resolve(text)?)
    }

    /// Resolve both sides and check that their dimensions match
    pub fn conversion(&self, from: &str, to: &str) -> Result<Conversion> {
        let from = self.resolve_convertible(from)?;
        let to = self.resolve_convertible(to)?;
        if from.dimension != to.dimension {
            return Err(UnitError::IncompatibleDimensions {
                from: from.canonical_text(),
                from_dim: from.dimension,
                to: to.canonical_text(),
                to_dim: to.dimension,
            });
        }
        Ok(Conversion { from, to })
    }

    /// Convert values between two units of the same dimension
    pub fn convert<M: Magnitude>(&self, values: M, from: &str, to: &str) -> Result<M::Output> {
        let conversion = self.conversion(from, to)?;
        Ok(values.map_magnitude(|v| conversion.apply(v)))
    }

    /// Convert values to reference units (`in` -> `m`, `°F` -> `K`)
    pub fn to_base<M: Magnitude>(&self, values: M, from: &str) -> Result<M::Output> {
        let unit = self.resolve_convertible(from)?;
        Ok(values.map_magnitude(|v| unit.to_base(v)))
    }

    /// Convert values in reference units to the given unit
    pub fn from_base<M: Magnitude>(&self, values: M, to: &str) -> Result<M::Output> {
        let unit = self.resolve_convertible(to)?;
        Ok(values.map_magnitude(|v| unit.from_base(v)))
    }

    /// Convert to reference units, keeping the reference unit text
    pub fn to_base_quantity(&self, value: f64, from: &str) -> Result<Quantity> {
        let unit = self.resolve_convertible(from)?;
        Ok(Quantity::new(
            unit.to_base(value),
            self.reference_unit(&unit.dimension),
        ))
    }

    pub fn convert_quantity(&self, value: f64, from: &str, to: &str) -> Result<Quantity> {
        let conversion = self.conversion(from, to)?;
        Ok(Quantity::new(conversion.apply(value), self.format_units(to)?))
    }

    /// Both texts resolve and have the same dimension
    pub fn is_compatible(&self, a: &str, b: &str) -> bool {
        match (self.resolve(a), self.resolve(b)) {
            (Ok(a), Ok(b)) => a.dimension == b.dimension,
            _ => false,
        }
    }
}
