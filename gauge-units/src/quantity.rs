//! Quantity: a magnitude paired with unit text

use std::fmt;

use gauge_core::Result;
use serde::{Deserialize, Serialize};

use crate::registry::UnitRegistry;

/// A value with units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub magnitude: f64,
    /// Unit text as the registry formats it; empty when dimensionless
    pub unit: String,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: impl Into<String>) -> Self {
        Quantity {
            magnitude,
            unit: unit.into(),
        }
    }

    /// Convert to another unit of the same dimension
    pub fn convert_to(&self, registry: &UnitRegistry, target: &str) -> Result<Quantity> {
        registry.convert_quantity(self.magnitude, &self.unit, target)
    }

    /// Convert to reference units
    pub fn to_base(&self, registry: &UnitRegistry) -> Result<Quantity> {
        registry.to_base_quantity(self.magnitude, &self.unit)
    }

    pub fn is_compatible(&self, registry: &UnitRegistry, other: &Quantity) -> bool {
        registry.is_compatible(&self.unit, &other.unit)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.unit)
        }
    }
}
