//! Fully resolved unit expressions

use gauge_core::dimension::{checked_add, checked_mul, checked_neg, exponent_to_f64, format_exponent};
use gauge_core::{Combine, DimensionVector, Exponent};
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::definition::UnitDefinition;

/// A unit expression reduced to its dimension and its composite conversion
/// to reference units.
///
/// `offset` is non-zero only when the expression was a single affine unit
/// such as `°F`. Any compound containing an affine unit is treated as a
/// temperature difference and converts by scale alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedUnit {
    pub dimension: DimensionVector,
    pub scale: f64,
    pub offset: f64,
    /// Canonical unit names with their exponents, in first-appearance order
    pub terms: Vec<(String, Exponent)>,
}

impl ResolvedUnit {
    pub fn dimensionless() -> Self {
        ResolvedUnit {
            dimension: DimensionVector::dimensionless(),
            scale: 1.0,
            offset: 0.0,
            terms: Vec::new(),
        }
    }

    /// A pure numeric factor
    pub fn number(value: f64) -> Self {
        ResolvedUnit {
            scale: value,
            ..ResolvedUnit::dimensionless()
        }
    }

    /// A bare unit reference, offset included
    pub fn from_definition(def: &UnitDefinition) -> Self {
        ResolvedUnit {
            dimension: def.dimension.clone(),
            scale: def.scale,
            offset: def.offset,
            terms: vec![(def.name.clone(), Exponent::one())],
        }
    }

    /// A unit reference inside a compound: scale only
    pub fn ratio_of(def: &UnitDefinition) -> Self {
        ResolvedUnit {
            offset: 0.0,
            ..ResolvedUnit::from_definition(def)
        }
    }

    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    pub fn to_base(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    pub fn from_base(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }

    /// Product of two units; `None` when an exponent overflows
    pub fn multiply(self, other: ResolvedUnit) -> Option<ResolvedUnit> {
        self.merge(other, Combine::Multiply)
    }

    pub fn divide(self, other: ResolvedUnit) -> Option<ResolvedUnit> {
        self.merge(other, Combine::Divide)
    }

    fn merge(mut self, other: ResolvedUnit, op: Combine) -> Option<ResolvedUnit> {
        self.dimension = self.dimension.combine(&other.dimension, op)?;
        self.scale = match op {
            Combine::Multiply => self.scale * other.scale,
            Combine::Divide => self.scale / other.scale,
        };
        self.offset = 0.0;
        for (name, exp) in other.terms {
            let exp = match op {
                Combine::Multiply => exp,
                Combine::Divide => checked_neg(exp)?,
            };
            add_term(&mut self.terms, name, exp)?;
        }
        Some(self)
    }

    pub fn power(self, n: Exponent) -> Option<ResolvedUnit> {
        let scale = if n.is_integer() {
            match i32::try_from(n.to_integer()) {
                Ok(i) => self.scale.powi(i),
                Err(_) => self.scale.powf(exponent_to_f64(n)),
            }
        } else {
            self.scale.powf(exponent_to_f64(n))
        };
        let mut terms = Vec::with_capacity(self.terms.len());
        for (name, exp) in self.terms {
            let exp = checked_mul(exp, n)?;
            if !exp.is_zero() {
                terms.push((name, exp));
            }
        }
        Some(ResolvedUnit {
            dimension: self.dimension.power(n)?,
            scale,
            offset: 0.0,
            terms,
        })
    }

    /// Canonical long-form text: `inch`, `meter / second ** 2`.
    ///
    /// Used in error messages, where unit spellings are normalized.
    pub fn canonical_text(&self) -> String {
        if self.terms.is_empty() {
            return "dimensionless".to_string();
        }
        let render = |name: &str, exp: Exponent| {
            if exp.is_one() {
                name.to_string()
            } else {
                format!("{} ** {}", name, format_exponent(exp))
            }
        };
        let numerator: Vec<String> = self
            .terms
            .iter()
            .filter(|(_, e)| e.is_positive())
            .map(|(n, e)| render(n, *e))
            .collect();
        let denominator: Vec<String> = self
            .terms
            .iter()
            .filter(|(_, e)| e.is_negative())
            .map(|(n, e)| render(n, e.abs()))
            .collect();

        let numerator = if numerator.is_empty() {
            "1".to_string()
        } else {
            numerator.join(" * ")
        };
        if denominator.is_empty() {
            numerator
        } else {
            format!("{} / {}", numerator, denominator.join(" / "))
        }
    }
}

fn add_term(terms: &mut Vec<(String, Exponent)>, name: String, exp: Exponent) -> Option<()> {
    if let Some(pos) = terms.iter().position(|(n, _)| *n == name) {
        terms[pos].1 = checked_add(terms[pos].1, exp)?;
        if terms[pos].1.is_zero() {
            terms.remove(pos);
        }
    } else if !exp.is_zero() {
        terms.push((name, exp));
    }
    Some(())
}
