//! Dimensional analysis types
//!
//! A physical dimension is a vector of rational exponents over named base
//! dimensions (`[length]`, `[mass]`, ...). Dimensions that do not appear in
//! the vector implicitly have exponent zero, and zero exponents are never
//! stored, so two vectors compare equal exactly when every exponent matches.

use std::collections::BTreeMap;
use std::fmt;

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, One, Signed, Zero};
use serde::{Deserialize, Serialize};

/// Exponent of a base dimension (integers and simple fractions like 3/2)
pub type Exponent = Rational64;

/// Names of the built-in base dimensions
pub const LENGTH: &str = "[length]";
pub const MASS: &str = "[mass]";
pub const TIME: &str = "[time]";
pub const TEMPERATURE: &str = "[temperature]";
pub const CURRENT: &str = "[current]";
pub const SUBSTANCE: &str = "[substance]";
pub const LUMINOSITY: &str = "[luminosity]";

/// How two dimension vectors are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Product of quantities (add exponents)
    Multiply,
    /// Quotient of quantities (subtract exponents)
    Divide,
}

/// Represents the dimensions of a physical quantity as rational exponents
/// of named base dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionVector {
    exponents: BTreeMap<String, Exponent>,
}

impl DimensionVector {
    /// Dimensionless quantity (no exponents)
    pub fn dimensionless() -> Self {
        Self::default()
    }

    /// A single base dimension with exponent 1
    pub fn base(name: impl Into<String>) -> Self {
        let mut exponents = BTreeMap::new();
        exponents.insert(name.into(), Exponent::one());
        DimensionVector { exponents }
    }

    /// Build a vector from `(base dimension, exponent)` pairs.
    /// A later pair for the same dimension replaces an earlier one; zero
    /// exponents are dropped.
    pub fn from_exponents<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Exponent)>,
        S: Into<String>,
    {
        let mut exponents: BTreeMap<String, Exponent> =
            pairs.into_iter().map(|(name, exp)| (name.into(), exp)).collect();
        exponents.retain(|_, e| !e.is_zero());
        DimensionVector { exponents }
    }

    /// Exponent of a base dimension (zero when absent)
    pub fn exponent(&self, name: &str) -> Exponent {
        self.exponents.get(name).copied().unwrap_or_else(Exponent::zero)
    }

    /// Iterate `(base dimension, exponent)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Exponent)> + '_ {
        self.exponents.iter().map(|(name, exp)| (name.as_str(), *exp))
    }

    /// Number of base dimensions with a non-zero exponent
    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Check if this is a dimensionless quantity
    pub fn is_dimensionless(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Combine two vectors dimension-wise.
    ///
    /// Returns `None` when an exponent leaves the `i64` ratio range.
    pub fn combine(&self, other: &DimensionVector, op: Combine) -> Option<DimensionVector> {
        let mut exponents = self.exponents.clone();
        for (name, &exp) in &other.exponents {
            let exp = match op {
                Combine::Multiply => exp,
                Combine::Divide => checked_neg(exp)?,
            };
            let current = exponents.get(name).copied().unwrap_or_else(Exponent::zero);
            let sum = checked_add(current, exp)?;
            if sum.is_zero() {
                exponents.remove(name);
            } else {
                exponents.insert(name.clone(), sum);
            }
        }
        Some(DimensionVector { exponents })
    }

    /// Multiply dimensions (add exponents)
    pub fn multiply(&self, other: &DimensionVector) -> Option<DimensionVector> {
        self.combine(other, Combine::Multiply)
    }

    /// Divide dimensions (subtract exponents)
    pub fn divide(&self, other: &DimensionVector) -> Option<DimensionVector> {
        self.combine(other, Combine::Divide)
    }

    /// Raise to a rational power (scale every exponent)
    pub fn power(&self, n: Exponent) -> Option<DimensionVector> {
        if n.is_zero() {
            return Some(DimensionVector::dimensionless());
        }
        let exponents = self
            .exponents
            .iter()
            .map(|(name, &exp)| Some((name.clone(), checked_mul(exp, n)?)))
            .collect::<Option<BTreeMap<_, _>>>()?;
        Some(DimensionVector { exponents })
    }

    /// Invert dimensions (negate exponents)
    pub fn invert(&self) -> Option<DimensionVector> {
        self.power(-Exponent::one())
    }
}

impl fmt::Display for DimensionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }

        let mut numerator = Vec::new();
        let mut denominator = Vec::new();
        for (name, exp) in self.iter() {
            let magnitude = exp.abs();
            let term = if magnitude.is_one() {
                name.to_string()
            } else {
                format!("{} ** {}", name, format_exponent(magnitude))
            };
            if exp.is_positive() {
                numerator.push(term);
            } else {
                denominator.push(term);
            }
        }

        let numerator = if numerator.is_empty() {
            "1".to_string()
        } else {
            numerator.join(" * ")
        };
        if denominator.is_empty() {
            write!(f, "{}", numerator)
        } else {
            write!(f, "{} / {}", numerator, denominator.join(" / "))
        }
    }
}

impl FromIterator<(String, Exponent)> for DimensionVector {
    fn from_iter<T: IntoIterator<Item = (String, Exponent)>>(iter: T) -> Self {
        DimensionVector::from_exponents(iter)
    }
}

// Exponent arithmetic. Results whose numerator would be `i64::MIN` are
// rejected too, so negation and `abs` stay safe on every stored exponent.

fn bounded(exp: Exponent) -> Option<Exponent> {
    (*exp.numer() != i64::MIN).then_some(exp)
}

pub fn checked_add(a: Exponent, b: Exponent) -> Option<Exponent> {
    a.checked_add(&b).and_then(bounded)
}

pub fn checked_mul(a: Exponent, b: Exponent) -> Option<Exponent> {
    a.checked_mul(&b).and_then(bounded)
}

pub fn checked_div(a: Exponent, b: Exponent) -> Option<Exponent> {
    a.checked_div(&b).and_then(bounded)
}

pub fn checked_neg(a: Exponent) -> Option<Exponent> {
    bounded(a).map(|a| -a)
}

/// Integer power by squaring; `None` on overflow or a zero base with a
/// negative power.
pub fn checked_pow(base: Exponent, n: i64) -> Option<Exponent> {
    let mut square = if n < 0 {
        checked_div(Exponent::one(), base)?
    } else {
        bounded(base)?
    };
    let mut remaining = n.unsigned_abs();
    let mut result = Exponent::one();
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = checked_mul(result, square)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = checked_mul(square, square)?;
        }
    }
    Some(result)
}

/// Convert an exponent to a float for scale arithmetic
pub fn exponent_to_f64(exp: Exponent) -> f64 {
    *exp.numer() as f64 / *exp.denom() as f64
}

/// Render an exponent as decimal text.
///
/// Integers render without a fraction part, terminating fractions render
/// exactly (`3/2` -> `1.5`), anything else is rounded to six decimals.
pub fn format_exponent(exp: Exponent) -> String {
    if exp.is_integer() {
        return exp.to_integer().to_string();
    }
    let value = exponent_to_f64(exp);
    if is_terminating(*exp.denom()) {
        return value.to_string();
    }
    let text = format!("{:.6}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn is_terminating(mut denom: i64) -> bool {
    denom = denom.abs();
    for factor in [2, 5] {
        while denom % factor == 0 {
            denom /= factor;
        }
    }
    denom == 1
}

/// Parse exponent text: integers (`-2`), decimals (`1.5`) or ratios (`1/3`).
///
/// Decimals are converted exactly, never through floating point.
pub fn parse_exponent(text: &str) -> Option<Exponent> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() {
        return None;
    }

    let value = if let Some((num, den)) = digits.split_once('/') {
        let num: i64 = num.trim().parse().ok()?;
        let den: i64 = den.trim().parse().ok()?;
        if den == 0 {
            return None;
        }
        Exponent::new(num, den)
    } else if let Some((whole, frac)) = digits.split_once('.') {
        if (whole.is_empty() && frac.is_empty())
            || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let scale = 10i64.checked_pow(u32::try_from(frac.len()).ok()?)?;
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac: i64 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
        let numer = whole.checked_mul(scale)?.checked_add(frac)?;
        Exponent::new(numer, scale)
    } else {
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Exponent::from_integer(digits.parse().ok()?)
    };

    Some(if negative { -value } else { value })
}
