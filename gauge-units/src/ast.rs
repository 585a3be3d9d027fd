//! Abstract syntax of unit expressions

use std::fmt;

use gauge_core::dimension::{checked_mul, checked_neg, exponent_to_f64, format_exponent};
use gauge_core::Exponent;
use num_traits::One;
use serde::{Deserialize, Serialize};

/// A parsed unit expression such as `m**2*K/W`.
///
/// The parser never looks names up; leaves are resolved later against a
/// registry, so the same tree serves dimensionality queries, conversions
/// and formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitExpr {
    /// Unit name, symbol or alias as written (`inch`, `°F`, `kW`)
    UnitRef(String),
    /// Bracketed dimension reference (`[length]`); empty name is `[]`
    Dimension(String),
    /// Pure numeric factor (`0.0254`, the `1` in `1/s`)
    Number(f64),
    Product(Box<UnitExpr>, Box<UnitExpr>),
    Quotient(Box<UnitExpr>, Box<UnitExpr>),
    Power(Box<UnitExpr>, Exponent),
}

impl UnitExpr {
    pub fn unit(name: impl Into<String>) -> Self {
        UnitExpr::UnitRef(name.into())
    }

    pub fn product(left: UnitExpr, right: UnitExpr) -> Self {
        UnitExpr::Product(Box::new(left), Box::new(right))
    }

    pub fn quotient(left: UnitExpr, right: UnitExpr) -> Self {
        UnitExpr::Quotient(Box::new(left), Box::new(right))
    }

    pub fn power(base: UnitExpr, exponent: Exponent) -> Self {
        UnitExpr::Power(Box::new(base), exponent)
    }

    /// Name of the unit when the whole expression is one bare reference
    pub fn as_unit_ref(&self) -> Option<&str> {
        match self {
            UnitExpr::UnitRef(name) => Some(name),
            _ => None,
        }
    }

    /// All unit references in left-to-right order
    pub fn unit_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            UnitExpr::UnitRef(name) => refs.push(name),
            UnitExpr::Dimension(_) | UnitExpr::Number(_) => {}
            UnitExpr::Product(l, r) | UnitExpr::Quotient(l, r) => {
                l.collect_refs(refs);
                r.collect_refs(refs);
            }
            UnitExpr::Power(base, _) => base.collect_refs(refs),
        }
    }

    /// Replace every reference to `from` with `to`; returns how many changed
    pub fn rename_refs(&mut self, from: &str, to: &str) -> usize {
        match self {
            UnitExpr::UnitRef(name) if name == from => {
                *name = to.to_string();
                1
            }
            UnitExpr::UnitRef(_) | UnitExpr::Dimension(_) | UnitExpr::Number(_) => 0,
            UnitExpr::Product(l, r) | UnitExpr::Quotient(l, r) => {
                l.rename_refs(from, to) + r.rename_refs(from, to)
            }
            UnitExpr::Power(base, _) => base.rename_refs(from, to),
        }
    }

    /// Flatten into `(leaf, exponent)` factors, numbers excluded.
    ///
    /// Repeated leaves are not merged here; callers decide what counts as
    /// "the same" unit (spelling, canonical name or display symbol).
    /// `None` when a combined exponent is out of range.
    pub fn factors(&self) -> Option<Vec<(&UnitExpr, Exponent)>> {
        let mut out = Vec::new();
        self.collect_factors(Exponent::one(), &mut out)?;
        Some(out)
    }

    fn collect_factors<'a>(
        &'a self,
        exp: Exponent,
        out: &mut Vec<(&'a UnitExpr, Exponent)>,
    ) -> Option<()> {
        match self {
            UnitExpr::UnitRef(_) | UnitExpr::Dimension(_) => out.push((self, exp)),
            UnitExpr::Number(_) => {}
            UnitExpr::Product(l, r) => {
                l.collect_factors(exp, out)?;
                r.collect_factors(exp, out)?;
            }
            UnitExpr::Quotient(l, r) => {
                l.collect_factors(exp, out)?;
                r.collect_factors(checked_neg(exp)?, out)?;
            }
            UnitExpr::Power(base, n) => base.collect_factors(checked_mul(exp, *n)?, out)?,
        }
        Some(())
    }

    /// Product of the numeric factors, units counted as 1 (`1000*m` -> 1000)
    pub fn numeric_factor(&self) -> f64 {
        match self {
            UnitExpr::Number(value) => *value,
            UnitExpr::UnitRef(_) | UnitExpr::Dimension(_) => 1.0,
            UnitExpr::Product(l, r) => l.numeric_factor() * r.numeric_factor(),
            UnitExpr::Quotient(l, r) => l.numeric_factor() / r.numeric_factor(),
            UnitExpr::Power(base, n) => base.numeric_factor().powf(exponent_to_f64(*n)),
        }
    }
}

impl fmt::Display for UnitExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitExpr::UnitRef(name) => write!(f, "{}", name),
            UnitExpr::Dimension(name) => write!(f, "[{}]", name),
            UnitExpr::Number(n) => write!(f, "{}", n),
            UnitExpr::Product(l, r) => write!(f, "({} * {})", l, r),
            UnitExpr::Quotient(l, r) => write!(f, "({} / {})", l, r),
            UnitExpr::Power(base, n) => {
                if matches!(**base, UnitExpr::Power(..)) {
                    write!(f, "({})", base)?;
                } else {
                    write!(f, "{}", base)?;
                }
                if n.is_integer() || format_exponent(*n).len() < 8 {
                    write!(f, " ** {}", format_exponent(*n))
                } else {
                    write!(f, " ** ({}/{})", n.numer(), n.denom())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(n: i64) -> Exponent {
        Exponent::from_integer(n)
    }

    #[test]
    fn test_unit_refs_order() {
        let expr = UnitExpr::quotient(
            UnitExpr::product(UnitExpr::unit("kg"), UnitExpr::unit("m")),
            UnitExpr::power(UnitExpr::unit("s"), exp(2)),
        );
        assert_eq!(expr.unit_refs(), vec!["kg", "m", "s"]);
    }

    #[test]
    fn test_factors_track_exponents() {
        // m**2 * K / W
        let expr = UnitExpr::quotient(
            UnitExpr::product(
                UnitExpr::power(UnitExpr::unit("m"), exp(2)),
                UnitExpr::unit("K"),
            ),
            UnitExpr::unit("W"),
        );
        let factors: Vec<(String, Exponent)> = expr
            .factors()
            .unwrap()
            .into_iter()
            .map(|(leaf, e)| (leaf.to_string(), e))
            .collect();
        assert_eq!(
            factors,
            vec![
                ("m".to_string(), exp(2)),
                ("K".to_string(), exp(1)),
                ("W".to_string(), exp(-1)),
            ]
        );
    }

    #[test]
    fn test_factors_skip_numbers() {
        let expr = UnitExpr::quotient(UnitExpr::Number(1.0), UnitExpr::unit("s"));
        let factors = expr.factors().unwrap();
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].1, exp(-1));
    }

    #[test]
    fn test_factors_out_of_range() {
        let huge = exp(3_037_000_500);
        let expr = UnitExpr::power(UnitExpr::power(UnitExpr::unit("m"), huge), huge);
        assert_eq!(expr.factors(), None);
    }

    #[test]
    fn test_numeric_factor() {
        let km = UnitExpr::product(UnitExpr::Number(1000.0), UnitExpr::unit("m"));
        assert_eq!(km.numeric_factor(), 1000.0);
        let per_second = UnitExpr::quotient(UnitExpr::Number(1.0), UnitExpr::unit("s"));
        assert_eq!(per_second.numeric_factor(), 1.0);
        let squared = UnitExpr::power(UnitExpr::product(UnitExpr::Number(10.0), UnitExpr::unit("m")), exp(2));
        assert_eq!(squared.numeric_factor(), 100.0);
    }

    #[test]
    fn test_rename_refs() {
        let mut expr = UnitExpr::quotient(
            UnitExpr::unit("h"),
            UnitExpr::product(UnitExpr::Number(2.0), UnitExpr::unit("pi")),
        );
        assert_eq!(expr.rename_refs("h", "planck_constant"), 1);
        assert_eq!(expr.unit_refs(), vec!["planck_constant", "pi"]);
        assert_eq!(expr.rename_refs("h", "planck_constant"), 0);
    }

    #[test]
    fn test_display_nested_powers() {
        let expr = UnitExpr::power(UnitExpr::power(UnitExpr::unit("m"), exp(2)), exp(3));
        assert_eq!(expr.to_string(), "(m ** 2) ** 3");
        let root = UnitExpr::power(UnitExpr::unit("m"), Exponent::new(1, 3));
        assert_eq!(root.to_string(), "m ** (1/3)");
        let half = UnitExpr::power(UnitExpr::unit("m"), Exponent::new(1, 2));
        assert_eq!(half.to_string(), "m ** 0.5");
    }

    #[test]
    fn test_as_unit_ref() {
        assert_eq!(UnitExpr::unit("degC").as_unit_ref(), Some("degC"));
        assert_eq!(UnitExpr::power(UnitExpr::unit("m"), exp(2)).as_unit_ref(), None);
    }
}
