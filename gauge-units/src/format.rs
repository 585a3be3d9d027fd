//! Pretty unit text with Unicode exponents
//!
//! `m**2*K/W` renders as `K·m²/W`: leaves are replaced by display symbols,
//! repeated units are combined and terms are sorted by codepoint. Positive
//! powers are joined with `·`; each negative power is appended with its own
//! `/`. A numeric factor other than 1 leads the text (`1000·m`).

use std::collections::BTreeMap;

use gauge_core::dimension::{checked_add, format_exponent};
use gauge_core::{Exponent, Result, UnitError};
use num_traits::{One, Signed, Zero};

use crate::ast::UnitExpr;
use crate::parser::parse_expression;
use crate::registry::UnitRegistry;
use crate::resolved::ResolvedUnit;

const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// Render an exponent with superscript characters (`-1.5` -> `⁻¹⋅⁵`)
pub fn superscript(exp: Exponent) -> String {
    format_exponent(exp)
        .chars()
        .map(|c| match c {
            '-' => '⁻',
            '.' => '⋅',
            d => d
                .to_digit(10)
                .map(|d| SUPERSCRIPT_DIGITS[d as usize])
                .unwrap_or(d),
        })
        .collect()
}

/// Render `(symbol, exponent)` terms, merging repeats.
///
/// Returns an empty string when every exponent cancels, and `None` when a
/// merged exponent is out of range.
pub fn format_terms<I, S>(terms: I) -> Option<String>
where
    I: IntoIterator<Item = (S, Exponent)>,
    S: Into<String>,
{
    let mut merged: BTreeMap<String, Exponent> = BTreeMap::new();
    for (symbol, exp) in terms {
        let entry = merged.entry(symbol.into()).or_insert_with(Exponent::zero);
        *entry = checked_add(*entry, exp)?;
    }
    merged.retain(|_, exp| !exp.is_zero());

    let render = |symbol: &str, exp: Exponent| {
        if exp.is_one() {
            symbol.to_string()
        } else {
            format!("{}{}", symbol, superscript(exp))
        }
    };

    let numerator: Vec<String> = merged
        .iter()
        .filter(|(_, exp)| exp.is_positive())
        .map(|(symbol, exp)| render(symbol, *exp))
        .collect();
    let mut out = numerator.join("·");

    let mut denominator = merged.iter().filter(|(_, exp)| exp.is_negative()).peekable();
    if out.is_empty() && denominator.peek().is_some() {
        out.push('1');
    }
    for (symbol, exp) in denominator {
        out.push('/');
        out.push_str(&render(symbol, exp.abs()));
    }
    Some(out)
}

/// Put a numeric factor in front of formatted terms
fn with_factor(factor: f64, terms: String) -> String {
    if factor == 1.0 {
        terms
    } else if terms.is_empty() {
        factor.to_string()
    } else if let Some(per) = terms.strip_prefix("1/") {
        format!("{}/{}", factor, per)
    } else {
        format!("{}·{}", factor, terms)
    }
}

/// Renders unit expressions with the display symbols of a registry
#[derive(Debug, Clone, Copy)]
pub struct Formatter<'r> {
    registry: &'r UnitRegistry,
}

impl<'r> Formatter<'r> {
    pub fn new(registry: &'r UnitRegistry) -> Self {
        Formatter { registry }
    }

    /// Format unit text. Unknown unit names pass through unchanged; only
    /// malformed text is an error.
    pub fn format(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }
        if let Some(def) = self.registry.get(text) {
            return Ok(def.display_symbol().to_string());
        }
        let expr = parse_expression(text)?;
        self.format_expr(&expr)
    }

    pub fn format_expr(&self, expr: &UnitExpr) -> Result<String> {
        let overflow = || UnitError::overflow(expr.to_string());
        let factors = expr.factors().ok_or_else(overflow)?;
        let terms = format_terms(
            factors
                .into_iter()
                .map(|(leaf, exp)| (self.leaf_symbol(leaf), exp)),
        )
        .ok_or_else(overflow)?;
        Ok(with_factor(expr.numeric_factor(), terms))
    }

    /// Format a resolved unit from its canonical terms (scale not shown)
    pub fn format_resolved(&self, resolved: &ResolvedUnit) -> Result<String> {
        format_terms(
            resolved
                .terms
                .iter()
                .map(|(name, exp)| (self.symbol_for(name), *exp)),
        )
        .ok_or_else(|| UnitError::overflow(resolved.canonical_text()))
    }

    fn leaf_symbol(&self, leaf: &UnitExpr) -> String {
        match leaf {
            UnitExpr::UnitRef(name) => self.symbol_for(name),
            other => other.to_string(),
        }
    }

    fn symbol_for(&self, name: &str) -> String {
        match self.registry.get(name) {
            Some(def) => def.display_symbol().to_string(),
            None => name.to_string(),
        }
    }
}

impl UnitRegistry {
    pub fn formatter(&self) -> Formatter<'_> {
        Formatter::new(self)
    }

    /// Pretty-print unit text (`m**3/s` -> `m³/s`)
    pub fn format_units(&self, text: &str) -> Result<String> {
        self.formatter().format(text)
    }
}
