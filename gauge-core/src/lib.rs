//! Gauge Core - Fundamental types
//!
//! This crate provides the core types used throughout Gauge:
//! - `DimensionVector`: rational exponents over named base dimensions
//! - `UnitError`: the error taxonomy shared by parsing, registry and conversion

pub mod dimension;
mod error;

pub use dimension::{Combine, DimensionVector, Exponent};
pub use error::{codes, Result, Severity, UnitError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::codes;
    pub use crate::{Combine, DimensionVector, Exponent, Result, Severity, UnitError};
}
