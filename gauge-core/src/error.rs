//! Unit errors
//!
//! Conversion-time errors are recoverable values returned to the caller.
//! Registry configuration errors are fatal to startup. Every message is the
//! exact text a front end prints for the user.

use serde::Serialize;
use thiserror::Error;

use crate::DimensionVector;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const UNIT_SYNTAX: &str = "UNIT_SYNTAX";
    pub const UNDEFINED_UNIT: &str = "UNDEFINED_UNIT";
    pub const INCOMPATIBLE_DIMENSIONS: &str = "INCOMPATIBLE_DIMENSIONS";
    pub const UNKNOWN_UNIT: &str = "UNKNOWN_UNIT";
    pub const DUPLICATE_UNIT: &str = "DUPLICATE_UNIT";
    pub const INVALID_DIMENSION: &str = "INVALID_DIMENSION";
    pub const MALFORMED_DEFINITION: &str = "MALFORMED_DEFINITION";
    pub const EXPONENT_OVERFLOW: &str = "EXPONENT_OVERFLOW";
    pub const DEGENERATE_UNIT: &str = "DEGENERATE_UNIT";
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The call failed; the registry is untouched
    Error,
    /// Registry configuration failed; initialization must abort
    Fatal,
}

/// Everything that can go wrong while defining, resolving or converting units
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitError {
    /// Malformed unit expression text
    #[error("invalid unit expression '{expression}': {reason} at position {position} (near '{token}')")]
    UnitSyntax {
        expression: String,
        position: usize,
        token: String,
        reason: String,
    },

    /// A unit name that no definition, alias or prefix combination matches
    #[error("'{name}' is not defined in the unit registry")]
    UndefinedUnit { name: String },

    /// Conversion between units of different dimensionality
    #[error("Cannot convert from '{from}' ({from_dim}) to '{to}' ({to_dim})")]
    IncompatibleDimensions {
        from: String,
        from_dim: DimensionVector,
        to: String,
        to_dim: DimensionVector,
    },

    /// Alias requested for a unit that does not exist
    #[error("cannot alias '{name}': no such unit in the unit registry")]
    UnknownUnit { name: String },

    /// Name, symbol or alias already taken by a different definition
    #[error("'{name}' is already defined in the unit registry with a different definition")]
    DuplicateUnit { name: String },

    /// Derived or base dimension declaration that cannot be accepted
    #[error("invalid dimension declaration '{name}': {reason}")]
    InvalidDimensionDeclaration { name: String, reason: String },

    /// Exponent arithmetic left the representable range
    #[error("exponent out of range in '{expression}'")]
    ExponentOverflow { expression: String },

    /// A unit whose scale factor cannot take part in a conversion
    #[error("'{unit}' cannot be converted: scale factor is {scale}")]
    DegenerateUnit { unit: String, scale: f64 },

    /// A definition table line that could not be loaded
    #[error("{source_name}:{line}: cannot load definition '{text}': {reason}")]
    MalformedDefinition {
        source_name: String,
        line: usize,
        text: String,
        reason: String,
    },
}

impl UnitError {
    pub fn syntax(
        expression: impl Into<String>,
        position: usize,
        token: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        UnitError::UnitSyntax {
            expression: expression.into(),
            position,
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        UnitError::UndefinedUnit { name: name.into() }
    }

    pub fn duplicate(name: impl Into<String>) -> Self {
        UnitError::DuplicateUnit { name: name.into() }
    }

    pub fn invalid_dimension(name: impl Into<String>, reason: impl Into<String>) -> Self {
        UnitError::InvalidDimensionDeclaration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn overflow(expression: impl Into<String>) -> Self {
        UnitError::ExponentOverflow {
            expression: expression.into(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            UnitError::UnitSyntax { .. } => codes::UNIT_SYNTAX,
            UnitError::UndefinedUnit { .. } => codes::UNDEFINED_UNIT,
            UnitError::IncompatibleDimensions { .. } => codes::INCOMPATIBLE_DIMENSIONS,
            UnitError::UnknownUnit { .. } => codes::UNKNOWN_UNIT,
            UnitError::DuplicateUnit { .. } => codes::DUPLICATE_UNIT,
            UnitError::InvalidDimensionDeclaration { .. } => codes::INVALID_DIMENSION,
            UnitError::ExponentOverflow { .. } => codes::EXPONENT_OVERFLOW,
            UnitError::DegenerateUnit { .. } => codes::DEGENERATE_UNIT,
            UnitError::MalformedDefinition { .. } => codes::MALFORMED_DEFINITION,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            UnitError::DuplicateUnit { .. }
            | UnitError::InvalidDimensionDeclaration { .. }
            | UnitError::MalformedDefinition { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Configuration errors abort registry initialization
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

pub type Result<T> = std::result::Result<T, UnitError>;
