// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Error taxonomy for the matching and recipe-construction engine.
///
/// `Schema` and `Precondition` are fail-fast caller errors; `LengthMismatch`
/// is the repair pass refusing to guess at a >1-year target/archive length
/// difference. Achievable-yield shortfalls are not errors and are reported
/// through [`crate::Diagnostics::warnings`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StitchError {
    /// Required fields are missing or invalid on an input record set.
    Schema(String),
    /// A documented call invariant was violated by the caller.
    Precondition(String),
    /// An argument is malformed in a way not tied to record schemas.
    InvalidInput(String),
    /// A target/archive window length mismatch exceeds the one-year
    /// correction the repair pass is allowed to make.
    LengthMismatch(String),
}

impl StitchError {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn length_mismatch(msg: impl Into<String>) -> Self {
        Self::LengthMismatch(msg.into())
    }

    /// Stable machine-readable code for each variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema_error",
            Self::Precondition(_) => "precondition_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::LengthMismatch(_) => "unresolved_length_mismatch",
        }
    }
}

impl fmt::Display for StitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(msg)
            | Self::Precondition(msg)
            | Self::InvalidInput(msg)
            | Self::LengthMismatch(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for StitchError {}
