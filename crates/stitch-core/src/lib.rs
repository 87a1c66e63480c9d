// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types for the stitch matching and recipe-construction engine:
//! window records, match/recipe records, the error taxonomy, run
//! diagnostics, the injectable random-draw mode, and the chunking
//! collaborator that turns raw annual series into window records.

pub mod chunk;
pub mod diagnostics;
pub mod draw;
pub mod error;
pub mod record;
pub mod window;

pub use chunk::chunk_series;
pub use diagnostics::{Diagnostics, DIAGNOSTICS_SCHEMA_VERSION};
pub use draw::DrawMode;
pub use error::StitchError;
pub use record::{MatchRecord, Recipe, RecipeCollection, StitchRow, RECIPE_SCHEMA_VERSION};
pub use window::{
    dominant_window_length, validate_windows, ExperimentKind, TrajectoryKey, WindowKey,
    WindowRecord, HISTORICAL_CUTOFF_YEAR,
};
