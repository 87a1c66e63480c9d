// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::diagnostics::Diagnostics;
use crate::window::{TrajectoryKey, WindowKey, WindowRecord};
use serde::{Deserialize, Serialize};

/// Schema version written on recipe artifacts.
pub const RECIPE_SCHEMA_VERSION: u32 = 1;

/// One (target window, archive window) pairing with its distances.
///
/// External tabular encodings flatten `target`/`archive` into `target_*` and
/// `archive_*` prefixed columns; in memory the two sides stay structured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub target: WindowRecord,
    pub archive: WindowRecord,
    pub dist_level: f64,
    pub dist_trend: f64,
    pub dist_total: f64,
}

impl MatchRecord {
    /// The (target window, archive window) identity pair of this record.
    pub fn pair(&self) -> (WindowKey, WindowKey) {
        (self.target.key(), self.archive.key())
    }
}

/// A complete, duplicate-free substitution plan for one synthetic
/// trajectory: exactly one archive window per target window, in target
/// chronological order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique identifier of this recipe within its collection.
    pub stitching_id: String,
    /// The target trajectory this recipe emulates.
    pub target: TrajectoryKey,
    pub rows: Vec<MatchRecord>,
}

/// Accepted recipes for one permutation-engine call.
///
/// Created empty, grows by whole-recipe acceptance, never mutated after
/// acceptance. The diagnostics carry the seed and any achievable-yield
/// shortfall warnings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeCollection {
    pub schema_version: u32,
    pub recipes: Vec<Recipe>,
    pub diagnostics: Diagnostics,
}

impl RecipeCollection {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            schema_version: RECIPE_SCHEMA_VERSION,
            recipes: Vec::new(),
            diagnostics,
        }
    }

    /// Total accepted recipe count across all target trajectories.
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// Stitching-ready row produced by the repair pass.
///
/// Distances are dropped; what remains is exactly what physical reassembly
/// needs: which archive years to paste into which target years, and where
/// the archive data lives once the catalog join fills `archive_source`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StitchRow {
    pub target_start_year: i32,
    pub target_end_year: i32,
    pub archive_experiment: String,
    pub archive_variable: String,
    pub archive_model: String,
    pub archive_ensemble: String,
    pub stitching_id: String,
    pub archive_start_year: i32,
    pub archive_end_year: i32,
    /// Physical source reference, resolved by an external catalog join.
    pub archive_source: Option<String>,
}

impl StitchRow {
    /// Inclusive target-side length in years.
    pub fn target_length(&self) -> i32 {
        self.target_end_year - self.target_start_year + 1
    }

    /// Inclusive archive-side length in years.
    pub fn archive_length(&self) -> i32 {
        self.archive_end_year - self.archive_start_year + 1
    }
}
