// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Recipe construction on top of the neighborhood matcher: resolves
//! archive-window conflicts, drives repeated random draws into complete
//! collapse-free recipes, and repairs accepted recipes into stitching-ready
//! rows.

pub mod permute;
pub mod repair;
pub mod resolver;

pub use permute::{permute_stitching_recipes, MAX_DRAW_ATTEMPTS};
pub use repair::{
    correct_final_lengths, join_sources, repair_recipes, split_boundary_rows, SourceCatalog,
};
pub use resolver::remove_duplicates;
