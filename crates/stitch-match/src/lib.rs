// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Distance engine and neighborhood matcher: finds, for every window of a
//! target trajectory, the tolerance-bounded set of statistically closest
//! archive windows.

pub mod distance;
pub mod neighborhood;

pub use distance::nearest_matches;
pub use neighborhood::{compatible_windows, match_neighborhood};
