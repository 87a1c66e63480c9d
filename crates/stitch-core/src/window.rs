// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::StitchError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// First scenario year; archive years strictly before this belong to the
/// historical period.
pub const HISTORICAL_CUTOFF_YEAR: i32 = 2015;

/// Experiment families an archive window can belong to.
///
/// Idealized experiments are never chronologically continuous with the
/// historical/scenario timeline and are exempt from the historical-duplicate
/// collapse and the boundary split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExperimentKind {
    Historical,
    Scenario,
    Idealized,
}

impl ExperimentKind {
    /// Classifies an experiment label.
    pub fn classify(experiment: &str) -> Self {
        if experiment == "historical" {
            Self::Historical
        } else if experiment.starts_with("1pct")
            || experiment.starts_with("abrupt")
            || experiment.starts_with("piControl")
        {
            Self::Idealized
        } else {
            Self::Scenario
        }
    }
}

/// One window of one trajectory: the atomic record on both the target and
/// the archive side.
///
/// `level` is the representative value at the window's center year; `trend`
/// is the local linear slope in value-per-year. Windows of one
/// (model, experiment, ensemble, variable) partition the trajectory into
/// contiguous, non-overlapping, chronologically ordered periods.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub model: String,
    pub experiment: String,
    pub ensemble: String,
    pub variable: String,
    pub start_year: i32,
    pub end_year: i32,
    pub center_year: i32,
    pub level: f64,
    pub trend: f64,
}

impl WindowRecord {
    /// Inclusive length of the window in years.
    pub fn length(&self) -> i32 {
        self.end_year - self.start_year + 1
    }

    /// Identity key of this window.
    pub fn key(&self) -> WindowKey {
        WindowKey {
            model: self.model.clone(),
            experiment: self.experiment.clone(),
            ensemble: self.ensemble.clone(),
            variable: self.variable.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
        }
    }

    /// Identity of the trajectory this window belongs to.
    pub fn trajectory(&self) -> TrajectoryKey {
        TrajectoryKey {
            variable: self.variable.clone(),
            experiment: self.experiment.clone(),
            ensemble: self.ensemble.clone(),
            model: self.model.clone(),
        }
    }

    /// Experiment family of this window.
    pub fn kind(&self) -> ExperimentKind {
        ExperimentKind::classify(&self.experiment)
    }
}

/// Identity of one window; center year is implied by the range.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowKey {
    pub model: String,
    pub experiment: String,
    pub ensemble: String,
    pub variable: String,
    pub start_year: i32,
    pub end_year: i32,
}

/// Identity of one trajectory: a (variable, experiment, ensemble, model)
/// combination.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrajectoryKey {
    pub variable: String,
    pub experiment: String,
    pub ensemble: String,
    pub model: String,
}

fn require_nonempty(field: &str, value: &str, side: &str, idx: usize) -> Result<(), StitchError> {
    if value.is_empty() {
        return Err(StitchError::schema(format!(
            "{side} window {idx}: required field `{field}` is empty"
        )));
    }
    Ok(())
}

fn require_finite(field: &str, value: f64, side: &str, idx: usize) -> Result<(), StitchError> {
    if !value.is_finite() {
        return Err(StitchError::schema(format!(
            "{side} window {idx}: `{field}` must be finite; got {value}"
        )));
    }
    Ok(())
}

/// Validates a window record set, returning `StitchError::Schema` on the
/// first violation. `side` names the collection in error messages
/// ("target" or "archive").
pub fn validate_windows(windows: &[WindowRecord], side: &str) -> Result<(), StitchError> {
    if windows.is_empty() {
        return Err(StitchError::schema(format!(
            "{side} must contain at least one window"
        )));
    }

    for (idx, w) in windows.iter().enumerate() {
        require_nonempty("model", &w.model, side, idx)?;
        require_nonempty("experiment", &w.experiment, side, idx)?;
        require_nonempty("ensemble", &w.ensemble, side, idx)?;
        require_nonempty("variable", &w.variable, side, idx)?;
        require_finite("level", w.level, side, idx)?;
        require_finite("trend", w.trend, side, idx)?;

        if w.start_year > w.end_year {
            return Err(StitchError::schema(format!(
                "{side} window {idx}: start_year {} is after end_year {}",
                w.start_year, w.end_year
            )));
        }
        if w.center_year < w.start_year || w.center_year > w.end_year {
            return Err(StitchError::schema(format!(
                "{side} window {idx}: center_year {} is outside [{}, {}]",
                w.center_year, w.start_year, w.end_year
            )));
        }
    }

    Ok(())
}

/// Most common window length in an archive, in years.
///
/// This is the trend-rescaling factor of the distance computation. An
/// archive mixing full-length windows with a truncated final window still
/// reports the dominant full length.
pub fn dominant_window_length(archive: &[WindowRecord]) -> Result<i32, StitchError> {
    if archive.is_empty() {
        return Err(StitchError::schema(
            "archive must contain at least one window",
        ));
    }

    let mut counts: HashMap<i32, usize> = HashMap::new();
    for w in archive {
        *counts.entry(w.length()).or_insert(0) += 1;
    }

    // Tie on count resolves to the longer length, so a half-truncated
    // archive still rescales by the full window length.
    counts
        .into_iter()
        .max_by_key(|&(length, count)| (count, length))
        .map(|(length, _)| length)
        .ok_or_else(|| StitchError::schema("archive must contain at least one window"))
}
