// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::distance::nearest_matches;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use stitch_core::{
    dominant_window_length, validate_windows, ExperimentKind, MatchRecord, StitchError,
    WindowKey, WindowRecord, HISTORICAL_CUTOFF_YEAR,
};

/// Matches every window of a target trajectory against an archive, producing
/// the full candidate-match table.
///
/// The archive is shuffled before scoring so exact distance ties do not
/// systematically resolve in row order; consumers that need reproducible
/// draws pass a seeded generator. Candidates are restricted per target
/// window to the same variable; idealized-experiment targets only match
/// archive windows of the same experiment, and non-idealized targets never
/// match idealized archive windows.
///
/// With `drop_hist_duplicates` set, archive rows that are byte-identical
/// copies of one historical window pasted into several scenario branches are
/// collapsed to the lowest scenario label for target windows centered before
/// the historical/scenario cutoff, so fake distinct options do not inflate
/// match diversity.
pub fn match_neighborhood<R: Rng + ?Sized>(
    target: &[WindowRecord],
    archive: &[WindowRecord],
    tol: f64,
    drop_hist_duplicates: bool,
    rng: &mut R,
) -> Result<Vec<MatchRecord>, StitchError> {
    validate_windows(target, "target")?;
    validate_windows(archive, "archive")?;

    let window_len = dominant_window_length(archive)?;

    let mut shuffled = archive.to_vec();
    shuffled.shuffle(rng);

    let mut out = Vec::new();
    for target_window in target {
        let candidates = compatible_windows(target_window, &shuffled);
        if candidates.is_empty() {
            return Err(StitchError::schema(format!(
                "no archive windows compatible with target variable `{}`, experiment `{}`",
                target_window.variable, target_window.experiment
            )));
        }
        out.extend(nearest_matches(target_window, &candidates, window_len, tol)?);
    }

    if drop_hist_duplicates {
        out = drop_pasted_historical_duplicates(out, window_len);
    }

    Ok(out)
}

/// Archive windows a target window is allowed to match: same variable, with
/// idealized experiments matching only among themselves. Exposed so callers
/// rematching against an archive subset apply the same restrictions.
pub fn compatible_windows(target: &WindowRecord, archive: &[WindowRecord]) -> Vec<WindowRecord> {
    archive
        .iter()
        .filter(|candidate| is_compatible(target, candidate))
        .cloned()
        .collect()
}

fn is_compatible(target: &WindowRecord, candidate: &WindowRecord) -> bool {
    if candidate.variable != target.variable {
        return false;
    }
    // Idealized runs are never chronologically continuous with the
    // historical/scenario timeline; they only match among themselves.
    match target.kind() {
        ExperimentKind::Idealized => candidate.experiment == target.experiment,
        ExperimentKind::Historical | ExperimentKind::Scenario => {
            candidate.kind() != ExperimentKind::Idealized
        }
    }
}

type PastedGroupKey = (WindowKey, String, String, i32, i32, u64, u64);

fn pasted_group_key(record: &MatchRecord) -> PastedGroupKey {
    (
        record.target.key(),
        record.archive.model.clone(),
        record.archive.ensemble.clone(),
        record.archive.start_year,
        record.archive.end_year,
        record.archive.level.to_bits(),
        record.archive.trend.to_bits(),
    )
}

fn is_pasted_candidate(record: &MatchRecord, window_len: i32) -> bool {
    let threshold = HISTORICAL_CUTOFF_YEAR - window_len / 2;
    record.target.kind() != ExperimentKind::Idealized
        && record.target.center_year < threshold
        && record.archive.kind() == ExperimentKind::Scenario
}

/// Collapses historical-period archive rows duplicated across scenario
/// labels to one canonical row per (target window, underlying window),
/// keeping the lowest scenario label.
fn drop_pasted_historical_duplicates(
    records: Vec<MatchRecord>,
    window_len: i32,
) -> Vec<MatchRecord> {
    let mut canonical: HashMap<PastedGroupKey, String> = HashMap::new();
    for record in &records {
        if is_pasted_candidate(record, window_len) {
            let winner = canonical
                .entry(pasted_group_key(record))
                .or_insert_with(|| record.archive.experiment.clone());
            if record.archive.experiment < *winner {
                *winner = record.archive.experiment.clone();
            }
        }
    }

    let mut kept_groups: HashSet<PastedGroupKey> = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            if !is_pasted_candidate(record, window_len) {
                return true;
            }
            let key = pasted_group_key(record);
            let winner = &canonical[&key];
            record.archive.experiment == *winner && kept_groups.insert(key)
        })
        .collect()
}
