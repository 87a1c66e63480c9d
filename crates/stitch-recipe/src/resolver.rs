// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use stitch_core::{
    dominant_window_length, validate_windows, MatchRecord, StitchError, WindowKey, WindowRecord,
};
use stitch_match::{compatible_windows, nearest_matches};

/// Resolves archive windows claimed by more than one target window in a
/// one-to-one draft, rematching the losers against a shrinking archive until
/// every target window holds a unique archive window.
///
/// Precondition: `draft` has exactly one row per target window. Within a
/// conflict group the row with the smallest `dist_total` keeps the archive
/// window (exact tie: the earliest draft row); each loser is rematched at
/// zero tolerance against the archive minus every window committed anywhere
/// in the current draft, so a rematch can never collide with a
/// non-conflicting row. Rematch distances use the full archive's dominant
/// window length, so depleting the reduced set never shifts the trend
/// rescale factor. The reduced archive strictly shrinks every iteration,
/// which bounds the loop.
pub fn remove_duplicates<R: Rng + ?Sized>(
    draft: Vec<MatchRecord>,
    archive: &[WindowRecord],
    rng: &mut R,
) -> Result<Vec<MatchRecord>, StitchError> {
    validate_windows(archive, "archive")?;
    if draft.is_empty() {
        return Err(StitchError::precondition(
            "draft must contain at least one row",
        ));
    }

    let mut target_keys: BTreeSet<WindowKey> = BTreeSet::new();
    for row in &draft {
        if !target_keys.insert(row.target.key()) {
            return Err(StitchError::precondition(format!(
                "draft is not one-to-one: target window {:?} appears more than once",
                row.target.key()
            )));
        }
    }

    let window_len = dominant_window_length(archive)?;
    let mut draft = draft;
    let mut previous_reduced_len = archive.len() + 1;

    // Each pass commits at least one new archive window, so the reduced
    // archive length is a strictly decreasing loop variant.
    for _ in 0..=archive.len() {
        let conflicts = conflict_groups(&draft);
        if conflicts.is_empty() {
            return Ok(draft);
        }

        let committed: BTreeSet<WindowKey> = draft.iter().map(|row| row.archive.key()).collect();
        let reduced: Vec<WindowRecord> = archive
            .iter()
            .filter(|window| !committed.contains(&window.key()))
            .cloned()
            .collect();
        if reduced.is_empty() {
            return Err(StitchError::invalid_input(
                "archive exhausted while resolving duplicate matches",
            ));
        }
        if reduced.len() >= previous_reduced_len {
            return Err(StitchError::invalid_input(
                "duplicate resolution made no progress; internal state is inconsistent",
            ));
        }
        previous_reduced_len = reduced.len();

        for loser_idx in losers(&draft, &conflicts) {
            let target = draft[loser_idx].target.clone();
            let mut candidates = compatible_windows(&target, &reduced);
            if candidates.is_empty() {
                return Err(StitchError::invalid_input(format!(
                    "no rematch candidate for target window {:?}",
                    target.key()
                )));
            }
            candidates.shuffle(rng);
            let best = nearest_matches(&target, &candidates, window_len, 0.0)?
                .into_iter()
                .min_by(|a, b| a.dist_total.total_cmp(&b.dist_total))
                .ok_or_else(|| {
                    StitchError::invalid_input(format!(
                        "no rematch candidate for target window {:?}",
                        target.key()
                    ))
                })?;
            draft[loser_idx] = best;
        }
    }

    Err(StitchError::invalid_input(
        "duplicate resolution exceeded its iteration bound",
    ))
}

/// Groups draft row indices by claimed archive window, keeping only groups
/// with more than one claimant.
fn conflict_groups(draft: &[MatchRecord]) -> BTreeMap<WindowKey, Vec<usize>> {
    let mut groups: BTreeMap<WindowKey, Vec<usize>> = BTreeMap::new();
    for (idx, row) in draft.iter().enumerate() {
        groups.entry(row.archive.key()).or_default().push(idx);
    }
    groups.retain(|_, claimants| claimants.len() > 1);
    groups
}

/// Row indices that lost their conflict group and need a rematch.
fn losers(draft: &[MatchRecord], conflicts: &BTreeMap<WindowKey, Vec<usize>>) -> Vec<usize> {
    let mut out = Vec::new();
    for claimants in conflicts.values() {
        let winner = claimants
            .iter()
            .copied()
            .min_by(|&a, &b| draft[a].dist_total.total_cmp(&draft[b].dist_total))
            .unwrap_or(claimants[0]);
        out.extend(claimants.iter().copied().filter(|&idx| idx != winner));
    }
    out.sort_unstable();
    out
}
