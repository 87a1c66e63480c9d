// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::resolver::remove_duplicates;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use stitch_core::{
    validate_windows, Diagnostics, DrawMode, MatchRecord, Recipe, RecipeCollection, StitchError,
    TrajectoryKey, WindowKey, WindowRecord,
};

/// Defensive cap on redraws per target trajectory. Hitting it degrades the
/// call to a partial result with a warning, never an error.
pub const MAX_DRAW_ATTEMPTS: usize = 10_000;

type CandidatePool = BTreeMap<TrajectoryKey, BTreeMap<WindowKey, Vec<MatchRecord>>>;

/// Builds up to `requested` collapse-free recipes per target trajectory in
/// `match_table` by repeated random one-to-one draws through the duplicate
/// resolver.
///
/// Target trajectories must all belong to one experiment (ensembles of that
/// experiment are fine). Trajectories are served most-constrained first:
/// accepted recipes retire their archive windows from the pool shared by
/// every trajectory, so the trajectory with the fewest options anywhere goes
/// first to maximize total yield. When the archive cannot support the
/// requested count the engine returns what it achieved and notes the
/// shortfall in `Diagnostics::warnings`.
///
/// With `DrawMode::Seeded`, two calls on identical inputs produce identical
/// recipe collections.
pub fn permute_stitching_recipes(
    requested: usize,
    match_table: &[MatchRecord],
    archive: &[WindowRecord],
    mode: DrawMode,
) -> Result<RecipeCollection, StitchError> {
    let started = Instant::now();
    if requested == 0 {
        return Err(StitchError::invalid_input(
            "requested recipe count must be >= 1; got 0",
        ));
    }
    if match_table.is_empty() {
        return Err(StitchError::schema(
            "match table must contain at least one row",
        ));
    }
    validate_windows(archive, "archive")?;

    let experiments: BTreeSet<&str> = match_table
        .iter()
        .map(|row| row.target.experiment.as_str())
        .collect();
    if experiments.len() > 1 {
        return Err(StitchError::precondition(format!(
            "targets must share one experiment; got {:?}",
            experiments
        )));
    }

    let mut pool: CandidatePool = BTreeMap::new();
    for row in match_table {
        pool.entry(row.target.trajectory())
            .or_default()
            .entry(row.target.key())
            .or_default()
            .push(row.clone());
    }

    // Most-constrained trajectory first: its yield is bounded by its
    // thinnest window, and it suffers most from pool depletion.
    let mut order: Vec<(usize, TrajectoryKey)> = pool
        .iter()
        .map(|(trajectory, windows)| {
            let min_matches = windows
                .values()
                .map(Vec::len)
                .min()
                .unwrap_or(0);
            (min_matches, trajectory.clone())
        })
        .collect();
    order.sort();

    let mut rng = mode.rng();
    let mut diagnostics = Diagnostics {
        seed: mode.seed(),
        ..Diagnostics::default()
    };
    diagnostics
        .notes
        .push(format!("trajectories={}, requested={requested}", order.len()));

    let mut collection = RecipeCollection::new(Diagnostics::default());
    let mut used_archive: BTreeSet<WindowKey> = BTreeSet::new();
    let mut accepted_pair_sets: Vec<BTreeSet<(WindowKey, WindowKey)>> = Vec::new();
    let mut sequence = 0usize;

    for (min_matches, trajectory) in order {
        diagnostics.notes.push(format!(
            "target {}/{}/{}/{}: min_matches={min_matches}",
            trajectory.variable, trajectory.experiment, trajectory.ensemble, trajectory.model
        ));

        let mut accepted_here = 0usize;
        let mut attempts = 0usize;

        loop {
            if accepted_here >= requested {
                break;
            }
            let Some(windows) = pool.get(&trajectory) else {
                break;
            };
            if windows.values().any(Vec::is_empty) {
                break;
            }
            if attempts >= MAX_DRAW_ATTEMPTS {
                diagnostics.warnings.push(format!(
                    "draw attempt cap ({MAX_DRAW_ATTEMPTS}) reached for ensemble {}; accepted {accepted_here}",
                    trajectory.ensemble
                ));
                break;
            }
            attempts += 1;

            let draft: Vec<MatchRecord> = windows
                .values()
                .map(|candidates| candidates[rng.gen_range(0..candidates.len())].clone())
                .collect();

            // A failed resolution rejects this draw, not the trajectory.
            let Ok(resolved) = remove_duplicates(draft, archive, &mut rng) else {
                continue;
            };

            let pairs: BTreeSet<(WindowKey, WindowKey)> =
                resolved.iter().map(MatchRecord::pair).collect();
            if accepted_pair_sets.contains(&pairs) {
                // Degenerate resample of an already-accepted recipe.
                continue;
            }
            if resolved
                .iter()
                .any(|row| used_archive.contains(&row.archive.key()))
            {
                // The resolver rematched onto a window an earlier recipe
                // already consumed.
                continue;
            }

            sequence += 1;
            let mut rows = resolved;
            rows.sort_by_key(|row| row.target.start_year);
            for row in &rows {
                used_archive.insert(row.archive.key());
            }
            let retired: BTreeSet<WindowKey> = rows.iter().map(|row| row.archive.key()).collect();

            collection.recipes.push(Recipe {
                stitching_id: format!(
                    "{}~{}~{sequence}",
                    trajectory.experiment, trajectory.ensemble
                ),
                target: trajectory.clone(),
                rows,
            });
            accepted_pair_sets.push(pairs);
            accepted_here += 1;

            retire_archive_windows(&mut pool, &retired);
        }

        if accepted_here < requested {
            diagnostics.warnings.push(format!(
                "insufficient matches for ensemble {} of {}: requested {requested}, accepted {accepted_here}",
                trajectory.ensemble, trajectory.experiment
            ));
        }
    }

    diagnostics.runtime_ms =
        Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
    collection.diagnostics = diagnostics;
    Ok(collection)
}

/// Sole mutation point of the shared candidate pool: removes the given
/// archive windows from every trajectory's candidate lists. This is what
/// prevents two synthetic trajectories from being built out of the same
/// archive segment.
fn retire_archive_windows(pool: &mut CandidatePool, retired: &BTreeSet<WindowKey>) {
    for windows in pool.values_mut() {
        for candidates in windows.values_mut() {
            candidates.retain(|row| !retired.contains(&row.archive.key()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::permute_stitching_recipes;
    use stitch_core::{DrawMode, MatchRecord, WindowRecord};

    fn window(experiment: &str, ensemble: &str, start: i32, level: f64) -> WindowRecord {
        WindowRecord {
            model: "MODEL-A".to_string(),
            experiment: experiment.to_string(),
            ensemble: ensemble.to_string(),
            variable: "tas".to_string(),
            start_year: start,
            end_year: start + 8,
            center_year: start + 4,
            level,
            trend: 0.0,
        }
    }

    fn matched(target: &WindowRecord, archive: &WindowRecord) -> MatchRecord {
        let dist_level = (archive.level - target.level).abs();
        MatchRecord {
            target: target.clone(),
            archive: archive.clone(),
            dist_level,
            dist_trend: 0.0,
            dist_total: dist_level,
        }
    }

    /// Two target windows, two archive candidates per window.
    fn small_problem() -> (Vec<MatchRecord>, Vec<WindowRecord>) {
        let targets = vec![
            window("ssp245", "r1", 1850, 0.10),
            window("ssp245", "r1", 1859, 0.20),
        ];
        let archive = vec![
            window("ssp245", "r2", 1850, 0.11),
            window("ssp245", "r3", 1850, 0.12),
            window("ssp245", "r2", 1859, 0.21),
            window("ssp245", "r3", 1859, 0.22),
        ];
        let mut table = Vec::new();
        for target in &targets {
            for candidate in &archive {
                if candidate.start_year == target.start_year {
                    table.push(matched(target, candidate));
                }
            }
        }
        (table, archive)
    }

    #[test]
    fn accepts_up_to_the_requested_count() {
        let (table, archive) = small_problem();
        let collection =
            permute_stitching_recipes(2, &table, &archive, DrawMode::Seeded(5))
                .expect("permutation should succeed");
        assert_eq!(collection.len(), 2);
        assert!(collection.diagnostics.warnings.is_empty());
    }

    #[test]
    fn stitching_ids_are_unique_and_labelled_by_target() {
        let (table, archive) = small_problem();
        let collection =
            permute_stitching_recipes(2, &table, &archive, DrawMode::Seeded(5))
                .expect("permutation should succeed");
        let mut ids: Vec<&str> = collection
            .recipes
            .iter()
            .map(|recipe| recipe.stitching_id.as_str())
            .collect();
        assert!(ids.iter().all(|id| id.starts_with("ssp245~r1~")));
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), collection.len());
    }

    #[test]
    fn shortfall_returns_partial_result_with_warning() {
        // One candidate per window: only one collapse-free recipe exists.
        let target = window("ssp245", "r1", 1850, 0.10);
        let candidate = window("ssp245", "r2", 1850, 0.11);
        let table = vec![matched(&target, &candidate)];
        let archive = vec![candidate];

        let collection =
            permute_stitching_recipes(2, &table, &archive, DrawMode::Seeded(5))
                .expect("permutation should succeed");
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.diagnostics.warnings.len(), 1);
        assert!(collection.diagnostics.warnings[0].contains("insufficient matches"));
        assert!(collection.diagnostics.warnings[0].contains("requested 2, accepted 1"));
    }

    #[test]
    fn rejects_mixed_target_experiments() {
        let target_a = window("ssp245", "r1", 1850, 0.10);
        let target_b = window("ssp126", "r1", 1850, 0.10);
        let candidate = window("ssp245", "r2", 1850, 0.11);
        let table = vec![matched(&target_a, &candidate), matched(&target_b, &candidate)];
        let archive = vec![candidate];

        let err = permute_stitching_recipes(1, &table, &archive, DrawMode::Seeded(5))
            .expect_err("mixed experiments must fail");
        assert_eq!(err.code(), "precondition_error");
    }

    #[test]
    fn rejects_zero_request_and_empty_match_table() {
        let (table, archive) = small_problem();
        let err = permute_stitching_recipes(0, &table, &archive, DrawMode::Seeded(5))
            .expect_err("zero request must fail");
        assert_eq!(err.code(), "invalid_input");

        let err = permute_stitching_recipes(1, &[], &archive, DrawMode::Seeded(5))
            .expect_err("empty match table must fail");
        assert_eq!(err.code(), "schema_error");
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let (table, archive) = small_problem();
        let mut a = permute_stitching_recipes(2, &table, &archive, DrawMode::Seeded(99))
            .expect("first run should succeed");
        let mut b = permute_stitching_recipes(2, &table, &archive, DrawMode::Seeded(99))
            .expect("second run should succeed");
        // Wall-clock runtime is the only field allowed to differ.
        a.diagnostics.runtime_ms = None;
        b.diagnostics.runtime_ms = None;
        assert_eq!(a, b);
    }

    #[test]
    fn records_seed_and_runtime_in_diagnostics() {
        let (table, archive) = small_problem();
        let collection = permute_stitching_recipes(1, &table, &archive, DrawMode::Seeded(5))
            .expect("permutation should succeed");
        assert_eq!(collection.diagnostics.seed, Some(5));
        assert!(collection.diagnostics.runtime_ms.is_some());
    }
}
