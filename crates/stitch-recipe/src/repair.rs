// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use stitch_core::{
    ExperimentKind, Recipe, RecipeCollection, StitchError, StitchRow, HISTORICAL_CUTOFF_YEAR,
};

/// Maps an archive identity to a physical data source. Implemented by an
/// external catalog collaborator; the repair pass only consumes it.
pub trait SourceCatalog {
    fn resolve(
        &self,
        model: &str,
        experiment: &str,
        ensemble: &str,
        variable: &str,
    ) -> Option<String>;
}

/// Corrects one-year target/archive length mismatches on a recipe's rows:
/// the archive end year is trimmed when the archive runs one year long, and
/// the archive start year is moved back when it runs one year short. The
/// short case is an archive trajectory's truncated final window, which
/// already ends at the last year with data behind it, so the extra year has
/// to come from the start. The common trigger either way is a trajectory's
/// final window.
///
/// Mismatches greater than one year are surfaced as
/// `StitchError::LengthMismatch`, never silently patched.
pub fn correct_final_lengths(recipe: &mut Recipe) -> Result<(), StitchError> {
    for row in &mut recipe.rows {
        let delta = row.archive.length() - row.target.length();
        match delta {
            0 => {}
            1 => {
                row.archive.end_year -= 1;
                // Keep the center inside the trimmed range.
                row.archive.center_year = row.archive.center_year.min(row.archive.end_year);
            }
            -1 => {
                row.archive.start_year -= 1;
            }
            _ => {
                return Err(StitchError::length_mismatch(format!(
                    "recipe {}: target {}..={} ({} years) vs archive {}..={} ({} years); only one-year mismatches are corrected",
                    recipe.stitching_id,
                    row.target.start_year,
                    row.target.end_year,
                    row.target.length(),
                    row.archive.start_year,
                    row.archive.end_year,
                    row.archive.length(),
                )));
            }
        }
    }
    Ok(())
}

/// Splits rows whose scenario-labelled archive window spans the
/// historical/scenario boundary into a historical sub-row and a scenario
/// sub-row, dividing the target range so each sub-row's target length equals
/// its archive length. Rows already on one side of the boundary pass through
/// unchanged, so applying the split twice is a no-op.
pub fn split_boundary_rows(rows: Vec<StitchRow>, cutoff_year: i32) -> Vec<StitchRow> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let spans_boundary = row.archive_start_year < cutoff_year
            && row.archive_end_year >= cutoff_year
            && ExperimentKind::classify(&row.archive_experiment) == ExperimentKind::Scenario;
        if !spans_boundary {
            out.push(row);
            continue;
        }

        let historical_len = cutoff_year - row.archive_start_year;
        out.push(StitchRow {
            target_end_year: row.target_start_year + historical_len - 1,
            archive_experiment: "historical".to_string(),
            archive_end_year: cutoff_year - 1,
            archive_source: None,
            ..row.clone()
        });
        out.push(StitchRow {
            target_start_year: row.target_start_year + historical_len,
            archive_start_year: cutoff_year,
            archive_source: None,
            ..row
        });
    }
    out
}

/// Runs the full repair pass over an accepted recipe collection: one-year
/// length correction, flattening to stitching-ready rows, then the boundary
/// split at the historical/scenario cutoff.
pub fn repair_recipes(collection: &RecipeCollection) -> Result<Vec<StitchRow>, StitchError> {
    let mut rows = Vec::new();
    for recipe in &collection.recipes {
        let mut repaired = recipe.clone();
        correct_final_lengths(&mut repaired)?;
        rows.extend(flatten(&repaired));
    }
    Ok(split_boundary_rows(rows, HISTORICAL_CUTOFF_YEAR))
}

fn flatten(recipe: &Recipe) -> Vec<StitchRow> {
    recipe
        .rows
        .iter()
        .map(|row| StitchRow {
            target_start_year: row.target.start_year,
            target_end_year: row.target.end_year,
            archive_experiment: row.archive.experiment.clone(),
            archive_variable: row.archive.variable.clone(),
            archive_model: row.archive.model.clone(),
            archive_ensemble: row.archive.ensemble.clone(),
            stitching_id: recipe.stitching_id.clone(),
            archive_start_year: row.archive.start_year,
            archive_end_year: row.archive.end_year,
            archive_source: None,
        })
        .collect()
}

/// Fills `archive_source` on each row from the external catalog. Rows the
/// catalog cannot resolve keep `None`; deciding whether that is fatal is the
/// caller's policy.
pub fn join_sources<C: SourceCatalog + ?Sized>(rows: &mut [StitchRow], catalog: &C) {
    for row in rows {
        row.archive_source = catalog.resolve(
            &row.archive_model,
            &row.archive_experiment,
            &row.archive_ensemble,
            &row.archive_variable,
        );
    }
}
