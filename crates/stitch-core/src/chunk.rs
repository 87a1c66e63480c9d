// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::window::{TrajectoryKey, WindowRecord};
use crate::StitchError;

/// Decomposes an annual series into contiguous fixed-length windows, each
/// summarized by a one-pass linear regression: `trend` is the fitted slope
/// in value-per-year and `level` is the fitted value at the window's center
/// year. The final window may be shorter than `window_len`.
///
/// `years` must be contiguous ascending annual steps aligned with `values`.
pub fn chunk_series(
    key: &TrajectoryKey,
    years: &[i32],
    values: &[f64],
    window_len: usize,
) -> Result<Vec<WindowRecord>, StitchError> {
    if window_len == 0 {
        return Err(StitchError::invalid_input("window_len must be >= 1; got 0"));
    }
    if years.is_empty() {
        return Err(StitchError::schema("series must contain at least one year"));
    }
    if years.len() != values.len() {
        return Err(StitchError::schema(format!(
            "series length mismatch: {} years vs {} values",
            years.len(),
            values.len()
        )));
    }
    for pair in years.windows(2) {
        if pair[1] != pair[0] + 1 {
            return Err(StitchError::schema(format!(
                "years must be contiguous ascending annual steps; got {} followed by {}",
                pair[0], pair[1]
            )));
        }
    }
    if let Some((idx, value)) = values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, v)| !v.is_finite())
    {
        return Err(StitchError::schema(format!(
            "value at year {} must be finite; got {value}",
            years[idx]
        )));
    }

    let mut out = Vec::with_capacity(years.len().div_ceil(window_len));
    for chunk_start in (0..years.len()).step_by(window_len) {
        let chunk_end = (chunk_start + window_len).min(years.len());
        let window_years = &years[chunk_start..chunk_end];
        let window_values = &values[chunk_start..chunk_end];
        let center_year = window_years[(window_years.len() - 1) / 2];
        let (level, trend) = fit_window(window_years, window_values, center_year);

        out.push(WindowRecord {
            model: key.model.clone(),
            experiment: key.experiment.clone(),
            ensemble: key.ensemble.clone(),
            variable: key.variable.clone(),
            start_year: window_years[0],
            end_year: *window_years.last().unwrap_or(&window_years[0]),
            center_year,
            level,
            trend,
        });
    }

    Ok(out)
}

fn fit_window(years: &[i32], values: &[f64], center_year: i32) -> (f64, f64) {
    let n = years.len() as f64;
    let mean_x = years.iter().map(|&y| f64::from(y)).sum::<f64>() / n;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&year, &value) in years.iter().zip(values) {
        let dx = f64::from(year) - mean_x;
        sxx += dx * dx;
        sxy += dx * (value - mean_y);
    }

    // A one-year window has no slope information.
    let trend = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let level = mean_y + trend * (f64::from(center_year) - mean_x);
    (level, trend)
}
