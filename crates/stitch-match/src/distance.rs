// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use stitch_core::{MatchRecord, StitchError, WindowRecord};

/// Computes the two-dimensional level/trend distance from one target window
/// to every archive window and returns the subset within `min + tol`.
///
/// `dist_level = |archive.level − target.level|`,
/// `dist_trend = window_len · |archive.trend − target.trend|` (trend
/// rescaled into level units by the archive's dominant window length), and
/// `dist_total = sqrt(dist_level² + dist_trend²)`.
///
/// The result is never empty: the nearest neighbor is always included. When
/// several archive windows tie exactly for the minimum, the first one in
/// `archive` iteration order is the minimum; callers that need unbiased
/// ties shuffle the archive first (the neighborhood matcher does).
pub fn nearest_matches(
    target: &WindowRecord,
    archive: &[WindowRecord],
    window_len: i32,
    tol: f64,
) -> Result<Vec<MatchRecord>, StitchError> {
    if !tol.is_finite() || tol < 0.0 {
        return Err(StitchError::invalid_input(format!(
            "tol must be finite and >= 0; got {tol}"
        )));
    }
    if window_len < 1 {
        return Err(StitchError::invalid_input(format!(
            "window_len must be >= 1; got {window_len}"
        )));
    }
    if archive.is_empty() {
        return Err(StitchError::schema(
            "archive must contain at least one window",
        ));
    }

    let scored: Vec<MatchRecord> = archive
        .iter()
        .map(|candidate| {
            let dist_level = (candidate.level - target.level).abs();
            let dist_trend = f64::from(window_len) * (candidate.trend - target.trend).abs();
            MatchRecord {
                target: target.clone(),
                archive: candidate.clone(),
                dist_level,
                dist_trend,
                dist_total: dist_level.hypot(dist_trend),
            }
        })
        .collect();

    let min_total = scored
        .iter()
        .map(|record| record.dist_total)
        .min_by(f64::total_cmp)
        .unwrap_or(f64::INFINITY);
    let threshold = min_total + tol;

    Ok(scored
        .into_iter()
        .filter(|record| record.dist_total <= threshold)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::nearest_matches;
    use stitch_core::WindowRecord;

    fn window(ensemble: &str, start: i32, level: f64, trend: f64) -> WindowRecord {
        WindowRecord {
            model: "MODEL-A".to_string(),
            experiment: "ssp245".to_string(),
            ensemble: ensemble.to_string(),
            variable: "tas".to_string(),
            start_year: start,
            end_year: start + 8,
            center_year: start + 4,
            level,
            trend,
        }
    }

    #[test]
    fn distances_follow_the_level_trend_metric() {
        let target = window("r1", 1850, 1.0, 0.01);
        let archive = vec![window("r2", 1850, 1.3, 0.05)];
        let matches =
            nearest_matches(&target, &archive, 9, 0.0).expect("matching should succeed");

        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert!((m.dist_level - 0.3).abs() < 1e-12);
        assert!((m.dist_trend - 0.36).abs() < 1e-12);
        assert!((m.dist_total - (0.3_f64.powi(2) + 0.36_f64.powi(2)).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn zero_tolerance_keeps_only_the_nearest_neighbor() {
        let target = window("r1", 1850, 1.0, 0.0);
        let archive = vec![
            window("r2", 1850, 1.5, 0.0),
            window("r3", 1859, 1.1, 0.0),
            window("r4", 1868, 2.0, 0.0),
        ];
        let matches =
            nearest_matches(&target, &archive, 9, 0.0).expect("matching should succeed");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].archive.ensemble, "r3");
    }

    #[test]
    fn tolerance_band_admits_near_ties() {
        let target = window("r1", 1850, 1.0, 0.0);
        let archive = vec![
            window("r2", 1850, 1.10, 0.0),
            window("r3", 1859, 1.12, 0.0),
            window("r4", 1868, 2.0, 0.0),
        ];
        let matches =
            nearest_matches(&target, &archive, 9, 0.05).expect("matching should succeed");
        let ensembles: Vec<&str> = matches
            .iter()
            .map(|m| m.archive.ensemble.as_str())
            .collect();
        assert_eq!(ensembles, vec!["r2", "r3"]);
    }

    #[test]
    fn exact_ties_are_all_within_the_zero_band() {
        let target = window("r1", 1850, 1.0, 0.0);
        let archive = vec![window("r2", 1850, 1.2, 0.0), window("r3", 1859, 0.8, 0.0)];
        let matches =
            nearest_matches(&target, &archive, 9, 0.0).expect("matching should succeed");
        // Equidistant candidates are both at the minimum.
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn rejects_negative_and_non_finite_tolerance() {
        let target = window("r1", 1850, 1.0, 0.0);
        let archive = vec![window("r2", 1850, 1.0, 0.0)];

        let err = nearest_matches(&target, &archive, 9, -0.1).expect_err("negative tol fails");
        assert!(err.to_string().contains("tol must be finite and >= 0"));

        let err =
            nearest_matches(&target, &archive, 9, f64::NAN).expect_err("nan tol fails");
        assert!(err.to_string().contains("tol must be finite and >= 0"));
    }

    #[test]
    fn rejects_empty_archive_and_bad_window_len() {
        let target = window("r1", 1850, 1.0, 0.0);

        let err = nearest_matches(&target, &[], 9, 0.0).expect_err("empty archive fails");
        assert!(err.to_string().contains("at least one window"));

        let archive = vec![window("r2", 1850, 1.0, 0.0)];
        let err =
            nearest_matches(&target, &archive, 0, 0.0).expect_err("zero window_len fails");
        assert!(err.to_string().contains("window_len"));
    }
}
