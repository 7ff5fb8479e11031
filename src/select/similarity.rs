//! Dataset similarity predicates
//!
//! Pure functions shared by the store backends and the resolver, so both
//! agree on what a tier admits.

use crate::catalog::{DatasetInfo, Features};

/// Slack added to every tolerance comparison so values written with two
/// decimals (0.55 vs 0.50) are not rejected by float representation error.
pub const TOLERANCE_EPSILON: f64 = 1e-9;

fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance + TOLERANCE_EPSILON
}

/// True when both datasets have nonzero ratios for exactly the same types.
pub fn matches_ratio_pattern(target: &DatasetInfo, candidate: &DatasetInfo) -> bool {
    target
        .ratios()
        .iter()
        .zip(candidate.ratios().iter())
        .all(|(t, c)| (*t != 0.0) == (*c != 0.0))
}

/// Ratio-pattern match, optionally banded by an absolute tolerance on every
/// nonzero ratio.
pub fn matches_ratios(target: &DatasetInfo, candidate: &DatasetInfo, tolerance: Option<f64>) -> bool {
    if !matches_ratio_pattern(target, candidate) {
        return false;
    }
    match tolerance {
        None => true,
        Some(tol) => target
            .ratios()
            .iter()
            .zip(candidate.ratios().iter())
            .filter(|(t, _)| **t != 0.0)
            .all(|(t, c)| within(*t, *c, tol)),
    }
}

/// The (monotonous filtering, mutual information) pair of every numerical
/// and categorical feature, tagged by kind. Features with undefined mutual
/// information are skipped.
fn comparable_features(features: &Features) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let numerical = features
        .numerical_features
        .values()
        .filter_map(|f| f.mutual_info.filter(|mi| mi.is_finite()).map(|mi| (f.monotonous_filtering, mi)))
        .collect();
    let categorical = features
        .categorical_features
        .values()
        .filter_map(|f| f.mutual_info.filter(|mi| mi.is_finite()).map(|mi| (f.monotonous_filtering, mi)))
        .collect();
    (numerical, categorical)
}

/// Share of the target's numerical and categorical features that have at
/// least one same-kind counterpart in the candidate within both tolerances.
///
/// Features with undefined mutual information never match but still count
/// in the denominator. Returns 0.0 when the target has no such features.
pub fn feature_match_ratio(
    target: &Features,
    candidate: &Features,
    monotonous_filtering_tolerance: f64,
    mutual_info_tolerance: f64,
) -> f64 {
    let (target_num, target_cat) = comparable_features(target);
    let (cand_num, cand_cat) = comparable_features(candidate);

    let total = target.numerical_features.len() + target.categorical_features.len();
    if total == 0 {
        return 0.0;
    }

    let matched_in = |wanted: &[(f64, f64)], pool: &[(f64, f64)]| {
        wanted
            .iter()
            .filter(|(mf, mi)| {
                pool.iter().any(|(cmf, cmi)| {
                    within(*mf, *cmf, monotonous_filtering_tolerance) && within(*mi, *cmi, mutual_info_tolerance)
                })
            })
            .count()
    };

    let matched = matched_in(&target_num, &cand_num) + matched_in(&target_cat, &cand_cat);
    matched as f64 / total as f64
}
