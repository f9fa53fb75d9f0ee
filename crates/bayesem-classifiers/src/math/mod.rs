//! Numeric helpers shared by the classifiers.
//!
//! Provides log-space normalisation (`log_sum_exp`, `softmax`) and the
//! Newton-Raphson root finder used by the feature-marginals estimator.
pub mod newton_raphson;

use std::collections::{BTreeMap, HashMap};

pub use newton_raphson::{DifferentiableFunction, NewtonRaphsonSolver};

/// `log(sum(exp(x)))` computed with max subtraction.
///
/// Returns negative infinity for an empty input.
pub fn log_sum_exp<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64> + Clone,
{
    let max = values
        .clone()
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.into_iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Normalise unnormalised log scores into a probability distribution.
///
/// The max score is subtracted before exponentiating so the largest term is
/// exactly `exp(0) = 1` and nothing overflows. NaN scores count as `-inf`.
/// Without a finite max the mass is shared equally by the `+inf` scores, or
/// by every key when all scores are `-inf`.
pub fn softmax<K: Ord + Copy>(log_scores: &BTreeMap<K, f64>) -> BTreeMap<K, f64> {
    let max = log_scores
        .values()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        let top = log_scores.values().filter(|&&v| v == max).count();
        let share = if top > 0 {
            1.0 / top as f64
        } else {
            1.0 / log_scores.len() as f64
        };
        return log_scores
            .iter()
            .map(|(&k, &v)| (k, if top == 0 || v == max { share } else { 0.0 }))
            .collect();
    }
    let mut out: BTreeMap<K, f64> = log_scores
        .iter()
        .map(|(&k, &v)| (k, if v.is_nan() { 0.0 } else { (v - max).exp() }))
        .collect();
    let sum: f64 = out.values().sum();
    for value in out.values_mut() {
        *value /= sum;
    }
    out
}

/// Key of the largest value. Ties resolve to the smallest key; NaN ranks
/// as `-inf`.
pub fn argmax<K: Ord + Copy>(scores: &BTreeMap<K, f64>) -> Option<K> {
    let mut best: Option<(K, f64)> = None;
    for (&k, &v) in scores {
        let v = if v.is_nan() { f64::NEG_INFINITY } else { v };
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((k, v)),
        }
    }
    best.map(|(k, _)| k)
}

/// Scale the values of `map` so they sum to one. No-op when the sum is zero.
pub fn normalise_in_place<K>(map: &mut HashMap<K, f64>) {
    let total: f64 = map.values().sum();
    if total > 0.0 {
        for value in map.values_mut() {
            *value /= total;
        }
    }
}
