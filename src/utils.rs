use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use std::ops::{Add, Mul, Neg, Sub};

/// The numeric interface used by scoring.
///
/// Log-space arithmetic in this crate is written against `Real` rather than `f64` so that a
/// caller can score summaries with a value that carries more than a float, such as a dual
/// number tracking derivatives with respect to production weights.
pub trait Real:
    Clone
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    fn from_f64(x: f64) -> Self;
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn neg_infinity() -> Self {
        Self::from_f64(f64::NEG_INFINITY)
    }
    fn zero() -> Self {
        Self::from_f64(0f64)
    }
}

impl Real for f64 {
    fn from_f64(x: f64) -> Self {
        x
    }
    fn exp(self) -> Self {
        f64::exp(self)
    }
    fn ln(self) -> Self {
        f64::ln(self)
    }
}

impl Real for f32 {
    fn from_f64(x: f64) -> Self {
        x as f32
    }
    fn exp(self) -> Self {
        f32::exp(self)
    }
    fn ln(self) -> Self {
        f32::ln(self)
    }
}

/// `ln(Σ exp(x))`, computed stably. The empty sum is negative infinity.
pub fn logsumexp<R: Real>(lps: &[R]) -> R {
    let largest = lps.iter().cloned().fold(R::neg_infinity(), |acc, lp| {
        if lp > acc {
            lp
        } else {
            acc
        }
    });
    if !(largest > R::neg_infinity()) {
        return largest;
    }
    let total = lps
        .iter()
        .cloned()
        .map(|lp| (lp - largest.clone()).exp())
        .fold(R::zero(), |acc, x| acc + x);
    largest + total.ln()
}

/// Picks an index with probability proportional to its (non-negative) weight.
///
/// Returns `None` if every weight is zero.
pub fn weighted_index<R: Rng>(rng: &mut R, ws: &[f64]) -> Option<usize> {
    WeightedIndex::<f64>::new(ws)
        .ok()
        .map(|dist| dist.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn logsumexp_matches_naive_sum() {
        let xs = [-1.0, -2.0, -0.5];
        let naive = xs.iter().map(|x: &f64| x.exp()).sum::<f64>().ln();
        assert!((logsumexp(&xs) - naive).abs() < 1e-12);
    }

    #[test]
    fn logsumexp_handles_negative_values_only() {
        // all values below zero must not be clamped to zero
        let xs = [-10.0, -10.0];
        assert!((logsumexp(&xs) - (-10.0 + 2f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn logsumexp_of_nothing_is_negative_infinity() {
        let xs: [f64; 0] = [];
        assert_eq!(logsumexp(&xs), f64::NEG_INFINITY);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }

    #[test]
    fn weighted_index_skips_zero_weights() {
        let rng = &mut SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            let i = weighted_index(rng, &[0.0, 1.0, 0.0, 2.0]).unwrap();
            assert!(i == 1 || i == 3);
        }
        assert_eq!(weighted_index(rng, &[0.0, 0.0]), None);
    }
}
