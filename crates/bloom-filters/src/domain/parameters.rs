//! Bloom filter parameters and sizing formulas
//!
//! Formulas:
//! - m = ceil(-n*ln(p) / (ln(2)^2))   -- optimal bits
//! - k = round((m/n) * ln(2)), k >= 1 -- optimal hash functions
//! - FPR = (1 - e^(-kn/m))^k
//! - n_est = -(m/k) * ln(1 - ones/m)  -- cardinality from fill

use std::f64::consts::LN_2;
use std::fmt;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use super::hash_functions::HashSeed;
use crate::error::FilterError;

/// Immutable filter shape: size, hash count and seed material
///
/// Two filters can only be combined when their parameters are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterParameters {
    /// Number of cells in the filter (m)
    size_bits: usize,
    /// Number of hash positions per key (k)
    hash_count: usize,
    /// Seed material for position derivation
    seed: HashSeed,
}

impl FilterParameters {
    /// Explicit (m, k) with the default seed
    pub fn new(size_bits: usize, hash_count: usize) -> Result<Self, FilterError> {
        Self::with_seed_checked(size_bits, hash_count, HashSeed::default())
    }

    /// Optimal (m, k) for `expected_elements` at `target_fpr`
    pub fn for_capacity(expected_elements: usize, target_fpr: f64) -> Result<Self, FilterError> {
        let size_bits = minimum_bits(expected_elements, target_fpr)?;
        let hash_count = optimal_k(size_bits, expected_elements);
        Self::new(size_bits, hash_count)
    }

    fn with_seed_checked(
        size_bits: usize,
        hash_count: usize,
        seed: HashSeed,
    ) -> Result<Self, FilterError> {
        if size_bits == 0 {
            return Err(FilterError::invalid("size_bits (m) must be > 0"));
        }
        if size_bits > BitSlice::<u8, Msb0>::MAX_BITS {
            return Err(FilterError::invalid(format!(
                "size_bits (m) must be at most {}, got {}",
                BitSlice::<u8, Msb0>::MAX_BITS,
                size_bits
            )));
        }
        if hash_count == 0 {
            return Err(FilterError::invalid("hash_count (k) must be > 0"));
        }
        if u32::try_from(hash_count).is_err() {
            return Err(FilterError::invalid(format!(
                "hash_count (k) must fit in 32 bits, got {}",
                hash_count
            )));
        }
        Ok(Self {
            size_bits,
            hash_count,
            seed,
        })
    }

    /// Same (m, k) with different seed material
    pub fn with_seed(mut self, seed: HashSeed) -> Self {
        self.seed = seed;
        self
    }

    pub fn size_bits(&self) -> usize {
        self.size_bits
    }

    pub fn hash_count(&self) -> usize {
        self.hash_count
    }

    pub fn seed(&self) -> HashSeed {
        self.seed
    }

    /// Theoretical false positive rate after `n` distinct insertions
    pub fn expected_fpr(&self, n: usize) -> f64 {
        calculate_fpr(self.size_bits, n as f64, self.hash_count)
    }
}

impl fmt::Display for FilterParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(m={}, k={}, seed={})",
            self.size_bits, self.hash_count, self.seed
        )
    }
}

/// Calculate the false positive rate for given parameters
///
/// Formula: FPR = (1 - e^(-kn/m))^k. `n` is a float so that cardinality
/// estimates can be fed in directly.
pub fn calculate_fpr(m: usize, n: f64, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    if n <= 0.0 {
        return 0.0;
    }
    let exponent = -(k as f64) * n / (m as f64);
    (1.0 - exponent.exp()).powf(k as f64)
}

/// Calculate optimal k for given m and n (never below 1)
pub fn optimal_k(m: usize, n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    let k = ((m as f64 / n as f64) * LN_2).round() as usize;
    k.max(1)
}

/// Calculate minimum m for given n and target FPR
pub fn minimum_bits(n: usize, target_fpr: f64) -> Result<usize, FilterError> {
    if n == 0 {
        return Err(FilterError::invalid("expected_elements (n) must be > 0"));
    }
    // Written to also reject NaN
    if !(target_fpr > 0.0 && target_fpr < 1.0) {
        return Err(FilterError::invalid(format!(
            "target_fpr (p) must be in (0, 1), got {}",
            target_fpr
        )));
    }

    let ln2_squared = LN_2 * LN_2;
    let m = (-(n as f64) * target_fpr.ln() / ln2_squared).ceil();
    if !m.is_finite() || m > usize::MAX as f64 {
        return Err(FilterError::invalid(format!(
            "filter for n={} at p={} does not fit in memory",
            n, target_fpr
        )));
    }
    Ok((m as usize).max(1))
}

/// Estimate how many distinct elements produced `ones` set bits
///
/// Returns `f64::INFINITY` for a saturated array, where the estimate
/// diverges.
pub fn estimate_cardinality(m: usize, k: usize, ones: usize) -> f64 {
    if ones == 0 || m == 0 || k == 0 {
        return 0.0;
    }
    if ones >= m {
        return f64::INFINITY;
    }
    let m = m as f64;
    -(m / k as f64) * (1.0 - ones as f64 / m).ln()
}
