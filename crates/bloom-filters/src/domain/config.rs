//! Bloom filter configuration and validation
//!
//! # Example
//!
//! ```
//! use bloom_filters::domain::{BloomConfigBuilder, HashStrategy};
//!
//! let config = BloomConfigBuilder::new()
//!     .expected_elements(1000)
//!     .target_fpr(0.01)
//!     .strategy(HashStrategy::Seeded)
//!     .build()
//!     .expect("valid config");
//!
//! let params = config.parameters().unwrap();
//! assert_eq!(params.size_bits(), 9586);
//! ```

use serde::{Deserialize, Serialize};

use super::any_filter::AnyFilter;
use super::hash_functions::{HashSeed, HashStrategy};
use super::parameters::FilterParameters;
use crate::error::FilterError;

pub const DEFAULT_EXPECTED_ELEMENTS: usize = 1000;
pub const DEFAULT_TARGET_FPR: f64 = 0.01;

/// How the filter is sized
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Sizing {
    /// Explicit (m, k)
    Explicit { size_bits: usize, hash_count: usize },
    /// Derived from expected element count n and target false positive rate p
    Capacity {
        expected_elements: usize,
        target_fpr: f64,
    },
}

/// Bloom filter configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BloomConfig {
    pub sizing: Sizing,
    /// Seed tweak for position derivation
    pub tweak: u32,
    pub strategy: HashStrategy,
    /// Use 4-bit counters so elements can be removed
    pub counting: bool,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            sizing: Sizing::Capacity {
                expected_elements: DEFAULT_EXPECTED_ELEMENTS,
                target_fpr: DEFAULT_TARGET_FPR,
            },
            tweak: 0,
            strategy: HashStrategy::DoubleHashing,
            counting: false,
        }
    }
}

impl BloomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), FilterError> {
        self.parameters().map(|_| ())
    }

    /// Resolve the sizing into concrete filter parameters
    pub fn parameters(&self) -> Result<FilterParameters, FilterError> {
        let params = match self.sizing {
            Sizing::Explicit {
                size_bits,
                hash_count,
            } => FilterParameters::new(size_bits, hash_count)?,
            Sizing::Capacity {
                expected_elements,
                target_fpr,
            } => FilterParameters::for_capacity(expected_elements, target_fpr)?,
        };
        Ok(params.with_seed(self.seed()))
    }

    pub fn seed(&self) -> HashSeed {
        HashSeed::new(self.tweak, self.strategy)
    }

    /// Build an empty filter of the configured variant
    pub fn build_filter(&self) -> Result<AnyFilter, FilterError> {
        Ok(AnyFilter::empty(self.parameters()?, self.counting))
    }

    /// Builder-style method to set the seed tweak
    pub fn with_tweak(mut self, tweak: u32) -> Self {
        self.tweak = tweak;
        self
    }

    /// Builder-style method to set the hash strategy
    pub fn with_strategy(mut self, strategy: HashStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Builder for BloomConfig with validation
///
/// Either both of `size_bits`/`hash_count` or the capacity pair
/// `expected_elements`/`target_fpr` may be given, not a mix. Capacity
/// fields that are left out fall back to the defaults.
#[derive(Default)]
pub struct BloomConfigBuilder {
    size_bits: Option<usize>,
    hash_count: Option<usize>,
    expected_elements: Option<usize>,
    target_fpr: Option<f64>,
    tweak: Option<u32>,
    strategy: Option<HashStrategy>,
    counting: bool,
}

impl BloomConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter size in bits (m)
    pub fn size_bits(mut self, bits: usize) -> Self {
        self.size_bits = Some(bits);
        self
    }

    /// Set the number of hash positions (k)
    pub fn hash_count(mut self, k: usize) -> Self {
        self.hash_count = Some(k);
        self
    }

    /// Set the expected number of elements (n)
    pub fn expected_elements(mut self, n: usize) -> Self {
        self.expected_elements = Some(n);
        self
    }

    /// Set the target false positive rate (p), in (0, 1)
    pub fn target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = Some(fpr);
        self
    }

    pub fn tweak(mut self, tweak: u32) -> Self {
        self.tweak = Some(tweak);
        self
    }

    pub fn strategy(mut self, strategy: HashStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Request the counting variant
    pub fn counting(mut self, counting: bool) -> Self {
        self.counting = counting;
        self
    }

    /// Build the BloomConfig, validating all parameters
    pub fn build(self) -> Result<BloomConfig, FilterError> {
        let defaults = BloomConfig::default();
        let explicit = self.size_bits.is_some() || self.hash_count.is_some();
        let capacity = self.expected_elements.is_some() || self.target_fpr.is_some();

        let sizing = match (explicit, capacity) {
            (true, true) => {
                return Err(FilterError::invalid(
                    "give either size_bits/hash_count or expected_elements/target_fpr, not both",
                ))
            }
            (true, false) => match (self.size_bits, self.hash_count) {
                (Some(size_bits), Some(hash_count)) => Sizing::Explicit {
                    size_bits,
                    hash_count,
                },
                _ => {
                    return Err(FilterError::invalid(
                        "size_bits and hash_count must be given together",
                    ))
                }
            },
            (false, _) => Sizing::Capacity {
                expected_elements: self.expected_elements.unwrap_or(DEFAULT_EXPECTED_ELEMENTS),
                target_fpr: self.target_fpr.unwrap_or(DEFAULT_TARGET_FPR),
            },
        };

        let config = BloomConfig {
            sizing,
            tweak: self.tweak.unwrap_or(defaults.tweak),
            strategy: self.strategy.unwrap_or(defaults.strategy),
            counting: self.counting,
        };

        config.validate()?;
        Ok(config)
    }
}
