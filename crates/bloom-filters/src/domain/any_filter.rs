//! Either filter variant behind one type, plus a serializable stats report
//!
//! Used where the variant is only known at runtime, e.g. after reading a
//! filter back from its wire bytes.

use serde::{Deserialize, Serialize};

use super::bloom_filter::BloomFilter;
use super::counting_bloom::CountingBloomFilter;
use super::hash_functions::HashStrategy;
use super::parameters::FilterParameters;
use super::wire::{self, CellLayout};
use crate::error::FilterError;

/// A standard or counting filter
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnyFilter {
    Standard(BloomFilter),
    Counting(CountingBloomFilter),
}

impl AnyFilter {
    /// Empty filter of the requested variant
    pub fn empty(params: FilterParameters, counting: bool) -> Self {
        if counting {
            AnyFilter::Counting(CountingBloomFilter::from_params(params))
        } else {
            AnyFilter::Standard(BloomFilter::from_params(params))
        }
    }

    /// Decode whichever variant the wire header announces
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        wire::decode_any(bytes)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            AnyFilter::Standard(f) => f.to_bytes(),
            AnyFilter::Counting(f) => f.to_bytes(),
        }
    }

    pub fn insert(&mut self, element: &[u8]) {
        match self {
            AnyFilter::Standard(f) => f.insert(element),
            AnyFilter::Counting(f) => f.insert(element),
        }
    }

    pub fn contains(&self, element: &[u8]) -> bool {
        match self {
            AnyFilter::Standard(f) => f.contains(element),
            AnyFilter::Counting(f) => f.contains(element),
        }
    }

    pub fn params(&self) -> FilterParameters {
        match self {
            AnyFilter::Standard(f) => f.params(),
            AnyFilter::Counting(f) => f.params(),
        }
    }

    pub fn layout(&self) -> CellLayout {
        match self {
            AnyFilter::Standard(_) => CellLayout::Bits,
            AnyFilter::Counting(_) => CellLayout::Counters4,
        }
    }

    /// Point-in-time statistics
    pub fn stats(&self) -> FilterStats {
        let params = self.params();
        let (variant, cells_set, insertions, cardinality, fpr) = match self {
            AnyFilter::Standard(f) => (
                FilterVariant::Standard,
                f.bits_set(),
                f.insertions(),
                f.estimated_cardinality(),
                f.estimated_false_positive_rate(),
            ),
            AnyFilter::Counting(f) => {
                let projected = f.to_bloom_filter();
                (
                    FilterVariant::Counting,
                    f.nonzero_counters(),
                    f.insertions(),
                    projected.estimated_cardinality(),
                    f.estimated_false_positive_rate(),
                )
            }
        };

        FilterStats {
            variant,
            size_bits: params.size_bits(),
            hash_count: params.hash_count(),
            tweak: params.seed().tweak,
            strategy: params.seed().strategy,
            cells_set,
            fill_ratio: cells_set as f64 / params.size_bits() as f64,
            insertions,
            estimated_cardinality: cardinality.is_finite().then_some(cardinality),
            estimated_fpr: fpr,
        }
    }
}

impl From<BloomFilter> for AnyFilter {
    fn from(filter: BloomFilter) -> Self {
        AnyFilter::Standard(filter)
    }
}

impl From<CountingBloomFilter> for AnyFilter {
    fn from(filter: CountingBloomFilter) -> Self {
        AnyFilter::Counting(filter)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterVariant {
    Standard,
    Counting,
}

/// Statistics snapshot of a filter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub variant: FilterVariant,
    pub size_bits: usize,
    pub hash_count: usize,
    pub tweak: u32,
    pub strategy: HashStrategy,
    /// Set bits, or non-zero counters
    pub cells_set: usize,
    pub fill_ratio: f64,
    /// Tracked insertion count, absent when unknown
    pub insertions: Option<u64>,
    /// Absent once the filter is saturated
    pub estimated_cardinality: Option<f64>,
    pub estimated_fpr: f64,
}
