//! Core Bloom Filter implementation
//!
//! INVARIANTS:
//! - No false negatives: once inserted, `contains()` returns true forever
//! - The bit array length is fixed at construction
//! - Bits only ever go 0 -> 1; there is no way back to empty short of
//!   building a new filter

use bitvec::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use super::hash_functions::{HashPositions, HashSeed};
use super::parameters::{calculate_fpr, estimate_cardinality, FilterParameters};
use super::wire;
use crate::error::FilterError;

/// Bloom filter for probabilistic membership testing
///
/// A Bloom filter is a space-efficient probabilistic data structure that
/// can test whether an element is a member of a set. False positives are
/// possible, but false negatives are not. Keys are opaque bytes; the filter
/// never stores them, only the bits their hash positions select.
///
/// The filter has no internal synchronization. Share it across threads
/// behind a lock (see [`crate::SharedBloomFilter`]) or hand whole copies
/// between owners.
#[derive(Clone, Debug)]
pub struct BloomFilter {
    /// Bit array, bit `i` at byte `i / 8`, most significant bit first
    bits: BitVec<u8, Msb0>,
    /// Shape: m, k and seed
    params: FilterParameters,
    /// Insertions observed by this value, `None` when unknown
    insertions: Option<u64>,
}

impl BloomFilter {
    /// Create a new Bloom filter with explicit size and hash count
    ///
    /// # Arguments
    /// * `m` - Size in bits
    /// * `k` - Number of hash functions
    pub fn new(m: usize, k: usize) -> Result<Self, FilterError> {
        Ok(Self::from_params(FilterParameters::new(m, k)?))
    }

    /// Create a new Bloom filter with optimal parameters for target FPR
    ///
    /// # Arguments
    /// * `expected_elements` - Expected number of elements (n)
    /// * `target_fpr` - Target false positive rate, in (0, 1)
    pub fn with_capacity(expected_elements: usize, target_fpr: f64) -> Result<Self, FilterError> {
        Ok(Self::from_params(FilterParameters::for_capacity(
            expected_elements,
            target_fpr,
        )?))
    }

    /// Create an empty filter with already validated parameters
    pub fn from_params(params: FilterParameters) -> Self {
        debug!("[BloomFilter] Created filter {}", params);
        Self {
            bits: bitvec![u8, Msb0; 0; params.size_bits()],
            params,
            insertions: Some(0),
        }
    }

    /// Rebuild a filter from a bit array of matching length
    pub(crate) fn from_raw_parts(
        params: FilterParameters,
        bits: BitVec<u8, Msb0>,
        insertions: Option<u64>,
    ) -> Self {
        debug_assert_eq!(bits.len(), params.size_bits());
        Self {
            bits,
            params,
            insertions,
        }
    }

    /// Positions tested for `element`
    pub fn positions<'a>(&self, element: &'a [u8]) -> HashPositions<'a> {
        HashPositions::new(
            element,
            self.params.hash_count(),
            self.params.size_bits(),
            self.params.seed(),
        )
    }

    /// Insert an element into the filter
    ///
    /// After insertion, `contains(element)` is guaranteed to return true.
    /// Inserting the same element again leaves the bits unchanged.
    pub fn insert(&mut self, element: &[u8]) {
        let positions = self.positions(element);
        self.insert_positions(positions);
    }

    pub(crate) fn insert_positions(&mut self, positions: impl IntoIterator<Item = usize>) {
        for pos in positions {
            self.bits.set(pos, true);
        }
        self.insertions = self.insertions.map(|n| n.saturating_add(1));
    }

    /// Test if an element might be in the filter
    ///
    /// Returns:
    /// - `true` if the element might be in the set (could be false positive)
    /// - `false` if the element is definitely NOT in the set
    ///
    /// Stops at the first clear bit.
    pub fn contains(&self, element: &[u8]) -> bool {
        self.contains_positions(self.positions(element))
    }

    pub(crate) fn contains_positions(&self, mut positions: impl Iterator<Item = usize>) -> bool {
        positions.all(|pos| self.bits[pos])
    }

    /// Union of two filters as a new filter (OR)
    ///
    /// The result reports every element either input reports. Neither input
    /// is modified.
    pub fn union(&self, other: &BloomFilter) -> Result<BloomFilter, FilterError> {
        let mut result = self.clone();
        result.union_with(other)?;
        Ok(result)
    }

    /// Merge another filter into this one (OR)
    ///
    /// Filters must share (m, k, seed); on mismatch nothing is modified.
    pub fn union_with(&mut self, other: &BloomFilter) -> Result<(), FilterError> {
        self.ensure_same_shape(other, "union")?;

        for (s, o) in self
            .bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *s |= *o;
        }
        self.insertions = match (self.insertions, other.insertions) {
            (Some(a), Some(b)) => Some(a.saturating_add(b)),
            _ => None,
        };
        Ok(())
    }

    /// Intersection of two filters as a new filter (AND)
    ///
    /// This is an approximation, not an exact set intersection: the result
    /// is generally denser than a filter built from the true intersection,
    /// so it reports more false positives, and its insertion count is
    /// unknown. Do not treat its answers as exact.
    pub fn intersect(&self, other: &BloomFilter) -> Result<BloomFilter, FilterError> {
        let mut result = self.clone();
        result.intersect_with(other)?;
        Ok(result)
    }

    /// Intersect another filter into this one (AND)
    ///
    /// See [`BloomFilter::intersect`] for the accuracy caveat.
    pub fn intersect_with(&mut self, other: &BloomFilter) -> Result<(), FilterError> {
        self.ensure_same_shape(other, "intersect")?;

        for (s, o) in self
            .bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *s &= *o;
        }
        self.insertions = None;
        Ok(())
    }

    fn ensure_same_shape(&self, other: &BloomFilter, op: &str) -> Result<(), FilterError> {
        if self.params != other.params {
            warn!(
                "[BloomFilter] Refusing {}: {} vs {}",
                op, self.params, other.params
            );
            return Err(FilterError::ShapeMismatch {
                left: self.params,
                right: other.params,
            });
        }
        Ok(())
    }

    /// Estimated number of distinct elements, from the fraction of set bits
    ///
    /// `f64::INFINITY` once every bit is set.
    pub fn estimated_cardinality(&self) -> f64 {
        estimate_cardinality(
            self.params.size_bits(),
            self.params.hash_count(),
            self.bits_set(),
        )
    }

    /// Estimated current false positive rate
    ///
    /// Formula: FPR = (1 - e^(-kn/m))^k, with n the tracked insertion count
    /// when known and the cardinality estimate otherwise. Observational only.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        if self.is_saturated() {
            return 1.0;
        }
        let n = match self.insertions {
            Some(n) => n as f64,
            None => self.estimated_cardinality(),
        };
        calculate_fpr(self.params.size_bits(), n, self.params.hash_count())
    }

    /// Get the number of bits set in the filter
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Fraction of bits set, in [0, 1]
    pub fn fill_ratio(&self) -> f64 {
        self.bits_set() as f64 / self.params.size_bits() as f64
    }

    /// True while no bit is set
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// True once every bit is set; `contains` then answers true for any key
    pub fn is_saturated(&self) -> bool {
        self.bits.all()
    }

    /// Number of insertions observed, `None` after decoding or intersecting
    ///
    /// Repeated insertions of the same key are counted each time.
    pub fn insertions(&self) -> Option<u64> {
        self.insertions
    }

    pub fn params(&self) -> FilterParameters {
        self.params
    }

    /// Get the filter size in bits
    pub fn size_bits(&self) -> usize {
        self.params.size_bits()
    }

    /// Get the number of hash functions
    pub fn hash_count(&self) -> usize {
        self.params.hash_count()
    }

    pub fn seed(&self) -> HashSeed {
        self.params.seed()
    }

    /// Read-only view of the bit array
    pub fn bits(&self) -> &BitSlice<u8, Msb0> {
        &self.bits
    }

    /// Packed bit array bytes, most significant bit first
    pub(crate) fn raw_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Serialize the filter to its wire representation
    pub fn to_bytes(&self) -> Vec<u8> {
        wire::encode_bloom(self)
    }

    /// Deserialize a filter from its wire representation
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        wire::decode_bloom(bytes)
    }
}

/// Shape and bits decide equality; the insertion counter does not
impl PartialEq for BloomFilter {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.bits == other.bits
    }
}

impl Eq for BloomFilter {}

impl Serialize for BloomFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for BloomFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
        BloomFilter::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}
