//! # Counting Bloom Filter
//!
//! Replace bits with counters so elements can be removed:
//! - Insert: increment counters at hashed positions
//! - Remove: decrement counters at hashed positions
//! - Membership: true if all counters > 0
//!
//! ## Accuracy trade-off
//!
//! Removing a key that was never inserted, but whose positions collide with
//! inserted keys, decrements their counters too. That can push a shared
//! counter to zero early and make a still-present key report absent: the
//! counting variant can produce false negatives under such removals. It is
//! a known property of counting filters, not a bug.
//!
//! Counters saturate at [`MAX_COUNTER`] and then stay there: the true count
//! is unknown, so removals leave a saturated counter alone rather than risk
//! dropping it to zero while keys still depend on it.

use std::collections::BTreeMap;

use bitvec::prelude::*;
use tracing::debug;

use super::bloom_filter::BloomFilter;
use super::hash_functions::{HashPositions, HashSeed};
use super::parameters::{calculate_fpr, estimate_cardinality, FilterParameters};
use super::wire;
use crate::error::FilterError;

/// Maximum counter value (4-bit = 15).
pub const MAX_COUNTER: u8 = 15;

/// Counting Bloom Filter with 4-bit counters.
///
/// Supports both insert AND remove operations, unlike standard Bloom filters.
#[derive(Clone, Debug)]
pub struct CountingBloomFilter {
    /// 4-bit counters packed into bytes (2 counters per byte, even index high)
    counters: Vec<u8>,
    /// Shape: m counters, k hashes, seed
    params: FilterParameters,
    /// Net insertions observed, `None` when unknown
    insertions: Option<u64>,
}

impl CountingBloomFilter {
    /// Create a new counting Bloom filter with `m` counters and `k` hashes.
    pub fn new(m: usize, k: usize) -> Result<Self, FilterError> {
        Ok(Self::from_params(FilterParameters::new(m, k)?))
    }

    /// Create a counting filter sized for `expected_elements` at `target_fpr`.
    pub fn with_capacity(expected_elements: usize, target_fpr: f64) -> Result<Self, FilterError> {
        Ok(Self::from_params(FilterParameters::for_capacity(
            expected_elements,
            target_fpr,
        )?))
    }

    /// Create an empty counting filter with validated parameters.
    pub fn from_params(params: FilterParameters) -> Self {
        debug!("[CountingBloomFilter] Created filter {}", params);
        Self {
            counters: vec![0u8; params.size_bits().div_ceil(2)],
            params,
            insertions: Some(0),
        }
    }

    pub(crate) fn from_raw_parts(params: FilterParameters, counters: Vec<u8>) -> Self {
        debug_assert_eq!(counters.len(), params.size_bits().div_ceil(2));
        Self {
            counters,
            params,
            insertions: None,
        }
    }

    /// Positions tested for `element`.
    pub fn positions<'a>(&self, element: &'a [u8]) -> HashPositions<'a> {
        HashPositions::new(
            element,
            self.params.hash_count(),
            self.params.size_bits(),
            self.params.seed(),
        )
    }

    /// Insert an element (increment counters, saturating).
    pub fn insert(&mut self, element: &[u8]) {
        let positions = self.positions(element);
        self.insert_positions(positions);
    }

    pub(crate) fn insert_positions(&mut self, positions: impl IntoIterator<Item = usize>) {
        for pos in positions {
            self.increment(pos);
        }
        self.insertions = self.insertions.map(|n| n.saturating_add(1));
    }

    /// Remove an element (decrement counters).
    ///
    /// All-or-nothing: if any targeted counter is already zero the filter is
    /// left untouched and [`FilterError::NotPresent`] is returned. The filter
    /// stays valid either way. See the module docs for the false negative
    /// caveat when removing keys that were never inserted.
    pub fn remove(&mut self, element: &[u8]) -> Result<(), FilterError> {
        let positions = self.positions(element);
        self.remove_positions(positions)
    }

    pub(crate) fn remove_positions(
        &mut self,
        positions: impl IntoIterator<Item = usize>,
    ) -> Result<(), FilterError> {
        // One entry per distinct position, so memory is bounded by min(k, m)
        let mut hits: BTreeMap<usize, usize> = BTreeMap::new();
        for pos in positions {
            *hits.entry(pos).or_insert(0) += 1;
        }

        // A position hit twice by the same key needs a counter of at least 2
        for (&pos, &needed) in &hits {
            let counter = self.counter(pos);
            if counter != MAX_COUNTER && (counter as usize) < needed {
                debug!(
                    "[CountingBloomFilter] Remove refused: counter {} at {} is below {}",
                    counter, pos, needed
                );
                return Err(FilterError::NotPresent);
            }
        }

        for (pos, needed) in hits {
            for _ in 0..needed {
                self.decrement(pos);
            }
        }
        self.insertions = self.insertions.map(|n| n.saturating_sub(1));
        Ok(())
    }

    /// Check if element might be in the filter.
    pub fn contains(&self, element: &[u8]) -> bool {
        self.contains_positions(self.positions(element))
    }

    pub(crate) fn contains_positions(&self, mut positions: impl Iterator<Item = usize>) -> bool {
        positions.all(|pos| self.counter(pos) > 0)
    }

    /// Counter value at position.
    ///
    /// # Panics
    /// Panics if `pos >= m`.
    pub fn counter(&self, pos: usize) -> u8 {
        assert!(pos < self.params.size_bits(), "counter index out of range");
        let byte = self.counters[pos / 2];
        if pos % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    fn set_counter(&mut self, pos: usize, value: u8) {
        let byte = &mut self.counters[pos / 2];
        if pos % 2 == 0 {
            *byte = (*byte & 0x0F) | (value << 4);
        } else {
            *byte = (*byte & 0xF0) | value;
        }
    }

    /// Increment counter at position (saturating at MAX_COUNTER).
    fn increment(&mut self, pos: usize) {
        let current = self.counter(pos);
        if current < MAX_COUNTER {
            self.set_counter(pos, current + 1);
        }
    }

    /// Decrement counter at position; saturated counters stay put.
    fn decrement(&mut self, pos: usize) {
        let current = self.counter(pos);
        if current > 0 && current < MAX_COUNTER {
            self.set_counter(pos, current - 1);
        }
    }

    /// Number of counters above zero.
    pub fn nonzero_counters(&self) -> usize {
        (0..self.params.size_bits())
            .filter(|&pos| self.counter(pos) > 0)
            .count()
    }

    /// True while every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.counters.iter().all(|&b| b == 0)
    }

    /// Project onto a standard filter of the same shape (counter > 0 -> bit set).
    pub fn to_bloom_filter(&self) -> BloomFilter {
        let mut bits = bitvec![u8, Msb0; 0; self.params.size_bits()];
        for pos in 0..self.params.size_bits() {
            if self.counter(pos) > 0 {
                bits.set(pos, true);
            }
        }
        BloomFilter::from_raw_parts(self.params, bits, self.insertions)
    }

    /// Estimated current false positive rate.
    ///
    /// Same formula as the standard filter, fed with the net insertion count
    /// when known, otherwise with a cardinality estimate from non-zero
    /// counters.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let m = self.params.size_bits();
        let k = self.params.hash_count();
        let nonzero = self.nonzero_counters();
        if nonzero == m {
            return 1.0;
        }
        let n = match self.insertions {
            Some(n) => n as f64,
            None => estimate_cardinality(m, k, nonzero),
        };
        calculate_fpr(m, n, k)
    }

    /// Net insertions (inserts minus successful removes), if known.
    pub fn insertions(&self) -> Option<u64> {
        self.insertions
    }

    pub fn params(&self) -> FilterParameters {
        self.params
    }

    /// Get number of counters (m).
    pub fn size_bits(&self) -> usize {
        self.params.size_bits()
    }

    /// Get number of hash functions.
    pub fn hash_count(&self) -> usize {
        self.params.hash_count()
    }

    pub fn seed(&self) -> HashSeed {
        self.params.seed()
    }

    /// Get size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.counters.len()
    }

    pub(crate) fn raw_bytes(&self) -> &[u8] {
        &self.counters
    }

    /// Serialize to the wire representation (4-bit counter layout).
    pub fn to_bytes(&self) -> Vec<u8> {
        wire::encode_counting(self)
    }

    /// Deserialize from the wire representation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        wire::decode_counting(bytes)
    }
}

impl PartialEq for CountingBloomFilter {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.counters == other.counters
    }
}

impl Eq for CountingBloomFilter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut filter = CountingBloomFilter::new(1000, 7).unwrap();

        filter.insert(b"test_element");
        assert!(filter.contains(b"test_element"));
        assert_eq!(filter.insertions(), Some(1));
    }

    #[test]
    fn test_remove() {
        let mut filter = CountingBloomFilter::new(1000, 7).unwrap();

        filter.insert(b"element1");
        filter.insert(b"element2");

        assert!(filter.contains(b"element1"));
        assert!(filter.contains(b"element2"));

        filter.remove(b"element1").unwrap();
        assert!(filter.contains(b"element2"));
        assert_eq!(filter.insertions(), Some(1));
    }

    #[test]
    fn test_insert_then_remove_restores_zero_counters() {
        // "x" -> positions [1, 3]
        let mut filter = CountingBloomFilter::new(8, 2).unwrap();

        filter.insert_positions([1, 3]);
        assert_eq!(filter.counter(1), 1);
        assert_eq!(filter.counter(3), 1);

        filter.remove_positions([1, 3]).unwrap();

        assert_eq!(filter.counter(1), 0);
        assert_eq!(filter.counter(3), 0);
        assert!(!filter.contains_positions([1, 3].into_iter()));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_shared_position_survives_removal() {
        let mut filter = CountingBloomFilter::new(8, 2).unwrap();

        filter.insert_positions([1, 3]); // x
        filter.insert_positions([3, 5]); // y
        filter.remove_positions([1, 3]).unwrap();

        assert_eq!(filter.counter(3), 1, "y still holds position 3");
        assert!(!filter.contains_positions([1, 3].into_iter()));
        assert!(filter.contains_positions([3, 5].into_iter()));
    }

    #[test]
    fn test_removal_may_leave_residual_false_positive() {
        let mut filter = CountingBloomFilter::new(8, 2).unwrap();

        filter.insert_positions([1, 3]); // x
        filter.insert_positions([3, 5]); // y
        filter.insert_positions([1, 5]); // z
        filter.remove_positions([1, 3]).unwrap();

        assert!(
            filter.contains_positions([1, 3].into_iter()),
            "x was removed but y and z still cover its positions"
        );
    }

    #[test]
    fn test_colliding_removal_can_cause_false_negative() {
        let mut filter = CountingBloomFilter::new(8, 2).unwrap();

        filter.insert_positions([1, 3]); // x
        // w was never inserted but hashes to the same positions
        filter.remove_positions([1, 3]).unwrap();

        assert!(!filter.contains_positions([1, 3].into_iter()));
    }

    #[test]
    fn test_remove_absent_is_refused_without_mutation() {
        let mut filter = CountingBloomFilter::new(8, 2).unwrap();
        filter.insert_positions([1, 3]);
        let before = filter.clone();

        let result = filter.remove_positions([3, 4]);

        assert_eq!(result, Err(FilterError::NotPresent));
        assert_eq!(filter, before, "No counter may change on refusal");
        assert_eq!(filter.insertions(), Some(1));
    }

    #[test]
    fn test_repeated_position_needs_matching_count() {
        let mut filter = CountingBloomFilter::new(4, 2).unwrap();
        filter.insert_positions([2, 2]);
        assert_eq!(filter.counter(2), 2);

        filter.remove_positions([2, 2]).unwrap();
        assert_eq!(filter.counter(2), 0);

        filter.insert_positions([2, 0]);
        assert_eq!(filter.remove_positions([2, 2]), Err(FilterError::NotPresent));
        assert_eq!(filter.counter(2), 1);
    }

    #[test]
    fn test_huge_hash_count_on_tiny_filter() {
        // k far above m: positions repeat, and neither insert nor remove
        // needs storage proportional to k
        let mut filter = CountingBloomFilter::new(2, 200_000).unwrap();

        filter.insert(b"dense");
        assert!(filter.contains(b"dense"));
        assert!((0..2).any(|p| filter.counter(p) == MAX_COUNTER));

        filter.remove(b"dense").unwrap();
        assert!(filter.contains(b"dense"), "Saturated counters stay set");
    }

    #[test]
    fn test_counter_saturation_is_sticky() {
        let mut filter = CountingBloomFilter::new(1000, 7).unwrap();

        for _ in 0..20 {
            filter.insert(b"saturate_me");
        }
        let positions: Vec<usize> = filter.positions(b"saturate_me").collect();
        assert!(positions.iter().all(|&p| filter.counter(p) == MAX_COUNTER));

        for _ in 0..20 {
            filter.remove(b"saturate_me").unwrap();
        }

        assert!(
            filter.contains(b"saturate_me"),
            "Saturated counters never drop back to zero"
        );
    }

    #[test]
    fn test_projection_to_standard_filter() {
        let mut counting = CountingBloomFilter::new(500, 4).unwrap();
        counting.insert(b"kept");
        counting.insert(b"dropped");
        counting.remove(b"dropped").unwrap();

        let standard = counting.to_bloom_filter();

        assert_eq!(standard.params(), counting.params());
        assert_eq!(standard.bits_set(), counting.nonzero_counters());
        assert!(standard.contains(b"kept"));
    }

    #[test]
    fn test_wire_roundtrip_keeps_counters() {
        let mut filter = CountingBloomFilter::new(101, 5).unwrap();
        filter.insert(b"element1");
        filter.insert(b"element1");
        filter.insert(b"element2");

        let restored = CountingBloomFilter::from_bytes(&filter.to_bytes()).unwrap();

        assert_eq!(restored, filter);
        assert!(restored.contains(b"element1"));
        assert_eq!(restored.insertions(), None);
    }

    #[test]
    fn test_4bit_packing() {
        let filter = CountingBloomFilter::new(100, 5).unwrap();

        // 100 counters should use 50 bytes (2 per byte)
        assert_eq!(filter.size_bytes(), 50);
        assert_eq!(filter.estimated_false_positive_rate(), 0.0);
    }
}
