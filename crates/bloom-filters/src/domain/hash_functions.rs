//! Hash functions for Bloom filter
//!
//! Derives k positions in `[0, m)` from one key. Two strategies:
//!
//! - [`HashStrategy::DoubleHashing`] (default): two MurmurHash3 x64-128
//!   passes with seeds `0 + tweak` and `1 + tweak`, combined as
//!   `h(i) = h1 + i * h2 (mod m)`. Only two primitive hashes per key,
//!   whatever k is.
//! - [`HashStrategy::Seeded`]: k independent SipHash-1-3 passes, hash i keyed
//!   with `(tweak, i)`.
//!
//! Neither is collision resistant against an adversary; they are picked
//! for speed and distribution. For a fixed key and fixed `(m, k, seed)` the
//! produced positions are always identical.

use std::fmt;
use std::hash::Hasher;
use std::io::Cursor;

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

/// How the k positions are derived from a key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashStrategy {
    /// Two MurmurHash3 passes combined linearly
    #[default]
    DoubleHashing,
    /// k SipHash-1-3 passes, one per position
    Seeded,
}

impl HashStrategy {
    /// Wire tag for this strategy
    pub fn as_byte(self) -> u8 {
        match self {
            HashStrategy::DoubleHashing => 0,
            HashStrategy::Seeded => 1,
        }
    }

    /// Parse a wire tag
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(HashStrategy::DoubleHashing),
            1 => Some(HashStrategy::Seeded),
            _ => None,
        }
    }
}

impl fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashStrategy::DoubleHashing => f.write_str("double"),
            HashStrategy::Seeded => f.write_str("seeded"),
        }
    }
}

impl std::str::FromStr for HashStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "double" | "double_hashing" | "murmur3" => Ok(HashStrategy::DoubleHashing),
            "seeded" | "siphash" => Ok(HashStrategy::Seeded),
            other => Err(format!("unknown hash strategy '{}'", other)),
        }
    }
}

/// Seed material: part of a filter's shape
///
/// Two filters only agree on positions (and can only be combined) when
/// their seeds are equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashSeed {
    /// Added to every primitive hash seed
    pub tweak: u32,
    /// Position derivation strategy
    pub strategy: HashStrategy,
}

impl HashSeed {
    pub fn new(tweak: u32, strategy: HashStrategy) -> Self {
        Self { tweak, strategy }
    }
}

impl fmt::Display for HashSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.strategy, self.tweak)
    }
}

/// Hash an element with MurmurHash3 using a seed and tweak
///
/// Lower 64 bits of the 128-bit x64 variant.
pub fn murmur_hash(element: &[u8], seed: u32, tweak: u32) -> u64 {
    let combined_seed = seed.wrapping_add(tweak);
    let mut cursor = Cursor::new(element);

    // Reading from an in-memory cursor cannot fail
    let hash = murmur3::murmur3_x64_128(&mut cursor, combined_seed).unwrap_or(0);
    hash as u64
}

/// Hash an element with SipHash-1-3 keyed by `(tweak, index)`
pub fn sip_hash(element: &[u8], tweak: u32, index: u32) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(u64::from(tweak), u64::from(index));
    hasher.write(element);
    hasher.finish()
}

/// Lazy iterator over the k positions of one key
///
/// Yields positions one at a time so membership tests can stop at the
/// first clear bit without allocating.
#[derive(Clone, Debug)]
pub struct HashPositions<'a> {
    element: &'a [u8],
    source: PositionSource,
    m: u64,
    k: usize,
    i: usize,
}

#[derive(Clone, Copy, Debug)]
enum PositionSource {
    Double { h1: u64, h2: u64 },
    Seeded { tweak: u32 },
}

impl<'a> HashPositions<'a> {
    /// Positions for `element` in a filter of `m` cells with `k` hashes
    ///
    /// # Panics
    ///
    /// Panics if `m == 0`. Filters built through [`FilterParameters`] never
    /// have an empty position space.
    ///
    /// [`FilterParameters`]: crate::domain::FilterParameters
    pub fn new(element: &'a [u8], k: usize, m: usize, seed: HashSeed) -> Self {
        assert!(m > 0, "position space must be non-empty");
        let source = match seed.strategy {
            HashStrategy::DoubleHashing => PositionSource::Double {
                h1: murmur_hash(element, 0, seed.tweak),
                h2: murmur_hash(element, 1, seed.tweak),
            },
            HashStrategy::Seeded => PositionSource::Seeded { tweak: seed.tweak },
        };
        Self {
            element,
            source,
            m: m as u64,
            k,
            i: 0,
        }
    }
}

impl Iterator for HashPositions<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.i >= self.k {
            return None;
        }
        let i = self.i as u64;
        self.i += 1;

        let hash = match self.source {
            PositionSource::Double { h1, h2 } => h1.wrapping_add(i.wrapping_mul(h2)),
            PositionSource::Seeded { tweak } => sip_hash(self.element, tweak, i as u32),
        };
        Some((hash % self.m) as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.k - self.i;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for HashPositions<'_> {}

/// Compute all k hash positions for an element
///
/// # Panics
///
/// Panics if `m == 0`.
pub fn compute_hash_positions(element: &[u8], k: usize, m: usize, seed: HashSeed) -> Vec<usize> {
    HashPositions::new(element, k, m, seed).collect()
}
