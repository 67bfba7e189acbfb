//! # Bloom Filters
//!
//! Probabilistic approximate-membership filters: a fixed-size bit array
//! plus k hash positions per key. `contains` answers "definitely absent"
//! or "possibly present" in O(k), with no false negatives and a tunable
//! false positive rate.
//!
//! ## Layout
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `HashPositions`: k positions per key via double hashing
//!   - `FilterParameters`: (m, k, seed), sized explicitly or from (n, p)
//!   - `BloomFilter`: standard filter (insert, contains, union, intersect)
//!   - `CountingBloomFilter`: 4-bit counters, supports removal
//!   - `wire`: byte-exact encoding shared by both variants
//!   - `AnyFilter`: either variant, picked at runtime from the wire header
//!   - `BloomConfig` / `BloomConfigBuilder`: validated configuration
//!
//! - **Shared handle** (`shared`): `SharedBloomFilter`, a reader-writer
//!   locked filter for multi-threaded use
//!
//! ## Invariants
//!
//! - No false negatives: if inserted, `contains()` MUST return true
//!   (standard variant)
//! - FPR = (1 - e^(-kn/m))^k
//! - Size is fixed at construction; bits never go back to 0
//!
//! ## Usage Example
//!
//! ```
//! use bloom_filters::BloomFilter;
//!
//! let mut filter = BloomFilter::with_capacity(1000, 0.01)?;
//! filter.insert(b"hello");
//!
//! assert!(filter.contains(b"hello"));
//! assert!(filter.estimated_false_positive_rate() < 0.01);
//! # Ok::<(), bloom_filters::FilterError>(())
//! ```

pub mod domain;
pub mod error;
pub mod shared;

// Re-exports for convenience
pub use domain::{
    AnyFilter, BloomConfig, BloomConfigBuilder, BloomFilter, CountingBloomFilter,
    FilterParameters, FilterStats, HashSeed, HashStrategy,
};
pub use error::FilterError;
pub use shared::SharedBloomFilter;
