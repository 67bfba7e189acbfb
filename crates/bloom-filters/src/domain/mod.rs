//! Domain Layer - Pure filter logic
//!
//! This layer contains:
//! - Hash position generation (double hashing / seeded)
//! - Parameter sizing
//! - Standard Bloom filter
//! - Counting Bloom filter (removal-capable)
//! - Wire codec
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - Pure functions where possible

pub mod any_filter;
pub mod bloom_filter;
pub mod config;
pub mod counting_bloom;
pub mod hash_functions;
pub mod parameters;
pub mod wire;

pub use any_filter::{AnyFilter, FilterStats, FilterVariant};
pub use bloom_filter::BloomFilter;
pub use config::{BloomConfig, BloomConfigBuilder, Sizing};
pub use counting_bloom::{CountingBloomFilter, MAX_COUNTER};
pub use hash_functions::{compute_hash_positions, HashPositions, HashSeed, HashStrategy};
pub use parameters::{
    calculate_fpr, estimate_cardinality, minimum_bits, optimal_k, FilterParameters,
};
pub use wire::{CellLayout, HEADER_LEN};
