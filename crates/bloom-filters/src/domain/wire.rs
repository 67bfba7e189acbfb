//! Byte-exact wire format shared by both filter variants
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! offset size field
//!      0    8 m, number of cells (u64)
//!      8    4 k, number of hash positions (u32)
//!     12    4 tweak (u32)
//!     16    1 hash strategy (0 = double hashing, 1 = seeded)
//!     17    1 cell layout (0 = bits, 1 = 4-bit counters)
//!     18    2 reserved, zero
//!     20    . payload
//! ```
//!
//! Bits payload: `ceil(m/8)` bytes, bit `i` is `0x80 >> (i % 8)` of byte
//! `i / 8`. Counter payload: `ceil(m/2)` bytes, counter `i` in the high
//! nibble of byte `i / 2` when `i` is even. Padding must be zero.

use std::fmt;

use bincode::Options;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use super::any_filter::AnyFilter;
use super::bloom_filter::BloomFilter;
use super::counting_bloom::CountingBloomFilter;
use super::hash_functions::{HashSeed, HashStrategy};
use super::parameters::FilterParameters;
use crate::error::FilterError;

/// Encoded header length in bytes
pub const HEADER_LEN: usize = 20;

/// What each of the m cells holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellLayout {
    /// One bit per cell (standard filter)
    Bits,
    /// One 4-bit saturating counter per cell (counting filter)
    Counters4,
}

impl CellLayout {
    fn as_byte(self) -> u8 {
        match self {
            CellLayout::Bits => 0,
            CellLayout::Counters4 => 1,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(CellLayout::Bits),
            1 => Some(CellLayout::Counters4),
            _ => None,
        }
    }

    /// Payload length for `m` cells
    pub fn payload_len(self, m: usize) -> usize {
        match self {
            CellLayout::Bits => m.div_ceil(8),
            CellLayout::Counters4 => m.div_ceil(2),
        }
    }
}

impl fmt::Display for CellLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellLayout::Bits => f.write_str("bits"),
            CellLayout::Counters4 => f.write_str("4-bit counters"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireHeader {
    m: u64,
    k: u32,
    tweak: u32,
    strategy: u8,
    layout: u8,
    reserved: [u8; 2],
}

fn header_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
}

/// Decode whichever variant the header announces
pub(crate) fn decode_any(bytes: &[u8]) -> Result<AnyFilter, FilterError> {
    let (params, layout, payload) = split(bytes)?;
    Ok(match layout {
        CellLayout::Bits => AnyFilter::Standard(bloom_from_payload(params, payload)?),
        CellLayout::Counters4 => AnyFilter::Counting(counting_from_payload(params, payload)?),
    })
}

fn encode(params: FilterParameters, layout: CellLayout, payload: &[u8]) -> Vec<u8> {
    let seed = params.seed();
    let header = WireHeader {
        m: params.size_bits() as u64,
        // FilterParameters guarantees k fits in 32 bits
        k: params.hash_count() as u32,
        tweak: seed.tweak,
        strategy: seed.strategy.as_byte(),
        layout: layout.as_byte(),
        reserved: [0; 2],
    };

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    // Serializing a fixed-size struct into a Vec cannot fail
    out.extend(header_options().serialize(&header).unwrap_or_default());
    out.extend_from_slice(payload);
    out
}

pub(crate) fn encode_bloom(filter: &BloomFilter) -> Vec<u8> {
    encode(filter.params(), CellLayout::Bits, filter.raw_bytes())
}

pub(crate) fn encode_counting(filter: &CountingBloomFilter) -> Vec<u8> {
    encode(filter.params(), CellLayout::Counters4, filter.raw_bytes())
}

pub(crate) fn decode_bloom(bytes: &[u8]) -> Result<BloomFilter, FilterError> {
    let (params, layout, payload) = split(bytes)?;
    if layout != CellLayout::Bits {
        return Err(FilterError::decode(format!(
            "expected bit layout, found {:?}",
            layout
        )));
    }
    bloom_from_payload(params, payload)
}

pub(crate) fn decode_counting(bytes: &[u8]) -> Result<CountingBloomFilter, FilterError> {
    let (params, layout, payload) = split(bytes)?;
    if layout != CellLayout::Counters4 {
        return Err(FilterError::decode(format!(
            "expected counter layout, found {:?}",
            layout
        )));
    }
    counting_from_payload(params, payload)
}

/// Parse and validate the header, returning the payload slice
fn split(bytes: &[u8]) -> Result<(FilterParameters, CellLayout, &[u8]), FilterError> {
    if bytes.len() < HEADER_LEN {
        return Err(FilterError::decode(format!(
            "input is {} bytes, header needs {}",
            bytes.len(),
            HEADER_LEN
        )));
    }
    let (head, payload) = bytes.split_at(HEADER_LEN);
    let header: WireHeader = header_options()
        .deserialize(head)
        .map_err(|e| FilterError::decode(e.to_string()))?;

    if header.reserved != [0; 2] {
        return Err(FilterError::decode("reserved header bytes are not zero"));
    }
    let strategy = HashStrategy::from_byte(header.strategy).ok_or_else(|| {
        FilterError::decode(format!("unknown hash strategy tag {}", header.strategy))
    })?;
    let layout = CellLayout::from_byte(header.layout)
        .ok_or_else(|| FilterError::decode(format!("unknown cell layout tag {}", header.layout)))?;
    let m = usize::try_from(header.m)
        .map_err(|_| FilterError::decode(format!("m={} does not fit in memory", header.m)))?;

    let params = FilterParameters::new(m, header.k as usize)
        .map_err(|e| FilterError::decode(e.to_string()))?
        .with_seed(HashSeed::new(header.tweak, strategy));

    let expected = layout.payload_len(m);
    if payload.len() != expected {
        return Err(FilterError::decode(format!(
            "payload is {} bytes, expected {} for m={}",
            payload.len(),
            expected,
            m
        )));
    }

    Ok((params, layout, payload))
}

fn bloom_from_payload(params: FilterParameters, payload: &[u8]) -> Result<BloomFilter, FilterError> {
    let m = params.size_bits();
    let tail_bits = m % 8;
    if tail_bits != 0 {
        let pad_mask = 0xFFu8 >> tail_bits;
        if payload[payload.len() - 1] & pad_mask != 0 {
            return Err(FilterError::decode("non-zero padding bits"));
        }
    }

    let mut bits = BitVec::<u8, Msb0>::from_vec(payload.to_vec());
    bits.truncate(m);
    Ok(BloomFilter::from_raw_parts(params, bits, None))
}

fn counting_from_payload(
    params: FilterParameters,
    payload: &[u8],
) -> Result<CountingBloomFilter, FilterError> {
    if params.size_bits() % 2 == 1 && payload[payload.len() - 1] & 0x0F != 0 {
        return Err(FilterError::decode("non-zero padding counter"));
    }
    Ok(CountingBloomFilter::from_raw_parts(params, payload.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_is_byte_exact() {
        let params = FilterParameters::new(10, 3)
            .unwrap()
            .with_seed(HashSeed::new(0x0102_0304, HashStrategy::Seeded));
        let filter = BloomFilter::from_params(params);

        let bytes = filter.to_bytes();

        assert_eq!(bytes.len(), HEADER_LEN + 2);
        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0, 10], "m as u64 BE");
        assert_eq!(&bytes[8..12], &[0, 0, 0, 3], "k as u32 BE");
        assert_eq!(&bytes[12..16], &[1, 2, 3, 4], "tweak as u32 BE");
        assert_eq!(bytes[16], 1, "seeded strategy tag");
        assert_eq!(bytes[17], 0, "bit layout tag");
        assert_eq!(&bytes[18..20], &[0, 0]);
    }

    #[test]
    fn test_bits_are_packed_msb_first() {
        // Bit pattern [0,1,1,0,0,1,0,0,1,1]
        let mut filter = BloomFilter::new(10, 3).unwrap();
        filter.insert_positions([2, 5, 8]);
        filter.insert_positions([1, 5, 9]);

        let bytes = filter.to_bytes();

        assert_eq!(&bytes[HEADER_LEN..], &[0b0110_0100, 0b1100_0000]);
    }

    #[test]
    fn test_counters_are_packed_high_nibble_first() {
        let mut filter = CountingBloomFilter::new(3, 2).unwrap();
        filter.insert_positions([0, 0]);
        filter.insert_positions([1, 2]);

        let bytes = filter.to_bytes();

        assert_eq!(bytes[17], 1, "counter layout tag");
        assert_eq!(&bytes[HEADER_LEN..], &[0x21, 0x10]);
    }

    #[test]
    fn test_decode_restores_membership() {
        let mut filter = BloomFilter::new(1000, 7).unwrap();
        for key in [b"element_1", b"element_2", b"element_3"] {
            filter.insert(key);
        }

        let restored = BloomFilter::from_bytes(&filter.to_bytes()).unwrap();

        assert_eq!(restored, filter);
        assert!(restored.contains(b"element_1"));
        assert!(restored.contains(b"element_3"));
        assert_eq!(restored.insertions(), None, "Count is not on the wire");
    }

    #[test]
    fn test_any_filter_dispatches_on_layout() {
        let standard = BloomFilter::new(64, 3).unwrap();
        let counting = CountingBloomFilter::new(64, 3).unwrap();

        assert!(matches!(
            decode_any(&standard.to_bytes()),
            Ok(AnyFilter::Standard(_))
        ));
        assert!(matches!(
            decode_any(&counting.to_bytes()),
            Ok(AnyFilter::Counting(_))
        ));

        assert!(matches!(
            BloomFilter::from_bytes(&counting.to_bytes()),
            Err(FilterError::Decode(_))
        ));
        assert!(matches!(
            CountingBloomFilter::from_bytes(&standard.to_bytes()),
            Err(FilterError::Decode(_))
        ));
    }

    fn corrupted(good: &[u8], edit: impl FnOnce(&mut Vec<u8>)) -> Result<BloomFilter, FilterError> {
        let mut bytes = good.to_vec();
        edit(&mut bytes);
        BloomFilter::from_bytes(&bytes)
    }

    #[test]
    fn test_rejects_malformed_input() {
        let good = BloomFilter::new(10, 3).unwrap().to_bytes();

        assert!(BloomFilter::from_bytes(&good[..HEADER_LEN - 1]).is_err(), "short header");
        assert!(corrupted(&good, |b| b.truncate(HEADER_LEN + 1)).is_err(), "short payload");
        assert!(corrupted(&good, |b| b.push(0)).is_err(), "trailing byte");
        assert!(corrupted(&good, |b| b[7] = 0).is_err(), "m = 0");
        assert!(corrupted(&good, |b| b[11] = 0).is_err(), "k = 0");
        assert!(corrupted(&good, |b| b[16] = 7).is_err(), "unknown strategy");
        assert!(corrupted(&good, |b| b[17] = 7).is_err(), "unknown layout");
        assert!(corrupted(&good, |b| b[19] = 1).is_err(), "reserved byte");
        assert!(
            corrupted(&good, |b| b[HEADER_LEN + 1] = 0x01).is_err(),
            "padding bit"
        );
        assert!(corrupted(&good, |_| {}).is_ok());
    }
}
