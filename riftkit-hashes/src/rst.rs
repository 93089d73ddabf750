//! Truncated xxhash64 hashes used for string-table keys
//!
//! String-table keys are hashed with 64-bit xxHash over the lowercased key,
//! then masked to 39 or 40 bits depending on the file version.
use std::hash::Hasher;
use twox_hash::XxHash64;
use crate::HashMapper;

/// Compute a string-table key hash, untruncated
pub fn compute_text_hash_full(s: &str) -> u64 {
    let mut h = XxHash64::with_seed(0);
    h.write(s.to_ascii_lowercase().as_bytes());
    h.finish()
}

/// Compute a string-table key hash, truncated to `bits` bits
pub fn compute_text_hash_n(s: &str, bits: u8) -> u64 {
    compute_text_hash_full(s) & ((1u64 << bits) - 1)
}

/// Mapper for string-table key hashes, defaulting to the current hash size
pub type RstHashMapper<const NBITS: usize = 39> = HashMapper<u64, NBITS>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_masks_low_bits() {
        let full = compute_text_hash_full("item_1001_name");
        assert_eq!(compute_text_hash_n("item_1001_name", 39), full & ((1 << 39) - 1));
        assert_eq!(compute_text_hash_n("item_1001_name", 40), full & ((1 << 40) - 1));
    }
}
