//! xxhash64 hashes used for archive paths
//!
//! Archive entry paths and property `Path` scalars are hashed with 64-bit
//! xxHash over the ASCII-lowercased path.
use std::hash::Hasher;
use twox_hash::XxHash64;
use crate::HashMapper;

/// Compute an archive path hash
pub fn compute_path_hash(s: &str) -> u64 {
    let mut h = XxHash64::with_seed(0);
    h.write(s.to_ascii_lowercase().as_bytes());
    h.finish()
}

/// Mapper for archive path hashes
pub type WadHashMapper = HashMapper<u64, 64>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_lowercased() {
        assert_eq!(compute_path_hash("ASSETS/Foo.png"), compute_path_hash("assets/foo.png"));
    }

    #[test]
    fn known_vector() {
        // xxh64("", seed=0)
        let mut h = XxHash64::with_seed(0);
        h.write(b"");
        assert_eq!(compute_path_hash(""), h.finish());
    }
}
