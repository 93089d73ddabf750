//! End-to-end archive reading and extraction through the public API

use std::fs;
use std::io::Cursor;
use sha2::{Digest, Sha256};
use riftkit_wad::{VerifyPolicy, WadExtractor, WadFormat, WadHashMapper, WadReader};

/// Build a v2 archive with the descriptor block at byte 88
fn build_archive(entries: &[(u64, WadFormat, Vec<u8>, u32)]) -> Vec<u8> {
    let index_offset = 104u16;
    let mut out = vec![0u8; 88];
    out[..2].copy_from_slice(b"RW");
    out[2] = 2;
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&index_offset.to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());

    let mut offset = index_offset as usize + 32 * entries.len();
    for (path, format, payload, target_size) in entries {
        let digest: [u8; 32] = Sha256::digest(decode_for_test(*format, payload, *target_size)).into();
        out.extend_from_slice(&path.to_le_bytes());
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&target_size.to_le_bytes());
        out.push(u8::from(*format));
        out.push(0);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&digest[..8]);
        offset += payload.len();
    }
    for (_, _, payload, _) in entries {
        out.extend_from_slice(payload);
    }
    out
}

fn decode_for_test(format: WadFormat, payload: &[u8], _target_size: u32) -> Vec<u8> {
    match format {
        WadFormat::Zstd => zstd::decode_all(payload).expect("valid test payload"),
        _ => payload.to_vec(),
    }
}

#[test]
fn open_read_and_extract() {
    let compressed = zstd::encode_all(&b"compressed payload"[..], 0).unwrap();
    let data = build_archive(&[
        (0xA1, WadFormat::Raw, b"plain payload".to_vec(), 13),
        (0xB2, WadFormat::Zstd, compressed, 18),
    ]);

    let mut wad = WadReader::new(Cursor::new(&data[..])).unwrap();
    assert_eq!(wad.entries().len(), 2);

    let entry = *wad.lookup(0xB2).unwrap();
    assert_eq!(
        wad.verify_entry(&entry, VerifyPolicy::Strict).unwrap(),
        b"compressed payload"
    );

    let mut mapper = WadHashMapper::new();
    mapper.insert(0xA1, "data/plain.txt".to_string());
    mapper.insert(0xB2, "data/nested/compressed.txt".to_string());

    let out = std::env::temp_dir().join("riftkit-wad-it");
    let _ = fs::remove_dir_all(&out);
    let report = WadExtractor::new(&out)
        .with_mapper(&mapper)
        .verify(VerifyPolicy::Strict)
        .extract_all(&mut wad)
        .unwrap();

    assert!(report.is_ok(), "errors: {:?}", report.errors);
    assert_eq!(report.extracted, 2);
    assert_eq!(fs::read(out.join("data/plain.txt")).unwrap(), b"plain payload");
    assert_eq!(
        fs::read(out.join("data/nested/compressed.txt")).unwrap(),
        b"compressed payload"
    );
    let _ = fs::remove_dir_all(&out);
}
