//! Binary blueprint file format.
//!
//! Layout (header is 28 bytes, fixed-size, little-endian):
//!   [0..4]   Magic bytes: "BLPT"
//!   [4..8]   Header format version (u32)
//!   [8..12]  Flags (u32: bit 0 = lz4-compressed payload)
//!   [12..20] Timestamp (Unix epoch seconds, u64)
//!   [20..24] Uncompressed payload size (u32)
//!   [24..28] xxHash32 checksum of the stored payload bytes
//!
//! The payload is the bitcode encoding of the tag document, lz4-compressed.
//! Corruption (bad magic, truncation, checksum mismatch, bad compression) is
//! detected before any decode is attempted and reported with the file path.

use std::path::Path;

use blueprint::Tag;
use xxhash_rust::xxh32::xxh32;

use crate::error::StoreError;

pub const MAGIC: [u8; 4] = *b"BLPT";
pub const HEADER_SIZE: usize = 28;

/// Version of the header layout itself, distinct from the document schema
/// version stamped inside the tag payload.
pub const HEADER_FORMAT_VERSION: u32 = 1;

const FLAG_COMPRESSED: u32 = 1;
const XXHASH_SEED: u32 = 0;

fn corrupt(path: &Path, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Encodes a tag document into the framed binary form.
pub fn encode_document(doc: &Tag) -> Result<Vec<u8>, StoreError> {
    let raw = bitcode::serialize(doc).map_err(|e| StoreError::Encode(e.to_string()))?;
    let compressed = lz4_flex::compress_prepend_size(&raw);

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut out = Vec::with_capacity(HEADER_SIZE + compressed.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&HEADER_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&FLAG_COMPRESSED.to_le_bytes());
    out.extend_from_slice(&timestamp.to_le_bytes());
    out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
    out.extend_from_slice(&xxh32(&compressed, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decodes the framed binary form back into a tag document. `path` is only
/// used for error reporting.
pub fn decode_document(path: &Path, bytes: &[u8]) -> Result<Tag, StoreError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Err(corrupt(path, "not a blueprint file (bad magic)"));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(corrupt(
            path,
            format!(
                "truncated header ({} bytes, need {HEADER_SIZE})",
                bytes.len()
            ),
        ));
    }

    let format_version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let flags = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let uncompressed_size = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    let checksum = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);

    if format_version > HEADER_FORMAT_VERSION {
        return Err(StoreError::FutureHeaderFormat {
            found: format_version,
            supported: HEADER_FORMAT_VERSION,
        });
    }

    let payload = &bytes[HEADER_SIZE..];
    let computed = xxh32(payload, XXHASH_SEED);
    if computed != checksum {
        return Err(corrupt(
            path,
            format!("checksum mismatch (expected {checksum:#010X}, got {computed:#010X})"),
        ));
    }

    let raw = if flags & FLAG_COMPRESSED != 0 {
        lz4_flex::decompress_size_prepended(payload)
            .map_err(|e| corrupt(path, format!("bad compression: {e}")))?
    } else {
        payload.to_vec()
    };
    if raw.len() != uncompressed_size as usize {
        return Err(corrupt(
            path,
            format!(
                "size mismatch (header says {uncompressed_size}, payload is {})",
                raw.len()
            ),
        ));
    }

    bitcode::deserialize(&raw).map_err(|e| corrupt(path, format!("bad tag payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Tag {
        let mut doc = Tag::compound();
        doc.insert("schema_version", Tag::Int(3));
        doc.insert("author", Tag::from("builder"));
        doc.insert(
            "cells",
            Tag::List(vec![Tag::Int(1), Tag::Int(2), Tag::Int(3)]),
        );
        doc
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let doc = sample_doc();
        let bytes = encode_document(&doc).unwrap();
        assert_eq!(&bytes[..4], &MAGIC);
        let back = decode_document(Path::new("x.blueprint"), &bytes).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_bad_magic_reports_path() {
        let err = decode_document(Path::new("dir/x.blueprint"), b"JUNKJUNKJUNK").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("x.blueprint"), "got: {msg}");
        assert!(msg.contains("magic"), "got: {msg}");
    }

    #[test]
    fn test_truncated_header_detected() {
        let err = decode_document(Path::new("x"), b"BLPT\x01\x00").unwrap_err();
        assert!(err.to_string().contains("truncated"), "got: {err}");
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut bytes = encode_document(&sample_doc()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = decode_document(Path::new("x"), &bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"), "got: {err}");
    }

    #[test]
    fn test_future_header_format_rejected() {
        let mut bytes = encode_document(&sample_doc()).unwrap();
        bytes[4..8].copy_from_slice(&999u32.to_le_bytes());
        let err = decode_document(Path::new("x"), &bytes).unwrap_err();
        assert!(matches!(
            err,
            StoreError::FutureHeaderFormat { found: 999, .. }
        ));
    }

    #[test]
    fn test_compression_actually_shrinks_repetitive_docs() {
        let mut doc = Tag::compound();
        doc.insert(
            "cells",
            Tag::List(vec![Tag::from("repetitive_state_name"); 500]),
        );
        let bytes = encode_document(&doc).unwrap();
        let raw = bitcode::serialize(&doc).unwrap();
        assert!(bytes.len() < raw.len());
    }
}
