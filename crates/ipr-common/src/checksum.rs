//! Checksum utilities for blob integrity verification

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;

/// Compute the hex-encoded SHA-256 digest of an in-memory buffer.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the hex-encoded SHA-256 digest of any readable source.
pub fn sha256_hex_reader<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_reader_matches_buffer() {
        let data = vec![42u8; 20_000];
        let mut cursor = std::io::Cursor::new(data.clone());
        let from_reader = sha256_hex_reader(&mut cursor).unwrap();
        assert_eq!(from_reader, sha256_hex(&data));
    }
}
