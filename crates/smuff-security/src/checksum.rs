use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

pub fn sha256_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

pub fn sha256_file_hex(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    sha256_reader_hex(file).with_context(|| format!("failed to hash {}", path.display()))
}

pub fn verify_sha256_file(path: &Path, expected_hex: &str) -> Result<bool> {
    let actual = sha256_file_hex(path)?;
    Ok(actual.eq_ignore_ascii_case(expected_hex.trim()))
}

fn sha256_reader_hex(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn sha256_hex_matches_known_empty_digest() {
        assert_eq!(sha256_hex(b""), EMPTY_SHA256);
    }

    #[test]
    fn reader_digest_matches_slice_digest() {
        let payload = vec![7_u8; 20_000];
        let from_reader =
            sha256_reader_hex(io::Cursor::new(payload.clone())).expect("must hash reader");
        assert_eq!(from_reader, sha256_hex(&payload));
    }

    #[test]
    fn verify_sha256_file_compares_case_insensitively() {
        let path = std::env::temp_dir().join(format!(
            "smuff-security-tests-{}-verify",
            std::process::id()
        ));
        std::fs::write(&path, b"").expect("must write file");

        assert!(verify_sha256_file(&path, &EMPTY_SHA256.to_uppercase()).expect("must verify"));
        assert!(!verify_sha256_file(&path, "00").expect("must verify"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn sha256_file_hex_errors_for_missing_file() {
        let missing = std::env::temp_dir().join("smuff-security-tests-definitely-missing");
        assert!(sha256_file_hex(&missing).is_err());
    }
}
