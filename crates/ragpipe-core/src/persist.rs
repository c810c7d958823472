//! Whole-file persistence helpers.
//!
//! Every artifact is written to a temporary file in the destination directory
//! and renamed into place, so readers see either the old file or the new one.

use std::fs;
use std::io::Write;
use std::path::Path;

use bincode::config::{self, Config};
use bincode::{decode_from_slice, encode_to_vec, Decode, Encode};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Largest artifact read back, and the most bytes a decode may claim.
pub const MAX_ARTIFACT_BYTES: usize = 1 << 30;

fn bincode_config() -> impl Config {
    config::standard().with_limit::<MAX_ARTIFACT_BYTES>()
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Reads a whole artifact, refusing files over [`MAX_ARTIFACT_BYTES`].
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let len = fs::metadata(path).map_err(|e| Error::io(path, e))?.len();
    if len > MAX_ARTIFACT_BYTES as u64 {
        return Err(Error::Parse(format!(
            "{} is {len} bytes, over the {MAX_ARTIFACT_BYTES} byte limit",
            path.display()
        )));
    }
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// Encodes `value` with bincode and writes it atomically.
pub fn save_binary<T: Encode>(path: &Path, value: &T) -> Result<()> {
    let bytes = encode_to_vec(value, bincode_config())
        .map_err(|e| Error::Parse(format!("failed to encode {}: {e}", path.display())))?;
    write_atomic(path, &bytes)
}

pub fn load_binary<T: Decode<()>>(path: &Path) -> Result<T> {
    let bytes = read_bytes(path)?;
    let (value, _read) = decode_from_slice(&bytes, bincode_config())
        .map_err(|e| Error::Parse(format!("failed to decode {}: {e}", path.display())))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("out.bin");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        // no temp files left behind
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn load_binary_rejects_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.bin");
        fs::write(&path, b"").unwrap();
        let err = load_binary::<(u64, String)>(&path).unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {err:?}");
    }

    #[test]
    fn oversized_file_is_refused_before_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("huge.bin");
        let file = fs::File::create(&path).unwrap();
        // sparse, so no real disk use
        file.set_len(MAX_ARTIFACT_BYTES as u64 + 1).unwrap();
        let err = read_bytes(&path).unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {err:?}");
    }

    #[test]
    fn huge_length_prefix_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prefix.bin");
        let mut bytes = vec![0xFD];
        bytes.extend_from_slice(&(1u64 << 40).to_le_bytes());
        fs::write(&path, &bytes).unwrap();
        let err = load_binary::<Vec<u64>>(&path).unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {err:?}");
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_bytes(&tmp.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
