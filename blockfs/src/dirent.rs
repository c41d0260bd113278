//! Directory entry packing: `(inum, name)` pairs stored back-to-back as a
//! directory inode's content.

use crate::error::{FsError, Result};
use crate::layout::MAX_NAME_LEN;

/// A single directory entry: `inum:i32, name:u8[N]` with `name` NUL-padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inum: u32,
    pub name: String,
}

impl DirEntry {
    pub const WIRE_SIZE: usize = 4 + MAX_NAME_LEN;

    /// Builds an entry, rejecting names that can't round-trip through the
    /// on-disk NUL-terminated fixed-width encoding.
    pub fn new(inum: u32, name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(DirEntry {
            inum,
            name: name.to_string(),
        })
    }

    pub fn encode(&self) -> [u8; DirEntry::WIRE_SIZE] {
        let mut buf = [0u8; DirEntry::WIRE_SIZE];
        buf[0..4].copy_from_slice(&self.inum.to_le_bytes());
        let name_bytes = self.name.as_bytes();
        buf[4..4 + name_bytes.len()].copy_from_slice(name_bytes);
        // Remaining bytes (including the terminator) are already zero.
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        assert!(buf.len() >= DirEntry::WIRE_SIZE);
        let inum = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let name_bytes = &buf[4..4 + MAX_NAME_LEN];
        let nul = name_bytes.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        let name = std::str::from_utf8(&name_bytes[..nul])
            .map_err(|_| FsError::InvalidName)?
            .to_string();
        Ok(DirEntry { inum, name })
    }
}

/// Names must be non-empty, fit (with NUL) in `MAX_NAME_LEN` bytes, and
/// contain no NUL byte. `resolve_path` separately rejects `/` in a
/// component; this only guards the on-disk encoding.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.as_bytes().len() >= MAX_NAME_LEN {
        return Err(FsError::InvalidName);
    }
    if name.as_bytes().contains(&0) {
        return Err(FsError::InvalidName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let e = DirEntry::new(7, "hello.txt").unwrap();
        let decoded = DirEntry::decode(&e.encode()).unwrap();
        assert_eq!(e, decoded);
    }

    #[test]
    fn name_too_long_is_rejected() {
        let long = "x".repeat(MAX_NAME_LEN);
        assert!(matches!(DirEntry::new(1, &long), Err(FsError::InvalidName)));
    }

    #[test]
    fn name_with_nul_is_rejected() {
        assert!(matches!(
            DirEntry::new(1, "a\0b"),
            Err(FsError::InvalidName)
        ));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(DirEntry::new(1, ""), Err(FsError::InvalidName)));
    }
}
