//! Crate-wide error type.
//!
//! Every fallible core operation returns [`FsError`] rather than a negative
//! integer; the variants are a one-to-one mapping of the error codes a
//! caller is expected to surface (see the filesystem's external interface).

/// Errors produced by the filesystem core.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The inode number is out of range, or its bit is clear in the inode
    /// bitmap.
    #[error("invalid inode")]
    InvalidInode,
    /// An operation expected a different inode type (e.g. `write` on a
    /// directory, or `create` colliding with an entry of a different type).
    #[error("invalid type")]
    InvalidType,
    /// A directory entry name is empty, too long, contains a NUL byte, or
    /// is one of the reserved names `.`/`..` where that's disallowed.
    #[error("invalid name")]
    InvalidName,
    /// `read` was asked for more bytes than the file currently holds.
    #[error("invalid size")]
    InvalidSize,
    /// No directory entry matches the requested name.
    #[error("not found")]
    NotFound,
    /// `unlink` targeted a non-empty directory.
    #[error("directory not empty")]
    NotEmpty,
    /// No free inode or data block was available to satisfy the request.
    #[error("out of space")]
    OutOfSpace,
    /// A path string violates the rules in `resolve_path` (empty component,
    /// trailing slash on a non-directory, not absolute).
    #[error("invalid path")]
    InvalidPath,
    /// The underlying block device failed.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
