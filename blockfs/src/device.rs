//! Fixed-size block I/O with transactional checkpoint/commit/rollback.
//!
//! [`RawBlockDevice`] is the thin abstraction over the actual storage medium
//! (a `Vec` of blocks for tests, a file for everything else). [`Device`]
//! wraps any [`RawBlockDevice`] with copy-on-first-write transaction
//! support: a shadow map of pre-transaction block contents keyed by block
//! number. Writes land on the real storage immediately (so readers inside
//! the same transaction see their own writes); `rollback` restores the
//! shadowed blocks, `commit` just drops the map.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{FsError, Result};
use crate::layout::BLOCK_SIZE;

/// A raw, non-transactional block store: read/write whole fixed-size
/// blocks by index.
pub trait RawBlockDevice {
    /// Total number of addressable blocks.
    fn block_count(&self) -> usize;
    /// Fills `buf` with the contents of block `n`.
    fn read_raw(&mut self, n: usize, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()>;
    /// Overwrites block `n` with `buf`.
    fn write_raw(&mut self, n: usize, buf: &[u8; BLOCK_SIZE]) -> io::Result<()>;
}

/// An all-in-memory block device, used by unit and integration tests.
pub struct MemDevice {
    blocks: Vec<[u8; BLOCK_SIZE]>,
}

impl MemDevice {
    /// Creates a device of `block_count` zeroed blocks.
    pub fn new(block_count: usize) -> Self {
        MemDevice {
            blocks: vec![[0u8; BLOCK_SIZE]; block_count],
        }
    }
}

impl RawBlockDevice for MemDevice {
    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn read_raw(&mut self, n: usize, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        buf.copy_from_slice(&self.blocks[n]);
        Ok(())
    }

    fn write_raw(&mut self, n: usize, buf: &[u8; BLOCK_SIZE]) -> io::Result<()> {
        self.blocks[n].copy_from_slice(buf);
        Ok(())
    }
}

/// A block device backed by a regular file, addressed by seeking to
/// `n * BLOCK_SIZE`.
pub struct FileDevice {
    file: File,
    block_count: usize,
}

impl FileDevice {
    /// Opens `file` as a block device. `file`'s length must already be a
    /// whole multiple of [`BLOCK_SIZE`] (callers format or pre-size it via
    /// [`crate::format`]).
    pub fn new(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(FileDevice {
            file,
            block_count: (len / BLOCK_SIZE as u64) as usize,
        })
    }
}

impl RawBlockDevice for FileDevice {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_raw(&mut self, n: usize, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start((n * BLOCK_SIZE) as u64))?;
        self.file.read_exact(buf)
    }

    fn write_raw(&mut self, n: usize, buf: &[u8; BLOCK_SIZE]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start((n * BLOCK_SIZE) as u64))?;
        self.file.write_all(buf)
    }
}

/// A transactional wrapper over any [`RawBlockDevice`].
pub struct Device<D: RawBlockDevice> {
    raw: D,
    /// `Some` while a transaction is open; maps a touched block number to
    /// its content as of the moment before this transaction's first write.
    shadow: Option<HashMap<usize, [u8; BLOCK_SIZE]>>,
}

impl<D: RawBlockDevice> Device<D> {
    pub fn new(raw: D) -> Self {
        Device { raw, shadow: None }
    }

    pub fn block_count(&self) -> usize {
        self.raw.block_count()
    }

    fn check_range(&self, n: usize) -> Result<()> {
        if n >= self.raw.block_count() {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block {n} out of range"),
            )));
        }
        Ok(())
    }

    /// Fills `buf[0..BLOCK_SIZE]` from block `n`.
    pub fn read_block(&mut self, n: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.check_range(n)?;
        self.raw.read_raw(n, buf)?;
        Ok(())
    }

    /// Overwrites block `n`. If a transaction is open and this is the first
    /// write to `n` within it, the pre-write content is stashed in the
    /// shadow map first.
    pub fn write_block(&mut self, n: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.check_range(n)?;
        if let Some(shadow) = &mut self.shadow {
            if let std::collections::hash_map::Entry::Vacant(e) = shadow.entry(n) {
                let mut orig = [0u8; BLOCK_SIZE];
                self.raw.read_raw(n, &mut orig)?;
                e.insert(orig);
            }
        }
        self.raw.write_raw(n, buf)?;
        log::trace!("write_block({n})");
        Ok(())
    }

    /// Opens a transaction. Nesting is not supported: calling this while a
    /// transaction is already open is an error.
    pub fn begin_transaction(&mut self) -> Result<()> {
        if self.shadow.is_some() {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::Other,
                "transaction already open",
            )));
        }
        self.shadow = Some(HashMap::new());
        log::debug!("transaction begin");
        Ok(())
    }

    /// Drops the shadow map; writes made since `begin_transaction` become
    /// durable.
    pub fn commit(&mut self) -> Result<()> {
        if self.shadow.take().is_none() {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::Other,
                "commit without an open transaction",
            )));
        }
        log::debug!("transaction commit");
        Ok(())
    }

    /// Restores every block written since `begin_transaction` to its
    /// pre-transaction content.
    pub fn rollback(&mut self) -> Result<()> {
        let shadow = self.shadow.take().ok_or_else(|| {
            FsError::Io(io::Error::new(
                io::ErrorKind::Other,
                "rollback without an open transaction",
            ))
        })?;
        for (n, orig) in shadow {
            self.raw.write_raw(n, &orig)?;
        }
        log::debug!("transaction rollback");
        Ok(())
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back
    /// on `Err`. This is the discipline every mutating public operation in
    /// `blockfs` follows.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.begin_transaction()?;
        match f(self) {
            Ok(v) => {
                self.commit()?;
                Ok(v)
            }
            Err(e) => {
                // A failure during rollback itself is fatal and out of
                // scope to recover from; surface it rather than the
                // original error so callers know the disk may be
                // inconsistent.
                self.rollback()?;
                Err(e)
            }
        }
    }
}
