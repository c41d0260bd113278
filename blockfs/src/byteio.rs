//! Byte-granular reads and writes spanning block boundaries, built on top
//! of [`Device`]. Everything above this layer (bitmaps, inode records,
//! directory entries) is phrased in bytes at an absolute device offset;
//! this module is the only place that turns a `(addr, len)` pair into a
//! sequence of block I/Os.

use crate::device::{Device, RawBlockDevice};
use crate::error::Result;
use crate::layout::BLOCK_SIZE;

/// Splits `[addr, addr + len)` into `(block_index, intra_block_offset,
/// chunk_len)` triples covering the range in order.
fn chunks(addr: usize, len: usize) -> impl Iterator<Item = (usize, usize, usize)> {
    let mut remaining = len;
    let mut pos = addr;
    std::iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }
        let block = pos / BLOCK_SIZE;
        let offset = pos % BLOCK_SIZE;
        let chunk = remaining.min(BLOCK_SIZE - offset);
        pos += chunk;
        remaining -= chunk;
        Some((block, offset, chunk))
    })
}

/// Reads `len` bytes starting at byte address `addr` into `dst[0..len]`.
pub fn read_bytes<D: RawBlockDevice>(
    dev: &mut Device<D>,
    addr: usize,
    len: usize,
    dst: &mut [u8],
) -> Result<()> {
    assert!(dst.len() >= len);
    let mut written = 0;
    let mut block_buf = [0u8; BLOCK_SIZE];
    for (block, offset, chunk) in chunks(addr, len) {
        dev.read_block(block, &mut block_buf)?;
        dst[written..written + chunk].copy_from_slice(&block_buf[offset..offset + chunk]);
        written += chunk;
    }
    Ok(())
}

/// Writes `src[0..len]` starting at byte address `addr`. A write that
/// doesn't cover a whole block reads the block first to preserve the
/// bytes outside the written range.
pub fn write_bytes<D: RawBlockDevice>(
    dev: &mut Device<D>,
    addr: usize,
    len: usize,
    src: &[u8],
) -> Result<()> {
    assert!(src.len() >= len);
    let mut read = 0;
    let mut block_buf = [0u8; BLOCK_SIZE];
    for (block, offset, chunk) in chunks(addr, len) {
        if chunk == BLOCK_SIZE {
            block_buf.copy_from_slice(&src[read..read + chunk]);
        } else {
            dev.read_block(block, &mut block_buf)?;
            block_buf[offset..offset + chunk].copy_from_slice(&src[read..read + chunk]);
        }
        dev.write_block(block, &block_buf)?;
        read += chunk;
    }
    Ok(())
}
