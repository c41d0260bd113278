//! `stat`, `read`, and size-changing `write` on inodes.

use crate::data_region::DataRegion;
use crate::device::{Device, RawBlockDevice};
use crate::error::{FsError, Result};
use crate::inode::{Inode, InodeTable, InodeType};
use crate::layout::{BLOCK_SIZE, DIRECT_POINTERS};

/// Operations on inode content: metadata lookup plus size-changing reads
/// and writes. Directory and regular-file content both flow through here;
/// `write` forbids directories, and [`FileCore::write_content`] is the
/// internal escape hatch `Directory` uses to rewrite its own entries.
#[derive(Clone, Copy)]
pub struct FileCore {
    pub(crate) inodes: InodeTable,
    pub(crate) data: DataRegion,
}

impl FileCore {
    pub fn new(inodes: InodeTable, data: DataRegion) -> Self {
        FileCore { inodes, data }
    }

    /// Returns the inode record for `inum`.
    pub fn stat<D: RawBlockDevice>(&self, dev: &mut Device<D>, inum: usize) -> Result<Inode> {
        self.inodes.read_inode(dev, inum)
    }

    /// Reads exactly `size` bytes from the start of the file into `buf`.
    /// `size` may be less than the file's logical size (a partial read);
    /// it may not exceed it.
    pub fn read<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        inum: usize,
        buf: &mut [u8],
        size: usize,
    ) -> Result<()> {
        let inode = self.inodes.read_inode(dev, inum)?;
        if size > inode.size as usize {
            return Err(FsError::InvalidSize);
        }
        assert!(buf.len() >= size);
        let mut remaining = size;
        let mut offset = 0;
        let mut block_buf = [0u8; BLOCK_SIZE];
        let mut i = 0;
        while remaining > 0 {
            let ptr = inode.direct[i];
            self.data.read_data_block(dev, ptr, &mut block_buf)?;
            let chunk = remaining.min(BLOCK_SIZE);
            buf[offset..offset + chunk].copy_from_slice(&block_buf[..chunk]);
            offset += chunk;
            remaining -= chunk;
            i += 1;
        }
        Ok(())
    }

    /// Public, regular-file-only `write`: truncates or extends the file to
    /// exactly `size` bytes and overwrites its content with `buf[0..size]`.
    /// Returns the number of bytes actually written; this is less than
    /// `size` only if allocation ran out of data blocks partway through
    /// (a short write), in which case the inode's size reflects the
    /// shorter length and the operation has still committed up to that
    /// boundary.
    pub fn write<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        inum: usize,
        buf: &[u8],
        size: usize,
    ) -> Result<usize> {
        let inode = self.inodes.read_inode(dev, inum)?;
        if inode.ty == InodeType::Directory {
            return Err(FsError::InvalidType);
        }
        self.write_content(dev, inum, buf, size)
    }

    /// Like [`FileCore::write`] but permitted on directories too; used
    /// internally by [`crate::directory::Directory`] to rewrite its own
    /// entry list.
    pub(crate) fn write_content<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        inum: usize,
        buf: &[u8],
        size: usize,
    ) -> Result<usize> {
        let mut inode = self.inodes.read_inode(dev, inum)?;
        let new_blocks = size.div_ceil(BLOCK_SIZE);
        if new_blocks > DIRECT_POINTERS {
            return Err(FsError::OutOfSpace);
        }
        let old_blocks = inode.blocks_in_use();

        let mut written = 0usize;
        let mut block_buf = [0u8; BLOCK_SIZE];

        for i in 0..old_blocks.min(new_blocks) {
            let chunk = (size - written).min(BLOCK_SIZE);
            block_buf = [0u8; BLOCK_SIZE];
            block_buf[..chunk].copy_from_slice(&buf[written..written + chunk]);
            self.data.write_data_block(dev, inode.direct[i], &block_buf)?;
            written += chunk;
        }

        let mut short = false;
        for i in old_blocks..new_blocks {
            match self.data.allocate_block(dev) {
                Ok(ptr) => {
                    let chunk = (size - written).min(BLOCK_SIZE);
                    block_buf = [0u8; BLOCK_SIZE];
                    block_buf[..chunk].copy_from_slice(&buf[written..written + chunk]);
                    self.data.write_data_block(dev, ptr, &block_buf)?;
                    inode.direct[i] = ptr;
                    written += chunk;
                }
                Err(FsError::OutOfSpace) => {
                    short = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let final_blocks = if short { old_blocks.max(written.div_ceil(BLOCK_SIZE)) } else { new_blocks };
        for i in final_blocks..old_blocks {
            self.data.free_block(dev, inode.direct[i])?;
            inode.direct[i] = 0;
        }

        inode.size = written as u32;
        self.inodes.write_inode(dev, inum, &inode)?;
        Ok(written)
    }
}
