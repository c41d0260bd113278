//! On-disk layout: the super block and the region address/length arithmetic
//! every other component is built on.

use crate::error::{FsError, Result};

/// Size of one block, in bytes. Fixed for this filesystem (no variable
/// block sizes).
pub const BLOCK_SIZE: usize = 4096;

/// Number of direct block pointers carried by every inode. There are no
/// indirect blocks, so `DIRECT_POINTERS * BLOCK_SIZE` is the largest file
/// this filesystem can hold.
pub const DIRECT_POINTERS: usize = 30;

/// Maximum bytes in a directory entry name, including the NUL terminator.
pub const MAX_NAME_LEN: usize = 28;

const SUPERBLOCK_FIELDS: usize = 10;
const SUPERBLOCK_WIRE_SIZE: usize = SUPERBLOCK_FIELDS * 4;

/// The super block: global geometry of the filesystem, stored at block 0.
///
/// Field order here is the on-disk field order (`encode`/`decode` round-trip
/// bit-exactly); all integers are little-endian `u32`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub inode_bitmap_addr: u32,
    pub inode_bitmap_len: u32,
    pub data_bitmap_addr: u32,
    pub data_bitmap_len: u32,
    pub inode_region_addr: u32,
    pub inode_region_len: u32,
    pub data_region_addr: u32,
    pub data_region_len: u32,
    pub num_inodes: u32,
    pub num_data: u32,
}

impl SuperBlock {
    /// Packs the super block into a zero-padded block-sized buffer.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        let fields = [
            self.inode_bitmap_addr,
            self.inode_bitmap_len,
            self.data_bitmap_addr,
            self.data_bitmap_len,
            self.inode_region_addr,
            self.inode_region_len,
            self.data_region_addr,
            self.data_region_len,
            self.num_inodes,
            self.num_data,
        ];
        for (i, field) in fields.iter().enumerate() {
            buf[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        buf
    }

    /// Unpacks a super block from a block-sized buffer previously produced
    /// by [`SuperBlock::encode`], validating the region invariants.
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        let mut fields = [0u32; SUPERBLOCK_FIELDS];
        for (i, field) in fields.iter_mut().enumerate() {
            let bytes: [u8; 4] = buf[i * 4..i * 4 + 4].try_into().unwrap();
            *field = u32::from_le_bytes(bytes);
        }
        let sb = SuperBlock {
            inode_bitmap_addr: fields[0],
            inode_bitmap_len: fields[1],
            data_bitmap_addr: fields[2],
            data_bitmap_len: fields[3],
            inode_region_addr: fields[4],
            inode_region_len: fields[5],
            data_region_addr: fields[6],
            data_region_len: fields[7],
            num_inodes: fields[8],
            num_data: fields[9],
        };
        sb.validate()?;
        Ok(sb)
    }

    /// Checks the §3 cross-region invariants: regions are disjoint and in
    /// ascending order, each `*_len` holds its region, and the inode/data
    /// counts fit within their bitmaps.
    fn validate(&self) -> Result<()> {
        let regions = [
            (self.inode_bitmap_addr, self.inode_bitmap_len),
            (self.data_bitmap_addr, self.data_bitmap_len),
            (self.inode_region_addr, self.inode_region_len),
            (self.data_region_addr, self.data_region_len),
        ];
        for (addr, len) in regions {
            if len == 0 {
                return Err(FsError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "zero-length region in super block",
                )));
            }
            let _ = addr;
        }
        for w in regions.windows(2) {
            let (prev_addr, prev_len) = w[0];
            let (next_addr, _) = w[1];
            if prev_addr.checked_add(prev_len).map(|end| end > next_addr) != Some(false) {
                return Err(FsError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "super block regions are not disjoint and ascending",
                )));
            }
        }
        if (self.num_inodes as u64) > self.inode_bitmap_len as u64 * BLOCK_SIZE as u64 * 8 {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "num_inodes exceeds inode bitmap capacity",
            )));
        }
        if (self.num_data as u64) > self.data_bitmap_len as u64 * BLOCK_SIZE as u64 * 8 {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "num_data exceeds data bitmap capacity",
            )));
        }
        let inode_record_size = crate::inode::Inode::WIRE_SIZE as u64;
        let inode_region_bytes = self.inode_region_len as u64 * BLOCK_SIZE as u64;
        if self.num_inodes as u64 * inode_record_size > inode_region_bytes {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "inode region too small for num_inodes",
            )));
        }
        Ok(())
    }

    /// Number of whole blocks needed to hold `num_inodes` fixed-size inode
    /// records. Sized in *bytes* (`inode_count * sizeof(inode) / BLOCK_SIZE`,
    /// rounded up), never by block count alone — a block-count division
    /// under-provisions whenever inodes don't pack evenly into a block.
    pub fn inode_region_blocks(num_inodes: usize) -> usize {
        let bytes = num_inodes * crate::inode::Inode::WIRE_SIZE;
        bytes.div_ceil(BLOCK_SIZE)
    }

    /// Number of whole blocks needed to bitmap-track `num_bits` items.
    pub fn bitmap_blocks(num_bits: usize) -> usize {
        num_bits.div_ceil(BLOCK_SIZE * 8)
    }
}
