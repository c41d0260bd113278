//! Inode records and the inode table: allocation, load, and store.

use crate::bitmap::Bitmap;
use crate::byteio::{read_bytes, write_bytes};
use crate::device::{Device, RawBlockDevice};
use crate::error::{FsError, Result};
use crate::layout::{SuperBlock, BLOCK_SIZE, DIRECT_POINTERS};

/// The type of a file system object, stored in the inode record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    Regular = 0,
    Directory = 1,
}

impl InodeType {
    fn from_u32(v: u32) -> Result<Self> {
        match v {
            0 => Ok(InodeType::Regular),
            1 => Ok(InodeType::Directory),
            _ => Err(FsError::InvalidType),
        }
    }
}

/// A fixed-size inode record: type, logical size, and `DIRECT_POINTERS`
/// absolute block numbers into the data region. There are no indirect
/// blocks.
#[derive(Debug, Clone, Copy)]
pub struct Inode {
    pub ty: InodeType,
    pub size: u32,
    pub direct: [u32; DIRECT_POINTERS],
}

impl Inode {
    /// `type:i32, size:i32, direct[K]:i32` packed with no padding.
    pub const WIRE_SIZE: usize = 4 + 4 + DIRECT_POINTERS * 4;

    pub fn new(ty: InodeType) -> Self {
        Inode {
            ty,
            size: 0,
            direct: [0; DIRECT_POINTERS],
        }
    }

    /// Number of direct pointers currently in use, `ceil(size / BLOCK_SIZE)`.
    pub fn blocks_in_use(&self) -> usize {
        (self.size as usize).div_ceil(BLOCK_SIZE)
    }

    pub fn encode(&self) -> [u8; Inode::WIRE_SIZE] {
        let mut buf = [0u8; Inode::WIRE_SIZE];
        buf[0..4].copy_from_slice(&(self.ty as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&self.size.to_le_bytes());
        for (i, ptr) in self.direct.iter().enumerate() {
            let off = 8 + i * 4;
            buf[off..off + 4].copy_from_slice(&ptr.to_le_bytes());
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        assert!(buf.len() >= Inode::WIRE_SIZE);
        let ty = InodeType::from_u32(u32::from_le_bytes(buf[0..4].try_into().unwrap()))?;
        let size = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let mut direct = [0u32; DIRECT_POINTERS];
        for (i, ptr) in direct.iter_mut().enumerate() {
            let off = 8 + i * 4;
            *ptr = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        }
        Ok(Inode { ty, size, direct })
    }
}

/// The geometry an [`InodeTable`] needs: a copy of the relevant super block
/// fields. Allocation and record mutation happen inside the caller's
/// transaction; this component never opens its own.
#[derive(Clone, Copy)]
pub struct InodeTable {
    bitmap_addr: usize,
    bitmap_len: usize,
    region_addr: usize,
    num_inodes: usize,
}

impl InodeTable {
    pub fn from_superblock(sb: &SuperBlock) -> Self {
        InodeTable {
            bitmap_addr: sb.inode_bitmap_addr as usize,
            bitmap_len: sb.inode_bitmap_len as usize,
            region_addr: sb.inode_region_addr as usize,
            num_inodes: sb.num_inodes as usize,
        }
    }

    fn bitmap_bytes_len(&self) -> usize {
        self.bitmap_len * BLOCK_SIZE
    }

    fn load_bitmap<D: RawBlockDevice>(&self, dev: &mut Device<D>) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.bitmap_bytes_len()];
        read_bytes(dev, self.bitmap_addr * BLOCK_SIZE, buf.len(), &mut buf)?;
        Ok(buf)
    }

    fn store_bitmap<D: RawBlockDevice>(&self, dev: &mut Device<D>, buf: &[u8]) -> Result<()> {
        write_bytes(dev, self.bitmap_addr * BLOCK_SIZE, buf.len(), buf)
    }

    fn is_allocated<D: RawBlockDevice>(&self, dev: &mut Device<D>, n: usize) -> Result<bool> {
        let mut buf = self.load_bitmap(dev)?;
        Ok(Bitmap::new(&mut buf).test(n))
    }

    /// Loads the `n`-th inode record. Fails with `InvalidInode` if `n` is
    /// out of range or its bitmap bit is clear.
    pub fn read_inode<D: RawBlockDevice>(&self, dev: &mut Device<D>, n: usize) -> Result<Inode> {
        if n >= self.num_inodes || !self.is_allocated(dev, n)? {
            return Err(FsError::InvalidInode);
        }
        let mut buf = [0u8; Inode::WIRE_SIZE];
        let addr = self.region_addr * BLOCK_SIZE + n * Inode::WIRE_SIZE;
        read_bytes(dev, addr, Inode::WIRE_SIZE, &mut buf)?;
        Inode::decode(&buf)
    }

    /// Overwrites record `n` unconditionally (the caller is responsible for
    /// having allocated it).
    pub fn write_inode<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        n: usize,
        inode: &Inode,
    ) -> Result<()> {
        let addr = self.region_addr * BLOCK_SIZE + n * Inode::WIRE_SIZE;
        let buf = inode.encode();
        write_bytes(dev, addr, Inode::WIRE_SIZE, &buf)
    }

    /// Finds the lowest-numbered free inode below `num_inodes`, marks it
    /// allocated, and returns its number. `OutOfSpace` if none is free.
    pub fn allocate<D: RawBlockDevice>(&self, dev: &mut Device<D>) -> Result<usize> {
        let mut buf = self.load_bitmap(dev)?;
        let n = {
            let bm = Bitmap::new(&mut buf);
            bm.find_first_clear(self.num_inodes).ok_or(FsError::OutOfSpace)?
        };
        Bitmap::new(&mut buf).set(n);
        self.store_bitmap(dev, &buf)?;
        log::debug!("allocated inode {n}");
        Ok(n)
    }

    /// Clears inode `n`'s bitmap bit.
    pub fn free<D: RawBlockDevice>(&self, dev: &mut Device<D>, n: usize) -> Result<()> {
        let mut buf = self.load_bitmap(dev)?;
        Bitmap::new(&mut buf).clear(n);
        self.store_bitmap(dev, &buf)?;
        log::debug!("freed inode {n}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;

    fn table() -> (InodeTable, Device<MemDevice>) {
        let sb = SuperBlock {
            inode_bitmap_addr: 0,
            inode_bitmap_len: 1,
            data_bitmap_addr: 1,
            data_bitmap_len: 1,
            inode_region_addr: 2,
            inode_region_len: SuperBlock::inode_region_blocks(8) as u32,
            data_region_addr: 2 + SuperBlock::inode_region_blocks(8) as u32,
            data_region_len: 8,
            num_inodes: 8,
            num_data: 8,
        };
        let blocks = 2 + sb.inode_region_len as usize + sb.data_region_len as usize;
        (
            InodeTable::from_superblock(&sb),
            Device::new(MemDevice::new(blocks)),
        )
    }

    #[test]
    fn allocate_then_read_write_round_trips() {
        let (table, mut dev) = table();
        let n = table.allocate(&mut dev).unwrap();
        assert_eq!(n, 0);
        let inode = Inode::new(InodeType::Regular);
        table.write_inode(&mut dev, n, &inode).unwrap();
        let loaded = table.read_inode(&mut dev, n).unwrap();
        assert_eq!(loaded.ty, InodeType::Regular);
        assert_eq!(loaded.size, 0);
    }

    #[test]
    fn read_unallocated_inode_fails() {
        let (table, mut dev) = table();
        assert!(matches!(
            table.read_inode(&mut dev, 0),
            Err(FsError::InvalidInode)
        ));
    }

    #[test]
    fn free_then_reallocate_reuses_lowest_number() {
        let (table, mut dev) = table();
        let a = table.allocate(&mut dev).unwrap();
        let _b = table.allocate(&mut dev).unwrap();
        table.free(&mut dev, a).unwrap();
        let c = table.allocate(&mut dev).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn allocate_fails_when_saturated() {
        let (table, mut dev) = table();
        for _ in 0..8 {
            table.allocate(&mut dev).unwrap();
        }
        assert!(matches!(table.allocate(&mut dev), Err(FsError::OutOfSpace)));
    }
}
