//! Data block allocation and raw block I/O against the data region.

use crate::bitmap::Bitmap;
use crate::byteio::{read_bytes, write_bytes};
use crate::device::{Device, RawBlockDevice};
use crate::error::{FsError, Result};
use crate::layout::{SuperBlock, BLOCK_SIZE};

/// Geometry needed to translate between data-bitmap bit indices and the
/// absolute block numbers stored in an inode's `direct[]` array.
#[derive(Clone, Copy)]
pub struct DataRegion {
    bitmap_addr: usize,
    bitmap_len: usize,
    region_addr: usize,
    num_data: usize,
}

impl DataRegion {
    pub fn from_superblock(sb: &SuperBlock) -> Self {
        DataRegion {
            bitmap_addr: sb.data_bitmap_addr as usize,
            bitmap_len: sb.data_bitmap_len as usize,
            region_addr: sb.data_region_addr as usize,
            num_data: sb.num_data as usize,
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

    /// Reads the data block at absolute block number `ptr`.
    pub fn read_data_block<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        ptr: u32,
        buf: &mut [u8; BLOCK_SIZE],
    ) -> Result<()> {
        dev.read_block(ptr as usize, buf)
    }

    /// Overwrites the data block at absolute block number `ptr`.
    pub fn write_data_block<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        ptr: u32,
        buf: &[u8; BLOCK_SIZE],
    ) -> Result<()> {
        dev.write_block(ptr as usize, buf)
    }

    /// Allocates a fresh, zeroed data block and returns its absolute block
    /// number (`data_region_addr + bit_index`). `OutOfSpace` if none free.
    pub fn allocate_block<D: RawBlockDevice>(&self, dev: &mut Device<D>) -> Result<u32> {
        let mut buf = self.load_bitmap(dev)?;
        let idx = {
            let bm = Bitmap::new(&mut buf);
            bm.find_first_clear(self.num_data).ok_or(FsError::OutOfSpace)?
        };
        Bitmap::new(&mut buf).set(idx);
        self.store_bitmap(dev, &buf)?;
        let ptr = (self.region_addr + idx) as u32;
        self.write_data_block(dev, ptr, &[0u8; BLOCK_SIZE])?;
        log::debug!("allocated data block {ptr}");
        Ok(ptr)
    }

    /// Frees the data block at absolute block number `ptr`.
    pub fn free_block<D: RawBlockDevice>(&self, dev: &mut Device<D>, ptr: u32) -> Result<()> {
        let idx = ptr as usize - self.region_addr;
        let mut buf = self.load_bitmap(dev)?;
        Bitmap::new(&mut buf).clear(idx);
        self.store_bitmap(dev, &buf)?;
        log::debug!("freed data block {ptr}");
        Ok(())
    }

    /// Number of data blocks currently marked allocated. Used by tests that
    /// check for dangling or leaked bitmap bits.
    pub fn popcount<D: RawBlockDevice>(&self, dev: &mut Device<D>) -> Result<usize> {
        let mut buf = self.load_bitmap(dev)?;
        Ok(Bitmap::new(&mut buf).popcount(self.num_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;

    fn region() -> (DataRegion, Device<MemDevice>) {
        let sb = SuperBlock {
            inode_bitmap_addr: 0,
            inode_bitmap_len: 1,
            data_bitmap_addr: 1,
            data_bitmap_len: 1,
            inode_region_addr: 2,
            inode_region_len: 1,
            data_region_addr: 3,
            data_region_len: 4,
            num_inodes: 8,
            num_data: 4,
        };
        (DataRegion::from_superblock(&sb), Device::new(MemDevice::new(7)))
    }

    #[test]
    fn allocate_returns_offset_addresses() {
        let (dr, mut dev) = region();
        let a = dr.allocate_block(&mut dev).unwrap();
        let b = dr.allocate_block(&mut dev).unwrap();
        assert_eq!(a, 3);
        assert_eq!(b, 4);
    }

    #[test]
    fn allocated_blocks_are_zeroed() {
        let (dr, mut dev) = region();
        let ptr = dr.allocate_block(&mut dev).unwrap();
        let mut buf = [0xFFu8; BLOCK_SIZE];
        dr.read_data_block(&mut dev, ptr, &mut buf).unwrap();
        assert_eq!(buf, [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn free_allows_reuse() {
        let (dr, mut dev) = region();
        let a = dr.allocate_block(&mut dev).unwrap();
        dr.free_block(&mut dev, a).unwrap();
        let b = dr.allocate_block(&mut dev).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_space_when_saturated() {
        let (dr, mut dev) = region();
        for _ in 0..4 {
            dr.allocate_block(&mut dev).unwrap();
        }
        assert!(matches!(dr.allocate_block(&mut dev), Err(FsError::OutOfSpace)));
    }
}
