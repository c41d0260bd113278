//! Lays out a fresh filesystem image: super block, zeroed bitmaps, empty
//! inode table, and a root directory (inode 0) containing `.`/`..`.

use crate::data_region::DataRegion;
use crate::device::{Device, RawBlockDevice};
use crate::directory::Directory;
use crate::error::Result;
use crate::file::FileCore;
use crate::inode::InodeTable;
use crate::layout::{SuperBlock, BLOCK_SIZE};

/// Computes the super block for a filesystem with `num_inodes` inodes and
/// `num_data` data blocks, laying out regions back to back starting at
/// block 1 (block 0 holds the super block itself).
pub fn plan_layout(num_inodes: usize, num_data: usize) -> SuperBlock {
    let inode_bitmap_len = SuperBlock::bitmap_blocks(num_inodes);
    let data_bitmap_len = SuperBlock::bitmap_blocks(num_data);
    let inode_region_len = SuperBlock::inode_region_blocks(num_inodes);

    let inode_bitmap_addr = 1;
    let data_bitmap_addr = inode_bitmap_addr + inode_bitmap_len;
    let inode_region_addr = data_bitmap_addr + data_bitmap_len;
    let data_region_addr = inode_region_addr + inode_region_len;

    SuperBlock {
        inode_bitmap_addr: inode_bitmap_addr as u32,
        inode_bitmap_len: inode_bitmap_len as u32,
        data_bitmap_addr: data_bitmap_addr as u32,
        data_bitmap_len: data_bitmap_len as u32,
        inode_region_addr: inode_region_addr as u32,
        inode_region_len: inode_region_len as u32,
        data_region_addr: data_region_addr as u32,
        data_region_len: num_data as u32,
        num_inodes: num_inodes as u32,
        num_data: num_data as u32,
    }
}

/// Total number of blocks an image with this geometry must have.
pub fn total_blocks(sb: &SuperBlock) -> usize {
    sb.data_region_addr as usize + sb.data_region_len as usize
}

/// Formats `dev`, which must already have at least `total_blocks(&sb)`
/// blocks, where `sb = plan_layout(num_inodes, num_data)`. Zeroes both
/// bitmaps and the inode region, writes the super block, and creates the
/// root directory (inode 0) as its own transaction.
pub fn format<D: RawBlockDevice>(
    dev: &mut Device<D>,
    num_inodes: usize,
    num_data: usize,
) -> Result<()> {
    let sb = plan_layout(num_inodes, num_data);
    let needed = total_blocks(&sb);
    if dev.block_count() < needed {
        return Err(crate::error::FsError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("device has {} blocks, format needs {needed}", dev.block_count()),
        )));
    }

    dev.transact(|dev| {
        let zero = [0u8; BLOCK_SIZE];
        dev.write_block(0, &sb.encode())?;
        for b in sb.inode_bitmap_addr..sb.inode_bitmap_addr + sb.inode_bitmap_len {
            dev.write_block(b as usize, &zero)?;
        }
        for b in sb.data_bitmap_addr..sb.data_bitmap_addr + sb.data_bitmap_len {
            dev.write_block(b as usize, &zero)?;
        }
        for b in sb.inode_region_addr..sb.inode_region_addr + sb.inode_region_len {
            dev.write_block(b as usize, &zero)?;
        }

        let core = FileCore::new(
            InodeTable::from_superblock(&sb),
            DataRegion::from_superblock(&sb),
        );
        let dir = Directory::new(core);
        let root = core.inodes.allocate(dev)?;
        debug_assert_eq!(root, 0, "root directory must be inode 0");
        dir.create_directory_inode(dev, 0)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;

    #[test]
    fn format_creates_root_with_dot_and_dotdot() {
        let sb = plan_layout(32, 32);
        let mut dev = Device::new(MemDevice::new(total_blocks(&sb)));
        format(&mut dev, 32, 32).unwrap();

        let core = FileCore::new(
            InodeTable::from_superblock(&sb),
            DataRegion::from_superblock(&sb),
        );
        let dir = Directory::new(core);
        assert_eq!(dir.lookup(&mut dev, 0, ".").unwrap(), 0);
        assert_eq!(dir.lookup(&mut dev, 0, "..").unwrap(), 0);
    }

    #[test]
    fn layout_regions_are_disjoint_and_ascending() {
        let sb = plan_layout(33, 100);
        // 33 inodes at 128 bytes each need 2 blocks, not 1.
        assert_eq!(sb.inode_region_len, 2);
        let mut dev = Device::new(MemDevice::new(total_blocks(&sb)));
        format(&mut dev, 33, 100).unwrap();
    }
}
