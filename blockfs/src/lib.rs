//! # blockfs
//!
//! A block-structured filesystem core: it lays out inodes, free-space
//! bitmaps, and data blocks on a fixed-size block device, and exposes
//! POSIX-like directory and file operations with transactional crash
//! tolerance.
//!
//! ```text
//! ┌─────────────────────────────┐
//! │ Directory / FileCore        │  stat, read, write, lookup, create,
//! │                              │  unlink, resolve_path
//! └─────────────┬───────────────┘
//!               │
//! ┌─────────────▼───────────────┐
//! │ InodeTable / DataRegion     │  allocate/free inodes and data blocks
//! └─────────────┬───────────────┘
//!               │
//! ┌─────────────▼───────────────┐
//! │ ByteIO                      │  byte-granular I/O across block
//! │                              │  boundaries
//! └─────────────┬───────────────┘
//!               │
//! ┌─────────────▼───────────────┐
//! │ Device (BlockDevice + txn)  │  fixed-size block I/O, shadow-map
//! │                              │  transactions
//! └──────────────────────────────┘
//! ```
//!
//! The filesystem is not reentrant and assumes a single-threaded,
//! cooperative caller: every mutating public operation opens one
//! transaction at entry and either commits on success or rolls back on any
//! error, so a crash or early return never leaves the on-disk image in a
//! partially-updated state.

pub mod bitmap;
pub mod byteio;
pub mod data_region;
pub mod device;
pub mod dirent;
pub mod directory;
pub mod error;
pub mod file;
pub mod format;
pub mod inode;
pub mod layout;

pub use data_region::DataRegion;
pub use device::{Device, FileDevice, MemDevice, RawBlockDevice};
pub use dirent::DirEntry;
pub use directory::Directory;
pub use error::{FsError, Result};
pub use file::FileCore;
pub use inode::{Inode, InodeTable, InodeType};
pub use layout::{SuperBlock, BLOCK_SIZE, DIRECT_POINTERS, MAX_NAME_LEN};

/// The root directory's inode number. Fixed by convention: every image
/// `blockfs` formats or opens has its root at inode 0.
pub const ROOT_INODE: usize = 0;

/// A whole filesystem: a block device plus the geometry and helpers built
/// on top of it. This is the entry point CLI tools use.
pub struct Filesystem<D: RawBlockDevice> {
    dev: Device<D>,
    superblock: SuperBlock,
    files: FileCore,
    dirs: Directory,
}

impl<D: RawBlockDevice> Filesystem<D> {
    /// Opens an already-formatted image: reads and validates the super
    /// block at block 0.
    pub fn open(raw: D) -> Result<Self> {
        let mut dev = Device::new(raw);
        let mut buf = [0u8; BLOCK_SIZE];
        dev.read_block(0, &mut buf)?;
        let superblock = SuperBlock::decode(&buf)?;
        let files = FileCore::new(
            InodeTable::from_superblock(&superblock),
            DataRegion::from_superblock(&superblock),
        );
        Ok(Filesystem {
            dev,
            superblock,
            files,
            dirs: Directory::new(files),
        })
    }

    /// Formats `raw` fresh with `num_inodes` inodes and `num_data` data
    /// blocks, then opens it.
    pub fn create(raw: D, num_inodes: usize, num_data: usize) -> Result<Self> {
        let mut dev = Device::new(raw);
        format::format(&mut dev, num_inodes, num_data)?;
        let superblock = format::plan_layout(num_inodes, num_data);
        let files = FileCore::new(
            InodeTable::from_superblock(&superblock),
            DataRegion::from_superblock(&superblock),
        );
        Ok(Filesystem {
            dev,
            superblock,
            files,
            dirs: Directory::new(files),
        })
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn stat(&mut self, inum: usize) -> Result<Inode> {
        self.files.stat(&mut self.dev, inum)
    }

    pub fn read(&mut self, inum: usize, buf: &mut [u8], size: usize) -> Result<()> {
        self.files.read(&mut self.dev, inum, buf, size)
    }

    pub fn write(&mut self, inum: usize, buf: &[u8], size: usize) -> Result<usize> {
        self.files.write(&mut self.dev, inum, buf, size)
    }

    pub fn lookup(&mut self, parent_inum: usize, name: &str) -> Result<usize> {
        self.dirs.lookup(&mut self.dev, parent_inum, name)
    }

    pub fn create_entry(
        &mut self,
        parent_inum: usize,
        ty: InodeType,
        name: &str,
    ) -> Result<usize> {
        self.dirs.create(&mut self.dev, parent_inum, ty, name)
    }

    pub fn unlink(&mut self, parent_inum: usize, name: &str) -> Result<()> {
        self.dirs.unlink(&mut self.dev, parent_inum, name)
    }

    pub fn resolve_path(&mut self, path: &str) -> Result<usize> {
        self.dirs.resolve_path(&mut self.dev, path)
    }

    /// Lists `parent_inum`'s entries, sorted ascending by name bytes (used
    /// by the `ls` CLI).
    pub fn read_dir(&mut self, parent_inum: usize) -> Result<Vec<DirEntry>> {
        let inode = self.stat(parent_inum)?;
        if inode.ty != InodeType::Directory {
            return Err(FsError::InvalidInode);
        }
        let size = inode.size as usize;
        let mut buf = vec![0u8; size];
        self.read(parent_inum, &mut buf, size)?;
        let mut entries: Vec<DirEntry> = buf
            .chunks(DirEntry::WIRE_SIZE)
            .map(DirEntry::decode)
            .collect::<Result<_>>()?;
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Ok(entries)
    }

    /// Raw access to the inode bitmap bytes, for the `bits` debugging tool.
    pub fn inode_bitmap_bytes(&mut self) -> Result<Vec<u8>> {
        let sb = self.superblock;
        let mut buf = vec![0u8; sb.inode_bitmap_len as usize * BLOCK_SIZE];
        byteio::read_bytes(
            &mut self.dev,
            sb.inode_bitmap_addr as usize * BLOCK_SIZE,
            buf.len(),
            &mut buf,
        )?;
        Ok(buf)
    }

    /// Raw access to the data bitmap bytes, for the `bits` debugging tool.
    pub fn data_bitmap_bytes(&mut self) -> Result<Vec<u8>> {
        let sb = self.superblock;
        let mut buf = vec![0u8; sb.data_bitmap_len as usize * BLOCK_SIZE];
        byteio::read_bytes(
            &mut self.dev,
            sb.data_bitmap_addr as usize * BLOCK_SIZE,
            buf.len(),
            &mut buf,
        )?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::MemDevice;

    fn fresh(num_inodes: usize, num_data: usize) -> Filesystem<MemDevice> {
        let sb = format::plan_layout(num_inodes, num_data);
        let raw = MemDevice::new(format::total_blocks(&sb));
        Filesystem::create(raw, num_inodes, num_data).unwrap()
    }

    // Format a disk: root directory exists at inum 0 with `.`/`..`.
    #[test]
    fn scenario_format_root_has_dot_and_dotdot() {
        let mut fs = fresh(32, 32);
        let entries = fs.read_dir(ROOT_INODE).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, ".");
        assert_eq!(entries[1].name, "..");
    }

    // Scenario 2: create a file, write it, read it back.
    #[test]
    fn scenario_create_write_read_file() {
        let mut fs = fresh(32, 32);
        let a = fs.create_entry(ROOT_INODE, InodeType::Regular, "a").unwrap();
        assert_eq!(a, 1);
        let n = fs.write(a, b"hello", 5).unwrap();
        assert_eq!(n, 5);
        let mut out = [0u8; 5];
        fs.read(a, &mut out, 5).unwrap();
        assert_eq!(&out, b"hello");
    }

    // Scenario 3: create a subdirectory, list it.
    #[test]
    fn scenario_create_subdirectory_and_list() {
        let mut fs = fresh(32, 32);
        let d = fs
            .create_entry(ROOT_INODE, InodeType::Directory, "d")
            .unwrap();
        let entries = fs.read_dir(d).unwrap();
        assert_eq!(entries[0].inum as usize, d);
        assert_eq!(entries[0].name, ".");
        assert_eq!(entries[1].inum, ROOT_INODE as u32);
        assert_eq!(entries[1].name, "..");
    }

    // Scenario 4: unlink a directory, data-bitmap popcount drops by 1.
    #[test]
    fn scenario_unlink_directory_frees_its_block() {
        let mut fs = fresh(32, 32);
        let before = fs.files.data.popcount(&mut fs.dev).unwrap();
        fs.create_entry(ROOT_INODE, InodeType::Directory, "d").unwrap();
        let during = fs.files.data.popcount(&mut fs.dev).unwrap();
        assert_eq!(during, before + 1);
        fs.unlink(ROOT_INODE, "d").unwrap();
        assert!(matches!(fs.lookup(ROOT_INODE, "d"), Err(FsError::NotFound)));
        let after = fs.files.data.popcount(&mut fs.dev).unwrap();
        assert_eq!(after, before);
    }

    // Scenario 6: `.`/`..` and nonexistent-name unlink behavior.
    #[test]
    fn scenario_unlink_dot_and_nonexistent() {
        let mut fs = fresh(32, 32);
        assert!(matches!(fs.unlink(ROOT_INODE, "."), Err(FsError::InvalidName)));
        fs.unlink(ROOT_INODE, "nonexistent").unwrap();
    }

    // P1: round-trip write/read for any size within capacity.
    #[test]
    fn property_round_trip_write_read() {
        let mut fs = fresh(32, 64);
        let f = fs.create_entry(ROOT_INODE, InodeType::Regular, "f").unwrap();
        let data: Vec<u8> = (0..(BLOCK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let n = fs.write(f, &data, data.len()).unwrap();
        assert_eq!(n, data.len());
        let mut out = vec![0u8; data.len()];
        fs.read(f, &mut out, data.len()).unwrap();
        assert_eq!(out, data);
    }

    // P6: path resolution of root and trailing-slash equivalence.
    #[test]
    fn property_path_resolution() {
        let mut fs = fresh(32, 32);
        assert_eq!(fs.resolve_path("/").unwrap(), ROOT_INODE);
        fs.create_entry(ROOT_INODE, InodeType::Directory, "d").unwrap();
        assert_eq!(
            fs.resolve_path("/d").unwrap(),
            fs.resolve_path("/d/").unwrap()
        );
    }
}
