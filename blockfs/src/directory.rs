//! Directory semantics — `lookup`, `create`, `unlink`, `resolve_path` — on
//! top of the flat inode API. Directory contents are just an array of
//! [`DirEntry`] serialized back to back; `inode.size` is always a multiple
//! of `DirEntry::WIRE_SIZE`.

use crate::device::{Device, RawBlockDevice};
use crate::dirent::{validate_name, DirEntry};
use crate::error::{FsError, Result};
use crate::file::FileCore;
use crate::inode::{Inode, InodeType};

/// Reserved entries every directory carries from creation.
const DOT: &str = ".";
const DOTDOT: &str = "..";

/// Directory-level operations, built on a [`FileCore`] that already knows
/// how to allocate inodes and data blocks.
#[derive(Clone, Copy)]
pub struct Directory {
    core: FileCore,
}

impl Directory {
    pub fn new(core: FileCore) -> Self {
        Directory { core }
    }

    fn read_entries<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        inum: usize,
    ) -> Result<Vec<DirEntry>> {
        let inode = self.core.stat(dev, inum)?;
        if inode.ty != InodeType::Directory {
            return Err(FsError::InvalidInode);
        }
        let size = inode.size as usize;
        let mut buf = vec![0u8; size];
        self.core.read(dev, inum, &mut buf, size)?;
        buf.chunks(DirEntry::WIRE_SIZE)
            .map(DirEntry::decode)
            .collect()
    }

    fn write_entries<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        inum: usize,
        entries: &[DirEntry],
    ) -> Result<()> {
        let mut buf = Vec::with_capacity(entries.len() * DirEntry::WIRE_SIZE);
        for e in entries {
            buf.extend_from_slice(&e.encode());
        }
        let written = self.core.write_content(dev, inum, &buf, buf.len())?;
        if written < buf.len() {
            // Directories treat a short write of their own contents as
            // fatal; the enclosing transaction rolls back. File copies
            // treat the same situation as partial success (see
            // `FileCore::write`).
            return Err(FsError::OutOfSpace);
        }
        Ok(())
    }

    /// Creates a fresh directory inode containing `.`/`..` and returns its
    /// number. Used both by [`Directory::create`] and by
    /// [`crate::format::format`] to bootstrap the root directory, so it
    /// does not open its own transaction — callers must already be inside
    /// one.
    pub(crate) fn create_directory_inode<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        parent_inum: usize,
    ) -> Result<usize> {
        let new_inum = self.core.inodes.allocate(dev)?;
        self.core
            .inodes
            .write_inode(dev, new_inum, &Inode::new(InodeType::Directory))?;
        let entries = [
            DirEntry::new(new_inum as u32, DOT)?,
            DirEntry::new(parent_inum as u32, DOTDOT)?,
        ];
        self.write_entries(dev, new_inum, &entries)?;
        Ok(new_inum)
    }

    /// Linear-scans `parent_inum`'s entries for `name`, returning its inode
    /// number. `InvalidInode` if `parent_inum` isn't a directory;
    /// `NotFound` if no entry matches.
    pub fn lookup<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        parent_inum: usize,
        name: &str,
    ) -> Result<usize> {
        let entries = self.read_entries(dev, parent_inum)?;
        entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.inum as usize)
            .ok_or(FsError::NotFound)
    }

    /// Creates `name` under `parent_inum` as a fresh inode of type `ty`.
    /// Idempotent: if an entry with that name already exists, returns its
    /// inode number iff its type matches; otherwise `InvalidType`.
    pub fn create<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        parent_inum: usize,
        ty: InodeType,
        name: &str,
    ) -> Result<usize> {
        validate_name(name)?;
        let parent = self.core.stat(dev, parent_inum)?;
        if parent.ty != InodeType::Directory {
            return Err(FsError::InvalidInode);
        }
        match self.lookup(dev, parent_inum, name) {
            Ok(existing) => {
                let inode = self.core.stat(dev, existing)?;
                return if inode.ty == ty {
                    Ok(existing)
                } else {
                    Err(FsError::InvalidType)
                };
            }
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }
        dev.transact(|dev| {
            let new_inum = self.core.inodes.allocate(dev)?;
            self.core.inodes.write_inode(dev, new_inum, &Inode::new(ty))?;
            if ty == InodeType::Directory {
                let entries = [
                    DirEntry::new(new_inum as u32, DOT)?,
                    DirEntry::new(parent_inum as u32, DOTDOT)?,
                ];
                self.write_entries(dev, new_inum, &entries)?;
            }
            let mut entries = self.read_entries(dev, parent_inum)?;
            entries.push(DirEntry::new(new_inum as u32, name)?);
            self.write_entries(dev, parent_inum, &entries)?;
            Ok(new_inum)
        })
    }

    /// Removes `name` from `parent_inum`. Idempotent: a missing name is a
    /// successful no-op. Rejects `.`/`..` and non-empty directories.
    pub fn unlink<D: RawBlockDevice>(
        &self,
        dev: &mut Device<D>,
        parent_inum: usize,
        name: &str,
    ) -> Result<()> {
        let parent = self.core.stat(dev, parent_inum)?;
        if parent.ty != InodeType::Directory {
            return Err(FsError::InvalidInode);
        }
        if name == DOT || name == DOTDOT {
            return Err(FsError::InvalidName);
        }
        let child_inum = match self.lookup(dev, parent_inum, name) {
            Ok(n) => n,
            Err(FsError::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        };
        dev.transact(|dev| {
            let child = self.core.stat(dev, child_inum)?;
            if child.ty == InodeType::Directory
                && child.size as usize > 2 * DirEntry::WIRE_SIZE
            {
                return Err(FsError::NotEmpty);
            }
            self.core.write_content(dev, child_inum, &[], 0)?;
            self.core.inodes.free(dev, child_inum)?;
            let mut entries = self.read_entries(dev, parent_inum)?;
            entries.retain(|e| e.name != name);
            self.write_entries(dev, parent_inum, &entries)?;
            Ok(())
        })
    }

    /// Resolves an absolute path to an inode number, starting at the root
    /// (inode 0). A trailing `/` is only permitted when the final
    /// component names a directory; an empty component (`//`) is an error.
    pub fn resolve_path<D: RawBlockDevice>(&self, dev: &mut Device<D>, path: &str) -> Result<usize> {
        if !path.starts_with('/') {
            return Err(FsError::InvalidPath);
        }
        if path == "/" {
            return Ok(0);
        }
        let trailing_slash = path.ends_with('/');
        let trimmed = if trailing_slash {
            &path[..path.len() - 1]
        } else {
            path
        };
        let body = &trimmed[1..];
        if body.is_empty() {
            return Err(FsError::InvalidPath);
        }
        let components: Vec<&str> = body.split('/').collect();
        let last = components.len() - 1;
        let mut cur = 0usize;
        for (i, comp) in components.iter().enumerate() {
            if comp.is_empty() {
                return Err(FsError::InvalidPath);
            }
            let next = self.lookup(dev, cur, comp)?;
            if i == last && trailing_slash {
                let inode = self.core.stat(dev, next)?;
                if inode.ty != InodeType::Directory {
                    return Err(FsError::InvalidPath);
                }
            }
            cur = next;
        }
        Ok(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_region::DataRegion;
    use crate::device::MemDevice;
    use crate::inode::InodeTable;
    use crate::layout::SuperBlock;

    fn fixture() -> (Directory, Device<MemDevice>) {
        let sb = SuperBlock {
            inode_bitmap_addr: 0,
            inode_bitmap_len: 1,
            data_bitmap_addr: 1,
            data_bitmap_len: 1,
            inode_region_addr: 2,
            inode_region_len: 1,
            data_region_addr: 3,
            data_region_len: 8,
            num_inodes: 16,
            num_data: 8,
        };
        let mut dev = Device::new(MemDevice::new(11));
        let core = FileCore::new(
            InodeTable::from_superblock(&sb),
            DataRegion::from_superblock(&sb),
        );
        let dir = Directory::new(core);
        dev.transact(|dev| {
            let root = core.inodes.allocate(dev)?;
            assert_eq!(root, 0);
            dir.create_directory_inode(dev, 0)
        })
        .unwrap();
        (dir, dev)
    }

    #[test]
    fn root_contains_dot_and_dotdot() {
        let (dir, mut dev) = fixture();
        assert_eq!(dir.lookup(&mut dev, 0, ".").unwrap(), 0);
        assert_eq!(dir.lookup(&mut dev, 0, "..").unwrap(), 0);
    }

    #[test]
    fn create_then_lookup_regular_file() {
        let (dir, mut dev) = fixture();
        let x = dir.create(&mut dev, 0, InodeType::Regular, "a").unwrap();
        assert_eq!(dir.lookup(&mut dev, 0, "a").unwrap(), x);
    }

    #[test]
    fn create_is_idempotent_for_matching_type() {
        let (dir, mut dev) = fixture();
        let a = dir.create(&mut dev, 0, InodeType::Regular, "a").unwrap();
        let a2 = dir.create(&mut dev, 0, InodeType::Regular, "a").unwrap();
        assert_eq!(a, a2);
    }

    #[test]
    fn create_conflicting_type_is_invalid_type() {
        let (dir, mut dev) = fixture();
        dir.create(&mut dev, 0, InodeType::Regular, "a").unwrap();
        assert!(matches!(
            dir.create(&mut dev, 0, InodeType::Directory, "a"),
            Err(FsError::InvalidType)
        ));
    }

    #[test]
    fn create_and_unlink_are_inverse() {
        let (dir, mut dev) = fixture();
        dir.create(&mut dev, 0, InodeType::Regular, "a").unwrap();
        dir.unlink(&mut dev, 0, "a").unwrap();
        assert!(matches!(
            dir.lookup(&mut dev, 0, "a"),
            Err(FsError::NotFound)
        ));
    }

    #[test]
    fn unlink_missing_name_is_idempotent_success() {
        let (dir, mut dev) = fixture();
        dir.unlink(&mut dev, 0, "nonexistent").unwrap();
    }

    #[test]
    fn unlink_dot_is_invalid_name() {
        let (dir, mut dev) = fixture();
        assert!(matches!(
            dir.unlink(&mut dev, 0, "."),
            Err(FsError::InvalidName)
        ));
    }

    #[test]
    fn unlink_non_empty_directory_fails() {
        let (dir, mut dev) = fixture();
        dir.create(&mut dev, 0, InodeType::Directory, "d").unwrap();
        let d = dir.lookup(&mut dev, 0, "d").unwrap();
        dir.create(&mut dev, d, InodeType::Regular, "f").unwrap();
        assert!(matches!(
            dir.unlink(&mut dev, 0, "d"),
            Err(FsError::NotEmpty)
        ));
    }

    #[test]
    fn resolve_path_root() {
        let (dir, mut dev) = fixture();
        assert_eq!(dir.resolve_path(&mut dev, "/").unwrap(), 0);
    }

    #[test]
    fn resolve_path_nested_directory_with_and_without_trailing_slash() {
        let (dir, mut dev) = fixture();
        dir.create(&mut dev, 0, InodeType::Directory, "d").unwrap();
        let a = dir.resolve_path(&mut dev, "/d").unwrap();
        let b = dir.resolve_path(&mut dev, "/d/").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn resolve_path_trailing_slash_on_file_is_invalid() {
        let (dir, mut dev) = fixture();
        dir.create(&mut dev, 0, InodeType::Regular, "f").unwrap();
        assert!(matches!(
            dir.resolve_path(&mut dev, "/f/"),
            Err(FsError::InvalidPath)
        ));
    }

    #[test]
    fn resolve_path_double_slash_is_invalid() {
        let (dir, mut dev) = fixture();
        assert!(matches!(
            dir.resolve_path(&mut dev, "//"),
            Err(FsError::InvalidPath)
        ));
    }

    #[test]
    fn create_out_of_space_during_append_rolls_back_atomically() {
        let (dir, mut dev) = fixture();
        // Saturate the inode table so appending a new entry's inode
        // allocation fails partway through `create`.
        loop {
            if dir.core.inodes.allocate(&mut dev).is_err() {
                break;
            }
        }
        let before_bits = dir.core.data.popcount(&mut dev).unwrap();
        assert!(matches!(
            dir.create(&mut dev, 0, InodeType::Regular, "a"),
            Err(FsError::OutOfSpace)
        ));
        assert_eq!(dir.core.data.popcount(&mut dev).unwrap(), before_bits);
        assert!(matches!(
            dir.lookup(&mut dev, 0, "a"),
            Err(FsError::NotFound)
        ));
    }
}
