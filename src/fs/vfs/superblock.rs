//! Superblock and Filesystem Type
//!
//! This module defines the FsType trait that filesystem implementations
//! register with the VFS, the SuperBlock describing one mounted instance,
//! and the mount options passed from `mount` down to the filesystem.

use alloc::string::String;
use alloc::sync::Arc;

use super::inode::{FsResult, Inode, Private};

/// Filesystem type trait for registration and mounting
pub trait FsType: Send + Sync {
    /// Returns the filesystem type name (e.g., "ramfs")
    fn name(&self) -> &'static str;

    /// Mount a filesystem instance
    ///
    /// # Arguments
    /// * `sb_id` - Id the VFS assigned to the new superblock
    /// * `source` - Device or source name given to mount
    /// * `opts` - Mount options
    ///
    /// # Returns
    /// A new SuperBlock instance on success
    fn mount(&self, sb_id: u64, source: &str, opts: &MountOpts) -> FsResult<SuperBlock>;
}

/// Per-mount filesystem metadata
pub struct SuperBlock {
    id: u64,
    block_size: u32,
    fs_type: &'static str,
    flags: MountFlags,
    root: Arc<Inode>,
    private: Private,
}

impl SuperBlock {
    pub fn new(
        id: u64,
        block_size: u32,
        fs_type: &'static str,
        flags: MountFlags,
        root: Inode,
        private: Private,
    ) -> Self {
        Self {
            id,
            block_size,
            fs_type,
            flags,
            root: Arc::new(root),
            private,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Name of the filesystem type that created this superblock
    pub fn fs_type(&self) -> &'static str {
        self.fs_type
    }

    pub fn flags(&self) -> MountFlags {
        self.flags
    }

    /// Root inode of this filesystem instance
    pub fn root(&self) -> &Arc<Inode> {
        &self.root
    }

    /// Filesystem-private data, downcast to the owner's type
    pub fn private_as<T: core::any::Any + Send + Sync>(&self) -> Option<&T> {
        self.private.downcast_ref::<T>()
    }
}

/// Mount options
#[derive(Debug, Clone, Default)]
pub struct MountOpts {
    pub flags: MountFlags,
    pub data: Option<String>,
}

bitflags::bitflags! {
    /// Mount flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MountFlags: u64 {
        const MS_RDONLY = 1 << 0;
        const MS_NOSUID = 1 << 1;
        const MS_NODEV = 1 << 2;
        const MS_NOEXEC = 1 << 3;
        const MS_SYNCHRONOUS = 1 << 4;
        const MS_REMOUNT = 1 << 5;
    }
}
