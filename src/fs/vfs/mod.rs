//! Virtual File System (VFS) Layer
//!
//! This module provides a unified interface for all filesystem operations in VibOS.
//! Filesystem types register a factory, mounted instances expose their objects
//! through inodes carrying operation tables, and callers reach everything
//! through path-based and descriptor-based methods on a [`Vfs`].

pub mod dentry;
pub mod file;
pub mod inode;
pub mod mount;
pub mod ops;
pub mod path;
pub mod registry;
pub mod superblock;

use alloc::sync::Arc;

use self::dentry::DentryCache;
use self::file::FileTable;
use self::mount::MountTable;
use self::registry::FsRegistry;

// Re-export commonly used items
pub use dentry::{DentryCacheStats, DentryId};
pub use file::{Fd, File, OpenFlags, Whence};
pub use inode::{
    DirEntry, DirEntryType, FileMode, FileOperations, FsError, FsResult, Inode, InodeOperations,
    Stat,
};
pub use mount::VfsMount;
pub use superblock::{FsType, MountFlags, MountOpts, SuperBlock};

/// One independent filesystem namespace
///
/// Owns the filesystem-type registry, the mount table, the dentry cache and
/// the open-file table. Callers are expected to serialize access, for
/// example by keeping the instance behind a `spin::Mutex`.
pub struct Vfs {
    pub(crate) registry: FsRegistry,
    pub(crate) mounts: MountTable,
    pub(crate) dcache: DentryCache,
    pub(crate) files: FileTable,
    pub(crate) next_sb_id: u64,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    /// Create an empty VFS with nothing registered or mounted
    pub fn new() -> Self {
        Self {
            registry: FsRegistry::new(),
            mounts: MountTable::new(),
            dcache: DentryCache::new(),
            files: FileTable::new(),
            next_sb_id: 1,
        }
    }

    /// Register a filesystem type
    pub fn register_filesystem(&mut self, fs_type: Arc<dyn FsType>) -> FsResult<()> {
        self.registry.register(fs_type)
    }

    /// Lookup a filesystem type by name
    pub fn lookup_filesystem(&self, name: &str) -> Option<Arc<dyn FsType>> {
        self.registry.find(name)
    }

    /// Registered filesystem type names, newest first
    pub fn filesystems(&self) -> alloc::vec::Vec<&'static str> {
        self.registry.names()
    }

    pub fn dcache_stats(&self) -> DentryCacheStats {
        self.dcache.stats()
    }

    /// Number of open file descriptors
    pub fn open_files(&self) -> usize {
        self.files.count()
    }
}
