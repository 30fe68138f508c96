//! Mount Table
//!
//! This module implements the fixed-capacity mount table and the
//! mount/unmount operations. The mount whose target is exactly "/" becomes
//! the resolution root; mounts elsewhere are recorded but not grafted into
//! the namespace.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use super::dentry::DentryId;
use super::inode::{FsError, FsResult};
use super::superblock::{MountFlags, MountOpts, SuperBlock};
use super::Vfs;
use crate::config::{DEVNAME_MAX, MAX_MOUNTS};

/// Mount point entry
#[derive(Clone)]
pub struct VfsMount {
    /// Mount ID (slot index)
    pub mount_id: usize,
    /// Root dentry of the mounted filesystem
    pub root: DentryId,
    pub sb: Arc<SuperBlock>,
    /// Device name, truncated to `DEVNAME_MAX` bytes
    pub devname: String,
    /// Mount path (e.g., "/", "/mnt/disk")
    pub target: String,
    /// Root mount at the time this one was made
    pub parent: Option<usize>,
    pub flags: MountFlags,
}

/// Mount table
pub struct MountTable {
    mounts: [Option<VfsMount>; MAX_MOUNTS],
    count: usize,
    root: Option<usize>,
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MountTable {
    /// Create a new mount table
    pub fn new() -> Self {
        Self {
            mounts: [const { None }; MAX_MOUNTS],
            count: 0,
            root: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.count >= MAX_MOUNTS
    }

    /// Store a mount in the next slot, returning its id
    fn insert(&mut self, mut mount: VfsMount) -> FsResult<usize> {
        if self.is_full() {
            return Err(FsError::OutOfMemory);
        }
        let id = self.count;
        mount.mount_id = id;
        self.mounts[id] = Some(mount);
        self.count += 1;
        Ok(id)
    }

    /// Get the root mount point
    pub fn root_mount(&self) -> Option<&VfsMount> {
        self.mounts.get(self.root?)?.as_ref()
    }

    /// Superblock with the given id
    pub fn superblock(&self, sb_id: u64) -> Option<&Arc<SuperBlock>> {
        self.iter()
            .find(|mount| mount.sb.id() == sb_id)
            .map(|mount| &mount.sb)
    }

    /// Iterate over active mounts in mount order
    pub fn iter(&self) -> impl Iterator<Item = &VfsMount> {
        self.mounts[..self.count].iter().flatten()
    }
}

/// Copy a device name, cutting it at `DEVNAME_MAX` bytes on a char boundary
fn truncate_devname(source: &str) -> String {
    let mut end = source.len().min(DEVNAME_MAX);
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    String::from(&source[..end])
}

impl Vfs {
    /// Mount a filesystem
    ///
    /// # Arguments
    /// * `source` - Device or source name
    /// * `target` - Mount point path; "/" makes this the resolution root
    /// * `fs_type` - Registered filesystem type name (e.g., "ramfs")
    /// * `opts` - Mount options
    ///
    /// # Returns
    /// The new mount id
    pub fn mount(
        &mut self,
        source: &str,
        target: &str,
        fs_type: &str,
        opts: MountOpts,
    ) -> FsResult<usize> {
        log_info!("VFS", "mount: {} on {} type {}", source, target, fs_type);

        let Some(fs) = self.registry.find(fs_type) else {
            log_error!("VFS", "mount: unknown filesystem type '{}'", fs_type);
            return Err(FsError::NoSuchDevice);
        };

        if self.mounts.is_full() {
            log_error!("VFS", "mount: mount table full");
            return Err(FsError::OutOfMemory);
        }

        let sb_id = self.next_sb_id;
        let sb = match fs.mount(sb_id, source, &opts) {
            Ok(sb) => Arc::new(sb),
            Err(e) => {
                log_error!("VFS", "mount: {} failed to mount {}: {}", fs_type, source, e);
                return Err(FsError::IoError);
            }
        };
        self.next_sb_id += 1;

        let root = self.dcache.alloc_root(sb.root().clone())?;
        let mount = VfsMount {
            mount_id: 0,
            root,
            sb,
            devname: truncate_devname(source),
            target: String::from(target),
            parent: self.mounts.root,
            flags: opts.flags,
        };
        let id = match self.mounts.insert(mount) {
            Ok(id) => id,
            Err(e) => {
                self.dcache.dput(root);
                return Err(e);
            }
        };

        if target == "/" {
            self.mounts.root = Some(id);
            log_info!("VFS", "mount: {} is now the root filesystem", fs_type);
        } else {
            log_debug!("VFS", "mount: {} recorded but not attached to the namespace", target);
        }
        Ok(id)
    }

    /// Unmount a filesystem
    ///
    /// Not implemented; mounts live for the lifetime of the VFS.
    pub fn unmount(&mut self, target: &str) -> FsResult<()> {
        log_warn!("VFS", "umount: {}: not implemented", target);
        Err(FsError::NotImplemented)
    }

    /// List all mount points
    pub fn mounts(&self) -> Vec<VfsMount> {
        self.mounts.iter().cloned().collect()
    }

    /// Superblock of the root filesystem
    pub fn root_superblock(&self) -> Option<Arc<SuperBlock>> {
        self.mounts.root_mount().map(|mount| mount.sb.clone())
    }
}
