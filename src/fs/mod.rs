//! Filesystem Subsystem
//!
//! The VFS layer and the ramfs backing store, plus the boot sequence that
//! brings up the root filesystem.

pub mod ramfs;
pub mod vfs;

use alloc::sync::Arc;

use crate::config::BOOT_DIRECTORIES;
use self::ramfs::RamfsType;
use self::vfs::{FileMode, FsError, FsResult, MountOpts, Vfs};

/// Bring up the filesystem layer
///
/// Registers ramfs, mounts it at "/" and creates the standard top-level
/// directories directly in the ramfs tree.
pub fn boot() -> FsResult<Vfs> {
    log_info!("VFS", "Initializing virtual filesystem");
    let mut vfs = Vfs::new();

    vfs.register_filesystem(Arc::new(RamfsType))?;
    vfs.mount("ramfs", "/", "ramfs", MountOpts::default())?;

    let root = vfs.root_superblock().ok_or(FsError::NoSuchEntry)?;
    for (name, perm) in BOOT_DIRECTORIES {
        ramfs::create_dir(&root, name, FileMode::new(*perm))?;
    }

    log_info!("VFS", "Initialized");
    Ok(vfs)
}
