//! Ramfs Superblock Implementation

use alloc::sync::Arc;
use spin::Mutex;

use super::dir::node_inode;
use super::node::{NodeId, RamTree, SharedTree};
use crate::config::RAMFS_BLOCK_SIZE;
use crate::fs::vfs::path::{split_path, validate_filename};
use crate::fs::vfs::{FileMode, FsError, FsResult, FsType, MountOpts, SuperBlock};

/// Ramfs filesystem type
pub struct RamfsType;

impl FsType for RamfsType {
    fn name(&self) -> &'static str {
        "ramfs"
    }

    fn mount(&self, sb_id: u64, source: &str, opts: &MountOpts) -> FsResult<SuperBlock> {
        let info = RamfsInfo::new();
        let root = {
            let tree = info.tree.lock();
            node_inode(&info.tree, NodeId::ROOT, tree.node(NodeId::ROOT)?, sb_id)
        };

        log_info!("RAMFS", "Mounted ramfs '{}' (sb {})", source, sb_id);
        Ok(SuperBlock::new(
            sb_id,
            RAMFS_BLOCK_SIZE as u32,
            self.name(),
            opts.flags,
            root,
            Arc::new(info),
        ))
    }
}

/// Per-mount ramfs state kept as superblock private data
pub struct RamfsInfo {
    tree: SharedTree,
}

impl RamfsInfo {
    fn new() -> Self {
        let root_mode = FileMode::new(
            FileMode::S_IFDIR
                | FileMode::S_IRUSR
                | FileMode::S_IWUSR
                | FileMode::S_IXUSR
                | FileMode::S_IRGRP
                | FileMode::S_IXGRP
                | FileMode::S_IROTH
                | FileMode::S_IXOTH,
        );
        Self {
            tree: Arc::new(Mutex::new(RamTree::new(root_mode))),
        }
    }

    /// Number of nodes, root included
    pub fn node_count(&self) -> usize {
        self.tree.lock().node_count()
    }

    /// Bytes allocated for file data
    pub fn bytes_allocated(&self) -> usize {
        self.tree.lock().bytes_allocated()
    }
}

fn ramfs_info(sb: &SuperBlock) -> FsResult<&RamfsInfo> {
    sb.private_as::<RamfsInfo>().ok_or(FsError::InvalidArgument)
}

/// Create a directory directly in a mounted ramfs
///
/// Used to populate the root filesystem at boot without going through the
/// VFS. The parent directory must already exist.
///
/// # Returns
/// The new directory's inode number
pub fn create_dir(sb: &SuperBlock, path: &str, mode: FileMode) -> FsResult<u64> {
    let info = ramfs_info(sb)?;
    let (parent, name) = split_path(path);
    validate_filename(name)?;

    let mut tree = info.tree.lock();
    let dir = tree.walk(parent)?;
    let id = tree.add_child(dir, name, FileMode::directory(mode.permissions()))?;
    let ino = tree.node(id)?.ino;
    log_info!("RAMFS", "Created directory '{}'", path);
    Ok(ino)
}

/// Create a regular file with initial contents directly in a mounted ramfs
///
/// # Returns
/// The new file's inode number
pub fn create_file(sb: &SuperBlock, path: &str, mode: FileMode, data: &[u8]) -> FsResult<u64> {
    let info = ramfs_info(sb)?;
    let (parent, name) = split_path(path);
    validate_filename(name)?;

    let mut tree = info.tree.lock();
    let dir = tree.walk(parent)?;
    let id = tree.add_child(dir, name, FileMode::regular(mode.permissions()))?;
    if !data.is_empty() {
        tree.write_at(id, 0, data)?;
    }
    let ino = tree.node(id)?.ino;
    log_info!("RAMFS", "Created file '{}' ({} bytes)", path, data.len());
    Ok(ino)
}
