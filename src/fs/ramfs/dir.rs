//! Ramfs Directory Operations

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use super::file::{ramfs_open, ramfs_release, FILE_INODE_OPS, FILE_OPS};
use super::node::{NodeId, RamNode, RamRef, RamTree, SharedTree};
use crate::fs::vfs::{
    DirEntry, DirEntryType, File, FileMode, FileOperations, FsError, FsResult, Inode,
    InodeOperations,
};

/// Namespace operations for ramfs directories
pub static DIR_INODE_OPS: InodeOperations = InodeOperations {
    lookup: Some(ramfs_lookup),
    create: Some(ramfs_create),
    mkdir: Some(ramfs_mkdir),
    rmdir: None,
    unlink: None,
    rename: Some(ramfs_rename),
};

/// File operations for open ramfs directories
pub static DIR_FILE_OPS: FileOperations = FileOperations {
    read: None,
    write: None,
    llseek: None,
    open: Some(ramfs_open),
    release: Some(ramfs_release),
    readdir: Some(ramfs_readdir),
};

/// Build the VFS inode for a node; its type picks the operation tables
pub(super) fn node_inode(tree: &SharedTree, id: NodeId, node: &RamNode, sb_id: u64) -> Inode {
    let (i_op, i_fop) = if node.mode.is_directory() {
        (&DIR_INODE_OPS, &DIR_FILE_OPS)
    } else {
        (&FILE_INODE_OPS, &FILE_OPS)
    };
    Inode::new(node.ino, node.mode, sb_id, i_op, i_fop)
        .with_size(node.size as u64)
        .with_private(Arc::new(RamRef {
            tree: tree.clone(),
            node: id,
        }))
}

fn dir_ref(dir: &Inode) -> FsResult<&RamRef> {
    dir.private_as::<RamRef>().ok_or(FsError::InvalidArgument)
}

fn ramfs_lookup(dir: &Inode, name: &str) -> FsResult<Option<Inode>> {
    let dref = dir_ref(dir)?;
    let tree = dref.tree.lock();
    let Some(id) = tree.find_child(dref.node, name) else {
        return Ok(None);
    };
    let node = tree.node(id)?;
    Ok(Some(node_inode(&dref.tree, id, node, dir.sb_id())))
}

fn add_node(dir: &Inode, name: &str, mode: FileMode) -> FsResult<Inode> {
    let dref = dir_ref(dir)?;
    let mut tree = dref.tree.lock();
    let id = tree.add_child(dref.node, name, mode)?;
    let node = tree.node(id)?;
    log_trace!("RAMFS", "created '{}' (ino {}) in ino {}", name, node.ino, dir.ino());
    Ok(node_inode(&dref.tree, id, node, dir.sb_id()))
}

fn ramfs_create(dir: &Inode, name: &str, mode: FileMode) -> FsResult<Inode> {
    add_node(dir, name, FileMode::regular(mode.permissions()))
}

fn ramfs_mkdir(dir: &Inode, name: &str, mode: FileMode) -> FsResult<Inode> {
    add_node(dir, name, FileMode::directory(mode.permissions()))
}

fn ramfs_rename(old_dir: &Inode, old_name: &str, new_dir: &Inode, new_name: &str) -> FsResult<()> {
    let old_ref = dir_ref(old_dir)?;
    let new_ref = dir_ref(new_dir)?;
    if !Arc::ptr_eq(&old_ref.tree, &new_ref.tree) {
        return Err(FsError::InvalidArgument);
    }
    let mut tree = old_ref.tree.lock();
    tree.rename(old_ref.node, old_name, new_ref.node, new_name)
}

/// Emit ".", ".." and then every child
///
/// The listing is taken under the tree lock and emitted after it is
/// released, so `emit` may call back into the same ramfs.
fn ramfs_readdir(file: &File, emit: &mut dyn FnMut(&DirEntry<'_>)) -> FsResult<()> {
    let dref = file.private_as::<RamRef>().ok_or(FsError::BadFileHandle)?;
    let entries = snapshot(&dref.tree.lock(), dref.node)?;

    for (pos, (name, ino, kind)) in (0u64..).zip(entries.iter()) {
        emit(&DirEntry {
            name,
            pos,
            ino: *ino,
            kind: *kind,
        });
    }
    Ok(())
}

/// Directory listing as (name, ino, kind), "." and ".." first
fn snapshot(tree: &RamTree, id: NodeId) -> FsResult<Vec<(String, u64, DirEntryType)>> {
    let dir = tree.node(id)?;
    if !dir.mode.is_directory() {
        return Err(FsError::NotADirectory);
    }
    let parent_ino = match dir.parent {
        Some(parent) => tree.node(parent)?.ino,
        None => dir.ino,
    };

    let mut entries = Vec::new();
    entries
        .try_reserve(tree.children(id).count() + 2)
        .map_err(|_| FsError::OutOfMemory)?;
    entries.push((String::from("."), dir.ino, DirEntryType::Directory));
    entries.push((String::from(".."), parent_ino, DirEntryType::Directory));
    for (_, child) in tree.children(id) {
        entries.push((child.name.clone(), child.ino, DirEntryType::from_mode(child.mode)));
    }
    Ok(entries)
}
