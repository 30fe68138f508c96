//! Ramfs File Operations

use super::node::RamRef;
use crate::fs::vfs::{File, FileOperations, FsError, FsResult, Inode, InodeOperations};

/// Regular files have no namespace operations
pub static FILE_INODE_OPS: InodeOperations = InodeOperations::EMPTY;

/// File operations for open ramfs regular files
pub static FILE_OPS: FileOperations = FileOperations {
    read: Some(ramfs_read),
    write: Some(ramfs_write),
    llseek: None,
    open: Some(ramfs_open),
    release: Some(ramfs_release),
    readdir: None,
};

/// Point the open file at the node behind the inode
pub(super) fn ramfs_open(inode: &Inode, file: &mut File) -> FsResult<()> {
    let private = inode.private().ok_or(FsError::InvalidArgument)?;
    if !private.is::<RamRef>() {
        return Err(FsError::InvalidArgument);
    }
    file.private = Some(private.clone());
    Ok(())
}

pub(super) fn ramfs_release(_inode: &Inode, file: &mut File) -> FsResult<()> {
    file.private = None;
    Ok(())
}

fn file_ref(file: &File) -> FsResult<&RamRef> {
    file.private_as::<RamRef>().ok_or(FsError::BadFileHandle)
}

fn ramfs_read(file: &File, buf: &mut [u8], pos: &mut u64) -> FsResult<usize> {
    let fref = file_ref(file)?;
    let n = fref.tree.lock().read_at(fref.node, *pos, buf)?;
    *pos += n as u64;
    Ok(n)
}

fn ramfs_write(file: &File, buf: &[u8], pos: &mut u64) -> FsResult<usize> {
    let fref = file_ref(file)?;
    let size = fref.tree.lock().write_at(fref.node, *pos, buf)?;
    *pos += buf.len() as u64;
    file.inode().set_size(size as u64);
    Ok(buf.len())
}
