//! Open Files and the Open-File Table
//!
//! This module implements the open file handle, its open flags and the
//! per-VFS table of open files addressed by [`Fd`]. Duplicated descriptors
//! share one handle, and with it one cursor.

use alloc::sync::Arc;
use core::any::Any;
use core::fmt;
use spin::Mutex;

use super::dentry::DentryId;
use super::inode::{FileMode, FileOperations, FsError, FsResult, Inode, Private};
use crate::config::MAX_OPEN_FILES;

bitflags::bitflags! {
    /// Open flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OpenFlags: u32 {
        const O_RDONLY = 0x0000;
        const O_WRONLY = 0x0001;
        const O_RDWR = 0x0002;
        const O_CREAT = 0x0040;
        const O_EXCL = 0x0080;
        const O_TRUNC = 0x0200;
        const O_APPEND = 0x0400;
        const O_DIRECTORY = 0x10000;
    }
}

/// Seek origin for lseek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl Whence {
    /// Convert a raw SEEK_* value from the syscall boundary
    pub fn from_raw(whence: i32) -> FsResult<Self> {
        match whence {
            0 => Ok(Self::Set),
            1 => Ok(Self::Cur),
            2 => Ok(Self::End),
            _ => Err(FsError::InvalidArgument),
        }
    }
}

/// Open file descriptor number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fd(usize);

impl Fd {
    pub const fn from_raw(fd: usize) -> Self {
        Self(fd)
    }

    pub const fn as_raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open file handle
pub struct File {
    /// Current cursor offset
    pub pos: u64,
    pub flags: OpenFlags,
    /// Mode passed to open
    pub mode: FileMode,
    pub(crate) dentry: DentryId,
    inode: Arc<Inode>,
    pub(crate) f_op: &'static FileOperations,
    /// Per-open slot, filled in by the backing store's open callback
    pub private: Option<Private>,
}

impl File {
    pub fn new(dentry: DentryId, inode: Arc<Inode>, flags: OpenFlags, mode: FileMode) -> Self {
        let f_op = inode.file_ops();
        Self {
            pos: 0,
            flags,
            mode,
            dentry,
            inode,
            f_op,
            private: None,
        }
    }

    pub fn inode(&self) -> &Arc<Inode> {
        &self.inode
    }

    pub fn file_ops(&self) -> &'static FileOperations {
        self.f_op
    }

    /// Downcast the per-open private data to the backing store's type
    pub fn private_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.private.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("ino", &self.inode.ino())
            .field("pos", &self.pos)
            .field("flags", &self.flags)
            .finish()
    }
}

pub type SharedFile = Arc<Mutex<File>>;

/// Table of open files (lowest free slot first)
pub struct FileTable {
    files: [Option<SharedFile>; MAX_OPEN_FILES],
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable {
    /// Create a new empty file table
    pub fn new() -> Self {
        Self {
            files: [const { None }; MAX_OPEN_FILES],
        }
    }

    /// Install an open file in the lowest free slot
    pub fn alloc(&mut self, file: SharedFile) -> FsResult<Fd> {
        for (i, slot) in self.files.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(file);
                return Ok(Fd(i));
            }
        }
        Err(FsError::TooManyOpenFiles)
    }

    pub fn get(&self, fd: Fd) -> FsResult<SharedFile> {
        self.files
            .get(fd.0)
            .and_then(|slot| slot.clone())
            .ok_or(FsError::BadFileHandle)
    }

    /// Alias an open file under a new descriptor
    pub fn dup(&mut self, fd: Fd) -> FsResult<Fd> {
        let file = self.get(fd)?;
        self.alloc(file)
    }

    /// Remove a descriptor, returning the handle it referred to
    pub fn remove(&mut self, fd: Fd) -> FsResult<SharedFile> {
        self.files
            .get_mut(fd.0)
            .and_then(|slot| slot.take())
            .ok_or(FsError::BadFileHandle)
    }

    /// Get count of open descriptors
    pub fn count(&self) -> usize {
        self.files.iter().filter(|slot| slot.is_some()).count()
    }
}
