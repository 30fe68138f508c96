//! Inode, Operation Tables and Error Types
//!
//! This module defines the inode record every filesystem populates, the two
//! operation tables through which the VFS dispatches to a backing store, and
//! the error type shared by the whole layer.
//!
//! A backing store declares what it supports by filling in table entries.
//! An entry left as `None` means the operation does not exist for that inode;
//! the VFS reports that as an error at the call site and never calls through.

use alloc::sync::Arc;
use core::any::Any;
use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::file::File;

/// File mode bits in the POSIX layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct FileMode(pub u16);

impl FileMode {
    // File types
    pub const S_IFMT: u16 = 0o170000;   // File type mask
    pub const S_IFREG: u16 = 0o100000;  // Regular file
    pub const S_IFDIR: u16 = 0o040000;  // Directory

    // Permissions
    pub const S_IRUSR: u16 = 0o0400;    // User read
    pub const S_IWUSR: u16 = 0o0200;    // User write
    pub const S_IXUSR: u16 = 0o0100;    // User execute
    pub const S_IRGRP: u16 = 0o0040;    // Group read
    pub const S_IWGRP: u16 = 0o0020;    // Group write
    pub const S_IXGRP: u16 = 0o0010;    // Group execute
    pub const S_IROTH: u16 = 0o0004;    // Other read
    pub const S_IWOTH: u16 = 0o0002;    // Other write
    pub const S_IXOTH: u16 = 0o0001;    // Other execute

    /// Create a new FileMode
    pub const fn new(mode: u16) -> Self {
        Self(mode)
    }

    /// A regular file with the given permission bits
    pub const fn regular(perm: u16) -> Self {
        Self(Self::S_IFREG | (perm & 0o7777))
    }

    /// A directory with the given permission bits
    pub const fn directory(perm: u16) -> Self {
        Self(Self::S_IFDIR | (perm & 0o7777))
    }

    /// Get the file type
    pub const fn file_type(&self) -> u16 {
        self.0 & Self::S_IFMT
    }

    /// Get the permission bits
    pub const fn permissions(&self) -> u16 {
        self.0 & 0o7777
    }

    /// Check if this is a regular file
    pub const fn is_regular(&self) -> bool {
        self.file_type() == Self::S_IFREG
    }

    /// Check if this is a directory
    pub const fn is_directory(&self) -> bool {
        self.file_type() == Self::S_IFDIR
    }
}

/// Entry type reported through readdir
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DirEntryType {
    Unknown = 0,
    Directory = 4,
    Regular = 8,
}

impl DirEntryType {
    /// Convert FileMode to d_type
    pub fn from_mode(mode: FileMode) -> Self {
        match mode.file_type() {
            FileMode::S_IFREG => Self::Regular,
            FileMode::S_IFDIR => Self::Directory,
            _ => Self::Unknown,
        }
    }
}

/// One entry pushed to a readdir callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry<'a> {
    pub name: &'a str,
    /// Position of this entry in the enumeration, starting at 0
    pub pos: u64,
    pub ino: u64,
    pub kind: DirEntryType,
}

impl DirEntry<'_> {
    pub fn name_len(&self) -> usize {
        self.name.len()
    }
}

/// Inode metadata as reported by stat/fstat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Superblock the inode belongs to
    pub dev: u64,
    pub ino: u64,
    pub mode: FileMode,
    pub nlink: u32,
    pub size: u64,
    pub blksize: u32,
}

/// Result type for filesystem operations
pub type FsResult<T> = Result<T, FsError>;

/// Filesystem error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// No such file or directory
    NoSuchEntry,
    /// Not a directory
    NotADirectory,
    /// File exists
    AlreadyExists,
    /// Filesystem type already registered
    AlreadyRegistered,
    /// Operation not provided by this filesystem
    NotSupported,
    /// Operation not permitted
    PermissionDenied,
    /// Bad file handle
    BadFileHandle,
    /// Buffer does not cover the requested range
    BadAddress,
    /// Invalid argument
    InvalidArgument,
    /// Out of memory
    OutOfMemory,
    /// Unknown filesystem type
    NoSuchDevice,
    /// I/O error
    IoError,
    /// Declared but not implemented
    NotImplemented,
    /// Name too long
    NameTooLong,
    /// Open file table is full
    TooManyOpenFiles,
}

impl FsError {
    /// Negative errno value for the syscall boundary
    pub const fn errno(&self) -> isize {
        match self {
            Self::NoSuchEntry => -2,        // ENOENT
            Self::NotADirectory => -20,     // ENOTDIR
            Self::AlreadyExists => -17,     // EEXIST
            Self::AlreadyRegistered => -16, // EBUSY
            Self::NotSupported => -38,      // ENOSYS
            Self::PermissionDenied => -1,   // EPERM
            Self::BadFileHandle => -9,      // EBADF
            Self::BadAddress => -14,        // EFAULT
            Self::InvalidArgument => -22,   // EINVAL
            Self::OutOfMemory => -12,       // ENOMEM
            Self::NoSuchDevice => -19,      // ENODEV
            Self::IoError => -5,            // EIO
            Self::NotImplemented => -38,    // ENOSYS
            Self::NameTooLong => -36,       // ENAMETOOLONG
            Self::TooManyOpenFiles => -24,  // EMFILE
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchEntry => write!(f, "No such file or directory"),
            Self::NotADirectory => write!(f, "Not a directory"),
            Self::AlreadyExists => write!(f, "File exists"),
            Self::AlreadyRegistered => write!(f, "Filesystem already registered"),
            Self::NotSupported => write!(f, "Operation not supported"),
            Self::PermissionDenied => write!(f, "Operation not permitted"),
            Self::BadFileHandle => write!(f, "Bad file descriptor"),
            Self::BadAddress => write!(f, "Bad address"),
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::OutOfMemory => write!(f, "Out of memory"),
            Self::NoSuchDevice => write!(f, "No such device"),
            Self::IoError => write!(f, "I/O error"),
            Self::NotImplemented => write!(f, "Function not implemented"),
            Self::NameTooLong => write!(f, "File name too long"),
            Self::TooManyOpenFiles => write!(f, "Too many open files"),
        }
    }
}

/// Opaque per-inode / per-file data owned by the backing store
pub type Private = Arc<dyn Any + Send + Sync>;

pub type LookupFn = fn(dir: &Inode, name: &str) -> FsResult<Option<Inode>>;
pub type CreateFn = fn(dir: &Inode, name: &str, mode: FileMode) -> FsResult<Inode>;
pub type MkdirFn = fn(dir: &Inode, name: &str, mode: FileMode) -> FsResult<Inode>;
pub type RmdirFn = fn(dir: &Inode, name: &str) -> FsResult<()>;
pub type UnlinkFn = fn(dir: &Inode, name: &str) -> FsResult<()>;
pub type RenameFn =
    fn(old_dir: &Inode, old_name: &str, new_dir: &Inode, new_name: &str) -> FsResult<()>;

pub type ReadFn = fn(file: &File, buf: &mut [u8], pos: &mut u64) -> FsResult<usize>;
pub type WriteFn = fn(file: &File, buf: &[u8], pos: &mut u64) -> FsResult<usize>;
pub type LlseekFn = fn(file: &File, offset: i64, whence: super::file::Whence) -> FsResult<u64>;
pub type OpenFn = fn(inode: &Inode, file: &mut File) -> FsResult<()>;
pub type ReleaseFn = fn(inode: &Inode, file: &mut File) -> FsResult<()>;
pub type ReaddirFn = fn(file: &File, emit: &mut dyn FnMut(&DirEntry<'_>)) -> FsResult<()>;

/// Namespace operations, invoked on a directory inode
#[derive(Clone, Copy)]
pub struct InodeOperations {
    pub lookup: Option<LookupFn>,
    pub create: Option<CreateFn>,
    pub mkdir: Option<MkdirFn>,
    pub rmdir: Option<RmdirFn>,
    pub unlink: Option<UnlinkFn>,
    pub rename: Option<RenameFn>,
}

impl InodeOperations {
    /// A table with no operations at all
    pub const EMPTY: Self = Self {
        lookup: None,
        create: None,
        mkdir: None,
        rmdir: None,
        unlink: None,
        rename: None,
    };
}

/// Data operations, invoked on an open file
#[derive(Clone, Copy)]
pub struct FileOperations {
    pub read: Option<ReadFn>,
    pub write: Option<WriteFn>,
    pub llseek: Option<LlseekFn>,
    pub open: Option<OpenFn>,
    pub release: Option<ReleaseFn>,
    pub readdir: Option<ReaddirFn>,
}

impl FileOperations {
    /// A table with no operations at all
    pub const EMPTY: Self = Self {
        read: None,
        write: None,
        llseek: None,
        open: None,
        release: None,
        readdir: None,
    };
}

/// Identity and capability record for a filesystem object
///
/// An inode carries no name. The backing store fills in its metadata and the
/// operation tables matching the object's type; `private` points back at the
/// store's own representation.
pub struct Inode {
    ino: u64,
    mode: FileMode,
    size: AtomicU64,
    nlink: AtomicU32,
    sb_id: u64,
    pub(crate) i_op: &'static InodeOperations,
    pub(crate) i_fop: &'static FileOperations,
    private: Option<Private>,
}

impl Inode {
    pub fn new(
        ino: u64,
        mode: FileMode,
        sb_id: u64,
        i_op: &'static InodeOperations,
        i_fop: &'static FileOperations,
    ) -> Self {
        let nlink = if mode.is_directory() { 2 } else { 1 };
        Self {
            ino,
            mode,
            size: AtomicU64::new(0),
            nlink: AtomicU32::new(nlink),
            sb_id,
            i_op,
            i_fop,
            private: None,
        }
    }

    /// Set the initial size
    pub fn with_size(self, size: u64) -> Self {
        self.size.store(size, Ordering::Relaxed);
        self
    }

    /// Attach the backing store's private data
    pub fn with_private(mut self, private: Private) -> Self {
        self.private = Some(private);
        self
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    /// Record a new size after a write extended the object
    pub fn set_size(&self, size: u64) {
        self.size.store(size, Ordering::Relaxed);
    }

    pub fn nlink(&self) -> u32 {
        self.nlink.load(Ordering::Relaxed)
    }

    /// Id of the superblock this inode belongs to
    pub fn sb_id(&self) -> u64 {
        self.sb_id
    }

    pub fn inode_ops(&self) -> &'static InodeOperations {
        self.i_op
    }

    pub fn file_ops(&self) -> &'static FileOperations {
        self.i_fop
    }

    pub fn private(&self) -> Option<&Private> {
        self.private.as_ref()
    }

    /// Downcast the private data to the backing store's type
    pub fn private_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.private.as_ref()?.downcast_ref::<T>()
    }

    pub fn stat(&self, blksize: u32) -> Stat {
        Stat {
            dev: self.sb_id,
            ino: self.ino,
            mode: self.mode,
            nlink: self.nlink(),
            size: self.size(),
            blksize,
        }
    }
}

impl fmt::Debug for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inode")
            .field("ino", &self.ino)
            .field("mode", &format_args!("{:o}", self.mode.0))
            .field("size", &self.size())
            .field("sb_id", &self.sb_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mode_types() {
        let dir = FileMode::directory(0o755);
        assert!(dir.is_directory());
        assert!(!dir.is_regular());
        assert_eq!(dir.permissions(), 0o755);

        let reg = FileMode::regular(0o644);
        assert!(reg.is_regular());
        assert_eq!(DirEntryType::from_mode(reg), DirEntryType::Regular);
        assert_eq!(DirEntryType::from_mode(FileMode::new(0)), DirEntryType::Unknown);
    }

    #[test]
    fn test_errno_mapping() {
        assert_eq!(FsError::NoSuchEntry.errno(), -2);
        assert_eq!(FsError::NoSuchDevice.errno(), -19);
        assert_eq!(FsError::PermissionDenied.errno(), -1);
    }

    #[test]
    fn test_inode_nlink_by_type() {
        static OPS: InodeOperations = InodeOperations::EMPTY;
        static FOPS: FileOperations = FileOperations::EMPTY;
        let d = Inode::new(1, FileMode::directory(0o755), 7, &OPS, &FOPS);
        let f = Inode::new(2, FileMode::regular(0o644), 7, &OPS, &FOPS).with_size(12);
        assert_eq!(d.nlink(), 2);
        assert_eq!(f.nlink(), 1);
        assert_eq!(f.stat(4096).size, 12);
        assert!(f.private_as::<u32>().is_none());
    }
}
