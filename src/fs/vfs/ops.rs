//! File-Handle and Namespace Operations
//!
//! The descriptor-based entry points (open, close, dup, read, write, lseek,
//! readdir, fstat) and the path-based ones (create, mkdir, rename, rmdir,
//! unlink, stat). Each resolves through the path walker, then dispatches to
//! the operation tables of the inodes involved. An absent table entry is
//! reported as an error here and never called through.

use alloc::string::String;
use alloc::sync::Arc;
use spin::Mutex;

use super::dentry::DentryId;
use super::file::{Fd, File, OpenFlags, Whence};
use super::inode::{DirEntry, FileMode, FsError, FsResult, Inode, Stat};
use super::path::{components, validate_filename};
use super::Vfs;

impl Vfs {
    /// Open a file or directory
    ///
    /// With `O_CREAT` a missing leaf is created as a regular file using the
    /// permission bits of `mode`.
    pub fn open(&mut self, path: &str, flags: OpenFlags, mode: FileMode) -> FsResult<Fd> {
        let dentry = if components(path).next().is_none() {
            self.resolve(path)?
        } else {
            let (parent, leaf) = self.resolve_parent(path)?;
            let result = self.open_child(parent, leaf, flags, mode);
            self.dcache.dput(parent);
            result?
        };
        self.open_dentry(dentry, flags, mode)
    }

    /// Close a file descriptor
    ///
    /// The backing store's release runs when the last alias of the open file
    /// is closed.
    pub fn close(&mut self, fd: Fd) -> FsResult<()> {
        let shared = self.files.remove(fd)?;
        let Ok(file) = Arc::try_unwrap(shared) else {
            return Ok(());
        };

        let mut file = file.into_inner();
        let inode = file.inode().clone();
        let result = match file.f_op.release {
            Some(release) => release(&inode, &mut file),
            None => Ok(()),
        };
        self.dcache.dput(file.dentry);
        result
    }

    /// Duplicate a descriptor; both share one cursor
    pub fn dup(&mut self, fd: Fd) -> FsResult<Fd> {
        self.files.dup(fd)
    }

    /// Read up to `count` bytes into `buf` at the file cursor
    ///
    /// # Returns
    /// Number of bytes read, 0 at end of file
    pub fn read(&mut self, fd: Fd, buf: &mut [u8], count: usize) -> FsResult<usize> {
        let shared = self.files.get(fd)?;
        if count > buf.len() {
            return Err(FsError::BadAddress);
        }

        let mut file = shared.lock();
        let read = file.f_op.read.ok_or(FsError::NotSupported)?;
        let mut pos = file.pos;
        let n = read(&file, &mut buf[..count], &mut pos)?;
        file.pos = pos;
        Ok(n)
    }

    /// Write `count` bytes from `buf` at the file cursor
    ///
    /// With `O_APPEND` the cursor moves to the end of the file first.
    pub fn write(&mut self, fd: Fd, buf: &[u8], count: usize) -> FsResult<usize> {
        let shared = self.files.get(fd)?;
        if count > buf.len() {
            return Err(FsError::BadAddress);
        }

        let mut file = shared.lock();
        let write = file.f_op.write.ok_or(FsError::NotSupported)?;
        let mut pos = if file.flags.contains(OpenFlags::O_APPEND) {
            file.inode().size()
        } else {
            file.pos
        };
        let n = write(&file, &buf[..count], &mut pos)?;
        file.pos = pos;
        Ok(n)
    }

    /// Reposition the file cursor
    pub fn lseek(&mut self, fd: Fd, offset: i64, whence: Whence) -> FsResult<u64> {
        let shared = self.files.get(fd)?;
        let mut file = shared.lock();

        if let Some(llseek) = file.f_op.llseek {
            let pos = llseek(&file, offset, whence)?;
            file.pos = pos;
            return Ok(pos);
        }

        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => file.pos,
            Whence::End => file.inode().size(),
        };
        let base = i64::try_from(base).map_err(|_| FsError::InvalidArgument)?;
        let pos = base.checked_add(offset).ok_or(FsError::InvalidArgument)?;
        if pos < 0 {
            return Err(FsError::InvalidArgument);
        }

        file.pos = pos as u64;
        Ok(file.pos)
    }

    /// Enumerate a directory, calling `emit` once per entry
    ///
    /// "." and ".." come first.
    pub fn readdir<F>(&mut self, fd: Fd, mut emit: F) -> FsResult<()>
    where
        F: FnMut(&DirEntry<'_>),
    {
        let shared = self.files.get(fd)?;
        let file = shared.lock();
        let readdir = file.f_op.readdir.ok_or(FsError::InvalidArgument)?;
        readdir(&file, &mut emit)
    }

    /// Metadata of the object behind a descriptor
    pub fn fstat(&mut self, fd: Fd) -> FsResult<Stat> {
        let shared = self.files.get(fd)?;
        let inode = shared.lock().inode().clone();
        Ok(self.stat_inode(&inode))
    }

    /// Absolute path an open descriptor was resolved through
    pub fn fd_path(&mut self, fd: Fd) -> FsResult<String> {
        let shared = self.files.get(fd)?;
        let dentry = shared.lock().dentry;
        Ok(self.dcache.path(dentry))
    }

    /// Create a regular file
    pub fn create(&mut self, path: &str, mode: FileMode) -> FsResult<()> {
        let (parent, leaf) = self.resolve_parent(path)?;
        let result = self.create_child(parent, leaf, mode);
        self.dcache.dput(parent);
        self.dcache.dput(result?);
        Ok(())
    }

    /// Create a directory
    pub fn mkdir(&mut self, path: &str, mode: FileMode) -> FsResult<()> {
        let (parent, leaf) = self.resolve_parent(path)?;
        let result = self.mkdir_child(parent, leaf, mode);
        self.dcache.dput(parent);
        self.dcache.dput(result?);
        Ok(())
    }

    /// Move `old` to `new`
    ///
    /// An existing `new` is never overwritten; the call fails AlreadyExists.
    pub fn rename(&mut self, old: &str, new: &str) -> FsResult<()> {
        let (old_parent, old_name) = self.resolve_parent(old)?;
        let (new_parent, new_name) = match self.resolve_parent(new) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.dcache.dput(old_parent);
                return Err(e);
            }
        };

        let result = self.rename_child(old_parent, old_name, new_parent, new_name);
        self.dcache.dput(new_parent);
        self.dcache.dput(old_parent);
        result
    }

    /// Remove an empty directory
    pub fn rmdir(&mut self, path: &str) -> FsResult<()> {
        self.remove_child(path, |dir| dir.inode_ops().rmdir)
    }

    /// Remove a file
    pub fn unlink(&mut self, path: &str) -> FsResult<()> {
        self.remove_child(path, |dir| dir.inode_ops().unlink)
    }

    /// Metadata of the object at `path`
    pub fn stat(&mut self, path: &str) -> FsResult<Stat> {
        let inode = self.lookup(path)?;
        Ok(self.stat_inode(&inode))
    }

    // Private helper methods

    fn open_child(
        &mut self,
        parent: DentryId,
        leaf: &str,
        flags: OpenFlags,
        mode: FileMode,
    ) -> FsResult<DentryId> {
        match self.lookup_child(parent, leaf) {
            Ok(dentry) => {
                if flags.contains(OpenFlags::O_CREAT | OpenFlags::O_EXCL) {
                    self.dcache.dput(dentry);
                    return Err(FsError::AlreadyExists);
                }
                Ok(dentry)
            }
            Err(FsError::NoSuchEntry) if flags.contains(OpenFlags::O_CREAT) => {
                self.create_child(parent, leaf, mode)
            }
            // A parent that cannot look anything up has no such leaf either
            Err(FsError::NotADirectory)
                if flags.contains(OpenFlags::O_CREAT) && !self.parent_can_lookup(parent) =>
            {
                self.create_child(parent, leaf, mode)
            }
            Err(e) => Err(e),
        }
    }

    fn open_dentry(&mut self, dentry: DentryId, flags: OpenFlags, mode: FileMode) -> FsResult<Fd> {
        let Some(inode) = self.dcache.inode(dentry) else {
            self.dcache.dput(dentry);
            return Err(FsError::NoSuchEntry);
        };
        if flags.contains(OpenFlags::O_DIRECTORY) && !inode.mode().is_directory() {
            self.dcache.dput(dentry);
            return Err(FsError::NotADirectory);
        }

        let mut file = File::new(dentry, inode.clone(), flags, mode);
        if let Some(open) = file.f_op.open {
            if let Err(e) = open(&inode, &mut file) {
                self.dcache.dput(dentry);
                return Err(e);
            }
        }

        let release = file.f_op.release;
        let shared = Arc::new(Mutex::new(file));
        match self.files.alloc(shared.clone()) {
            Ok(fd) => Ok(fd),
            Err(e) => {
                log_warn!("VFS", "open: open file table full");
                if let Some(release) = release {
                    let _ = release(&inode, &mut shared.lock());
                }
                self.dcache.dput(dentry);
                Err(e)
            }
        }
    }

    /// Inode behind `parent`
    ///
    /// What the parent supports is decided by its operation table alone.
    fn parent_dir(&self, parent: DentryId) -> FsResult<Arc<Inode>> {
        self.dcache.inode(parent).ok_or(FsError::NoSuchEntry)
    }

    fn parent_can_lookup(&self, parent: DentryId) -> bool {
        self.dcache
            .inode(parent)
            .is_some_and(|dir| dir.inode_ops().lookup.is_some())
    }

    fn create_child(&mut self, parent: DentryId, name: &str, mode: FileMode) -> FsResult<DentryId> {
        validate_filename(name)?;
        let dir = self.parent_dir(parent)?;
        let create = dir.inode_ops().create.ok_or(FsError::PermissionDenied)?;
        let inode = create(&dir, name, FileMode::regular(mode.permissions()))?;
        self.dcache.insert(parent, name, Arc::new(inode))
    }

    fn mkdir_child(&mut self, parent: DentryId, name: &str, mode: FileMode) -> FsResult<DentryId> {
        validate_filename(name)?;
        let dir = self.parent_dir(parent)?;
        let mkdir = dir.inode_ops().mkdir.ok_or(FsError::PermissionDenied)?;
        let inode = mkdir(&dir, name, FileMode::directory(mode.permissions()))?;
        self.dcache.insert(parent, name, Arc::new(inode))
    }

    fn rename_child(
        &mut self,
        old_parent: DentryId,
        old_name: &str,
        new_parent: DentryId,
        new_name: &str,
    ) -> FsResult<()> {
        validate_filename(old_name)?;
        validate_filename(new_name)?;

        let child = self.lookup_child(old_parent, old_name)?;
        let result = self.move_child(child, old_parent, old_name, new_parent, new_name);
        self.dcache.dput(child);
        result
    }

    fn move_child(
        &mut self,
        child: DentryId,
        old_parent: DentryId,
        old_name: &str,
        new_parent: DentryId,
        new_name: &str,
    ) -> FsResult<()> {
        let old_dir = self.parent_dir(old_parent)?;
        let new_dir = self.parent_dir(new_parent)?;
        if old_dir.sb_id() != new_dir.sb_id() {
            return Err(FsError::InvalidArgument);
        }

        let rename = old_dir.inode_ops().rename.ok_or(FsError::PermissionDenied)?;
        // The target must be able to take entries too
        if new_dir.inode_ops().rename.is_none() {
            return Err(FsError::PermissionDenied);
        }
        rename(&old_dir, old_name, &new_dir, new_name)?;
        self.dcache.d_move(child, new_parent, new_name)
    }

    fn remove_child(
        &mut self,
        path: &str,
        op: impl Fn(&Inode) -> Option<fn(&Inode, &str) -> FsResult<()>>,
    ) -> FsResult<()> {
        let (parent, leaf) = self.resolve_parent(path)?;
        let result = self.parent_dir(parent).and_then(|dir| {
            let remove = op(&dir).ok_or(FsError::NotSupported)?;
            remove(&dir, leaf)
        });
        if result.is_ok() {
            self.dcache.d_drop(parent, leaf);
        }
        self.dcache.dput(parent);
        result
    }

    fn stat_inode(&self, inode: &Inode) -> Stat {
        let blksize = self
            .mounts
            .superblock(inode.sb_id())
            .map(|sb| sb.block_size())
            .unwrap_or(0);
        inode.stat(blksize)
    }
}
