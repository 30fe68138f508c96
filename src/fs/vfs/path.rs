//! Path Resolution
//!
//! This module walks absolute, '/'-separated paths from the root mount one
//! component at a time, consulting the dentry cache before asking the
//! directory's `lookup` operation. Empty components are skipped; "." and
//! ".." have no special meaning here.
//!
//! Every dentry returned by the resolver carries one reference the caller
//! must hand back with `dput`.

use alloc::sync::Arc;

use super::dentry::DentryId;
use super::inode::{FsError, FsResult, Inode};
use super::Vfs;
use crate::config::{NAME_MAX, PATH_MAX};

/// Iterate over the non-empty components of a path
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

/// Split a path into parent directory and filename
///
/// # Returns
/// (parent_path, filename)
pub fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    if let Some(pos) = trimmed.rfind('/') {
        let parent = trimmed[..pos].trim_end_matches('/');
        let parent = if parent.is_empty() { "/" } else { parent };
        (parent, &trimmed[pos + 1..])
    } else {
        ("/", trimmed)
    }
}

/// Validate a filename for create, mkdir and rename
///
/// Returns an error if the name is invalid:
/// - Empty, "." or ".."
/// - Contains '/' or null bytes
/// - Too long (> NAME_MAX bytes)
pub fn validate_filename(name: &str) -> FsResult<()> {
    if name.len() > NAME_MAX {
        return Err(FsError::NameTooLong);
    }

    if name.is_empty() || name == "." || name == ".." {
        return Err(FsError::InvalidArgument);
    }

    if name.contains('/') || name.contains('\0') {
        return Err(FsError::InvalidArgument);
    }

    Ok(())
}

fn check_path(path: &str) -> FsResult<()> {
    if path.len() > PATH_MAX {
        return Err(FsError::NameTooLong);
    }
    if components(path).any(|c| c.len() > NAME_MAX) {
        return Err(FsError::NameTooLong);
    }
    Ok(())
}

impl Vfs {
    /// Resolve a path to its final dentry
    pub(crate) fn resolve(&mut self, path: &str) -> FsResult<DentryId> {
        check_path(path)?;
        let mut current = self.root_dentry()?;
        for name in components(path) {
            current = self.step(current, name)?;
        }
        Ok(current)
    }

    /// Resolve a path to the dentry of its parent directory and the final
    /// component name
    ///
    /// The root has no parent, so "/" (or an empty path) fails NoSuchEntry.
    pub(crate) fn resolve_parent<'p>(&mut self, path: &'p str) -> FsResult<(DentryId, &'p str)> {
        check_path(path)?;
        let Some(leaf) = components(path).last() else {
            return Err(FsError::NoSuchEntry);
        };

        let mut current = self.root_dentry()?;
        let mut remaining = components(path).count() - 1;
        for name in components(path) {
            if remaining == 0 {
                break;
            }
            current = self.step(current, name)?;
            remaining -= 1;
        }
        Ok((current, leaf))
    }

    /// Resolve a path and return its inode
    pub fn lookup(&mut self, path: &str) -> FsResult<Arc<Inode>> {
        let dentry = self.resolve(path)?;
        let inode = self.dcache.inode(dentry);
        self.dcache.dput(dentry);
        inode.ok_or(FsError::NoSuchEntry)
    }

    /// Check whether a path names a directory
    pub fn is_dir(&mut self, path: &str) -> bool {
        self.lookup(path)
            .map(|inode| inode.mode().is_directory())
            .unwrap_or(false)
    }

    fn root_dentry(&mut self) -> FsResult<DentryId> {
        let root = self.mounts.root_mount().ok_or(FsError::NoSuchEntry)?.root;
        self.dcache.dget(root);
        Ok(root)
    }

    /// Walk from `parent` to its child `name`
    ///
    /// Consumes the caller's reference on `parent` whatever the outcome.
    fn step(&mut self, parent: DentryId, name: &str) -> FsResult<DentryId> {
        let result = self.lookup_child(parent, name);
        self.dcache.dput(parent);
        result
    }

    /// Find `name` under `parent` without consuming the parent reference
    pub(crate) fn lookup_child(&mut self, parent: DentryId, name: &str) -> FsResult<DentryId> {
        if let Some(hit) = self.dcache.lookup(parent, name) {
            return Ok(hit);
        }

        let dir = self.dcache.inode(parent).ok_or(FsError::NoSuchEntry)?;
        let lookup = dir.inode_ops().lookup.ok_or(FsError::NotADirectory)?;
        match lookup(&dir, name)? {
            Some(child) => self.dcache.insert(parent, name, Arc::new(child)),
            None => {
                log_debug!("VFS", "lookup: '{}' not found in inode {}", name, dir.ino());
                Err(FsError::NoSuchEntry)
            }
        }
    }
}
