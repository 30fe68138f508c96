//! Ramfs Node Tree
//!
//! Every ramfs instance keeps its nodes in one arena. Directories link their
//! children through first-child / next-sibling indices, newest first, so name
//! lookup is a linear scan of the child list.
//!
//! A regular file's data buffer is always a whole number of
//! `RAMFS_BLOCK_SIZE` blocks long; `size` marks how much of it is file
//! content. Buffers grow on write and never shrink.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::config::RAMFS_BLOCK_SIZE;
use crate::fs::vfs::{FileMode, FsError, FsResult};

/// Index of a node in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The root directory of every tree
    pub const ROOT: Self = Self(0);
}

/// One file or directory
#[derive(Debug)]
pub struct RamNode {
    pub ino: u64,
    pub mode: FileMode,
    pub name: String,
    /// File data; its length is the allocated capacity
    data: Vec<u8>,
    pub size: usize,
    pub parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl RamNode {
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// File content
    pub fn contents(&self) -> &[u8] {
        &self.data[..self.size]
    }
}

/// Node arena for one ramfs instance
#[derive(Debug)]
pub struct RamTree {
    nodes: Vec<RamNode>,
    next_ino: u64,
}

pub type SharedTree = Arc<Mutex<RamTree>>;

/// Private data attached to every ramfs inode and open file
pub struct RamRef {
    pub tree: SharedTree,
    pub node: NodeId,
}

impl RamTree {
    /// Create a tree holding only the root directory (ino 1)
    pub fn new(root_mode: FileMode) -> Self {
        let root = RamNode {
            ino: 1,
            mode: root_mode,
            name: String::new(),
            data: Vec::new(),
            size: 0,
            parent: None,
            first_child: None,
            next_sibling: None,
        };
        Self {
            nodes: alloc::vec![root],
            next_ino: 2,
        }
    }

    pub fn node(&self, id: NodeId) -> FsResult<&RamNode> {
        self.nodes.get(id.0).ok_or(FsError::NoSuchEntry)
    }

    fn node_mut(&mut self, id: NodeId) -> FsResult<&mut RamNode> {
        self.nodes.get_mut(id.0).ok_or(FsError::NoSuchEntry)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bytes held by file data buffers
    pub fn bytes_allocated(&self) -> usize {
        self.nodes.iter().map(|node| node.data.len()).sum()
    }

    /// Iterate over a directory's children, newest first
    pub fn children(&self, dir: NodeId) -> Children<'_> {
        let next = self.nodes.get(dir.0).and_then(|node| node.first_child);
        Children { tree: self, next }
    }

    /// Find a child of `dir` by name
    pub fn find_child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.children(dir)
            .find(|(_, node)| node.name.as_bytes() == name.as_bytes())
            .map(|(id, _)| id)
    }

    /// Walk '/'-separated components from the root
    pub fn walk(&self, path: &str) -> FsResult<NodeId> {
        let mut current = NodeId::ROOT;
        for name in path.split('/').filter(|c| !c.is_empty()) {
            if !self.node(current)?.mode.is_directory() {
                return Err(FsError::NotADirectory);
            }
            current = self.find_child(current, name).ok_or(FsError::NoSuchEntry)?;
        }
        Ok(current)
    }

    /// Allocate a node and link it at the front of `dir`'s children
    pub fn add_child(&mut self, dir: NodeId, name: &str, mode: FileMode) -> FsResult<NodeId> {
        if !self.node(dir)?.mode.is_directory() {
            return Err(FsError::NotADirectory);
        }
        if self.find_child(dir, name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let mut owned = String::new();
        owned.try_reserve_exact(name.len()).map_err(|_| FsError::OutOfMemory)?;
        owned.push_str(name);
        self.nodes.try_reserve(1).map_err(|_| FsError::OutOfMemory)?;

        let id = NodeId(self.nodes.len());
        let first_child = self.node(dir)?.first_child;
        self.nodes.push(RamNode {
            ino: self.next_ino,
            mode,
            name: owned,
            data: Vec::new(),
            size: 0,
            parent: Some(dir),
            first_child: None,
            next_sibling: first_child,
        });
        self.next_ino += 1;
        self.node_mut(dir)?.first_child = Some(id);
        Ok(id)
    }

    /// Move `old_name` from `old_dir` to `new_dir` as `new_name`
    ///
    /// An existing `new_name` is never replaced. Moving a directory below
    /// itself is not detected.
    pub fn rename(
        &mut self,
        old_dir: NodeId,
        old_name: &str,
        new_dir: NodeId,
        new_name: &str,
    ) -> FsResult<()> {
        if !self.node(new_dir)?.mode.is_directory() {
            return Err(FsError::NotADirectory);
        }
        if self.find_child(new_dir, new_name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let id = self.find_child(old_dir, old_name).ok_or(FsError::NoSuchEntry)?;

        let mut owned = String::new();
        owned.try_reserve_exact(new_name.len()).map_err(|_| FsError::OutOfMemory)?;
        owned.push_str(new_name);

        self.unlink(old_dir, id)?;
        let first_child = self.node(new_dir)?.first_child;
        let node = self.node_mut(id)?;
        node.next_sibling = first_child;
        node.parent = Some(new_dir);
        node.name = owned;
        self.node_mut(new_dir)?.first_child = Some(id);
        Ok(())
    }

    /// Remove `id` from `dir`'s child list
    fn unlink(&mut self, dir: NodeId, id: NodeId) -> FsResult<()> {
        let next = self.node(id)?.next_sibling;
        if self.node(dir)?.first_child == Some(id) {
            self.node_mut(dir)?.first_child = next;
            return Ok(());
        }

        let mut prev = self.node(dir)?.first_child;
        while let Some(p) = prev {
            let sibling = self.node(p)?.next_sibling;
            if sibling == Some(id) {
                self.node_mut(p)?.next_sibling = next;
                return Ok(());
            }
            prev = sibling;
        }
        Err(FsError::NoSuchEntry)
    }

    /// Copy file data starting at `offset` into `dst`
    ///
    /// Reading at or past the end returns 0.
    pub fn read_at(&self, id: NodeId, offset: u64, dst: &mut [u8]) -> FsResult<usize> {
        let node = self.node(id)?;
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if offset >= node.size {
            return Ok(0);
        }

        let to_read = dst.len().min(node.size - offset);
        dst[..to_read].copy_from_slice(&node.data[offset..offset + to_read]);
        Ok(to_read)
    }

    /// Copy `src` into the file at `offset`, growing the buffer as needed
    ///
    /// # Returns
    /// The file size after the write
    pub fn write_at(&mut self, id: NodeId, offset: u64, src: &[u8]) -> FsResult<usize> {
        let node = self.node_mut(id)?;
        let offset = usize::try_from(offset).map_err(|_| FsError::InvalidArgument)?;
        let end = offset.checked_add(src.len()).ok_or(FsError::InvalidArgument)?;

        if end > node.data.len() {
            let capacity = end
                .checked_next_multiple_of(RAMFS_BLOCK_SIZE)
                .ok_or(FsError::OutOfMemory)?;
            node.data
                .try_reserve_exact(capacity - node.data.len())
                .map_err(|_| FsError::OutOfMemory)?;
            node.data.resize(capacity, 0);
        }

        node.data[offset..end].copy_from_slice(src);
        if end > node.size {
            node.size = end;
        }
        Ok(node.size)
    }
}

/// Iterator over a directory's children
pub struct Children<'a> {
    tree: &'a RamTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a RamNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.nodes.get(id.0)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}
