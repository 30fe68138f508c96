//! Dentry Cache
//!
//! This module implements the directory entry cache used by path resolution.
//! Dentries live in an arena and are addressed by [`DentryId`]; hashed
//! dentries are indexed by (parent, name) so repeated walks over the same
//! path reuse one dentry and one inode instead of allocating fresh ones.
//!
//! Reference counting is explicit. Every id handed out by `lookup`, `insert`
//! or `dget` carries one reference that must be returned with `dput`. A
//! hashed child holds a reference on its parent, so a cached subtree always
//! reaches its mount root. Dentries nobody references stay cached until the
//! cache fills up and they are evicted least-recently-used first.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use super::inode::{FsError, FsResult, Inode};
use crate::config::DENTRY_CACHE_SIZE;

/// Handle to a dentry slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DentryId(usize);

/// A named edge from a parent directory to an inode
#[derive(Debug)]
pub struct Dentry {
    name: String,
    inode: Option<Arc<Inode>>,
    parent: Option<DentryId>,
    sb_id: u64,
    refcount: usize,
    last_used: u64,
    hashed: bool,
}

impl Dentry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inode(&self) -> Option<&Arc<Inode>> {
        self.inode.as_ref()
    }

    /// Parent dentry, `None` for a filesystem root
    pub fn parent(&self) -> Option<DentryId> {
        self.parent
    }

    pub fn sb_id(&self) -> u64 {
        self.sb_id
    }

    pub fn refcount(&self) -> usize {
        self.refcount
    }
}

/// Dentry cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DentryCacheStats {
    /// Live dentries, referenced or not
    pub size: usize,
    /// Dentries with at least one reference
    pub referenced: usize,
    pub capacity: usize,
}

/// Arena-backed dentry cache
pub struct DentryCache {
    slots: Vec<Option<Dentry>>,
    free: Vec<usize>,
    /// parent slot -> child name -> child slot
    index: BTreeMap<usize, BTreeMap<String, usize>>,
    capacity: usize,
    clock: u64,
    live: usize,
}

impl Default for DentryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DentryCache {
    /// Create a new dentry cache
    pub fn new() -> Self {
        Self::with_capacity(DENTRY_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: BTreeMap::new(),
            capacity,
            clock: 0,
            live: 0,
        }
    }

    pub fn get(&self, id: DentryId) -> Option<&Dentry> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    /// Inode bound to a dentry
    pub fn inode(&self, id: DentryId) -> Option<Arc<Inode>> {
        self.get(id).and_then(|d| d.inode.clone())
    }

    /// Allocate an unhashed root dentry for a freshly mounted filesystem
    pub fn alloc_root(&mut self, inode: Arc<Inode>) -> FsResult<DentryId> {
        let sb_id = inode.sb_id();
        let dentry = Dentry {
            name: String::from("/"),
            inode: Some(inode),
            parent: None,
            sb_id,
            refcount: 1,
            last_used: self.tick(),
            hashed: false,
        };
        self.store(dentry)
    }

    /// Look up a cached child of `parent`
    ///
    /// On a hit the returned id carries a new reference.
    pub fn lookup(&mut self, parent: DentryId, name: &str) -> Option<DentryId> {
        let slot = *self.index.get(&parent.0)?.get(name)?;
        let now = self.tick();
        let dentry = self.slots[slot].as_mut()?;
        dentry.refcount += 1;
        dentry.last_used = now;
        Some(DentryId(slot))
    }

    /// Cache a freshly looked-up or created child of `parent`
    ///
    /// The returned id carries one reference; the child pins its parent.
    pub fn insert(
        &mut self,
        parent: DentryId,
        name: &str,
        inode: Arc<Inode>,
    ) -> FsResult<DentryId> {
        if self.live >= self.capacity {
            self.evict_lru();
        }

        let sb_id = self.get(parent).ok_or(FsError::InvalidArgument)?.sb_id;
        let mut owned = String::new();
        owned.try_reserve_exact(name.len()).map_err(|_| FsError::OutOfMemory)?;
        owned.push_str(name);

        let dentry = Dentry {
            name: owned.clone(),
            inode: Some(inode),
            parent: Some(parent),
            sb_id,
            refcount: 1,
            last_used: self.tick(),
            hashed: true,
        };
        let id = self.store(dentry)?;
        self.index.entry(parent.0).or_default().insert(owned, id.0);
        self.dget(parent);
        Ok(id)
    }

    /// Take another reference on a dentry
    pub fn dget(&mut self, id: DentryId) {
        if let Some(Some(dentry)) = self.slots.get_mut(id.0) {
            dentry.refcount += 1;
        }
    }

    /// Drop a reference
    ///
    /// A hashed dentry stays cached at refcount zero; an unhashed one is freed
    /// together with the reference it held on its parent.
    pub fn dput(&mut self, id: DentryId) {
        let mut next = Some(id);
        while let Some(id) = next.take() {
            let Some(Some(dentry)) = self.slots.get_mut(id.0) else {
                return;
            };
            dentry.refcount = dentry.refcount.saturating_sub(1);
            if dentry.refcount > 0 || dentry.hashed {
                return;
            }
            next = self.free_slot(id.0);
        }
    }

    /// Move a dentry to a new (parent, name) after a rename
    ///
    /// A dentry already cached under the new key was replaced by the rename
    /// and is dropped.
    pub fn d_move(&mut self, id: DentryId, new_parent: DentryId, new_name: &str) -> FsResult<()> {
        let mut owned = String::new();
        owned.try_reserve_exact(new_name.len()).map_err(|_| FsError::OutOfMemory)?;
        owned.push_str(new_name);

        let old_parent = self.unhash(id.0);
        self.d_drop(new_parent, new_name);
        self.dget(new_parent);
        if let Some(Some(dentry)) = self.slots.get_mut(id.0) {
            dentry.parent = Some(new_parent);
            dentry.name = owned.clone();
            dentry.hashed = true;
        }
        self.index.entry(new_parent.0).or_default().insert(owned, id.0);
        if let Some(parent) = old_parent {
            self.dput(parent);
        }
        Ok(())
    }

    /// Forget the cached child `name` of `parent` after it was removed
    ///
    /// Holders of the dropped dentry keep it alive until their last `dput`.
    pub fn d_drop(&mut self, parent: DentryId, name: &str) {
        let Some(slot) = self.index.get(&parent.0).and_then(|c| c.get(name)).copied() else {
            return;
        };
        self.unhash(slot);
        let unreferenced = self.slots[slot].as_ref().is_some_and(|d| d.refcount == 0);
        if unreferenced {
            if let Some(parent) = self.free_slot(slot) {
                self.dput(parent);
            }
        }
    }

    /// Absolute path of a dentry within its filesystem
    pub fn path(&self, id: DentryId) -> String {
        let mut components = Vec::new();
        let mut current = self.get(id);
        while let Some(dentry) = current {
            match dentry.parent() {
                Some(parent) => {
                    components.push(dentry.name());
                    current = self.get(parent);
                }
                None => break,
            }
            // A directory renamed into its own subtree would loop forever
            if components.len() > self.live {
                break;
            }
        }

        let mut path = String::new();
        for component in components.iter().rev() {
            path.push('/');
            path.push_str(component);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Get cache statistics
    pub fn stats(&self) -> DentryCacheStats {
        let referenced = self
            .slots
            .iter()
            .flatten()
            .filter(|d| d.refcount > 0)
            .count();
        DentryCacheStats {
            size: self.live,
            referenced,
            capacity: self.capacity,
        }
    }

    // Private helper methods

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn store(&mut self, dentry: Dentry) -> FsResult<DentryId> {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(dentry);
                slot
            }
            None => {
                self.slots.try_reserve(1).map_err(|_| FsError::OutOfMemory)?;
                self.slots.push(Some(dentry));
                self.slots.len() - 1
            }
        };
        self.live += 1;
        Ok(DentryId(slot))
    }

    /// Remove a dentry from the index, returning the parent it was pinning
    fn unhash(&mut self, slot: usize) -> Option<DentryId> {
        let dentry = self.slots.get_mut(slot)?.as_mut()?;
        if !dentry.hashed {
            return None;
        }
        dentry.hashed = false;
        let parent = dentry.parent?;
        if let Some(children) = self.index.get_mut(&parent.0) {
            children.remove(dentry.name.as_str());
            if children.is_empty() {
                self.index.remove(&parent.0);
            }
        }
        Some(parent)
    }

    /// Free a slot, returning the parent whose reference must now be dropped
    fn free_slot(&mut self, slot: usize) -> Option<DentryId> {
        let parent = self.unhash(slot);
        let dentry = self.slots[slot].take()?;
        self.free.push(slot);
        self.live -= 1;
        // An unhashed child still pinned its parent until now
        parent.or(dentry.parent)
    }

    fn evict_lru(&mut self) {
        // Only unreferenced hashed dentries are candidates; with no candidate
        // the cache simply grows past its soft limit
        let victim = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, d)| d.as_ref().map(|d| (slot, d)))
            .filter(|(_, d)| d.hashed && d.refcount == 0)
            .min_by_key(|(_, d)| d.last_used)
            .map(|(slot, _)| slot);

        if let Some(slot) = victim {
            if let Some(dentry) = self.get(DentryId(slot)) {
                log_trace!("VFS", "dcache: evicting '{}'", dentry.name);
            }
            if let Some(parent) = self.free_slot(slot) {
                self.dput(parent);
            }
        }
    }
}
