//! Filesystem Type Registry
//!
//! This module manages registration and lookup of filesystem types.

use alloc::sync::Arc;
use alloc::vec::Vec;

use super::inode::{FsError, FsResult};
use super::superblock::FsType;

/// Registered filesystem types, newest first
#[derive(Default)]
pub struct FsRegistry {
    types: Vec<Arc<dyn FsType>>,
}

impl FsRegistry {
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Register a filesystem type
    pub fn register(&mut self, fs_type: Arc<dyn FsType>) -> FsResult<()> {
        if self.find(fs_type.name()).is_some() {
            log_warn!("VFS", "Filesystem '{}' already registered", fs_type.name());
            return Err(FsError::AlreadyRegistered);
        }

        log_info!("VFS", "Registered filesystem '{}'", fs_type.name());
        self.types.insert(0, fs_type);
        Ok(())
    }

    /// Lookup a filesystem type by name
    pub fn find(&self, name: &str) -> Option<Arc<dyn FsType>> {
        self.types
            .iter()
            .find(|fs_type| fs_type.name().as_bytes() == name.as_bytes())
            .cloned()
    }

    /// Names of all registered filesystem types
    pub fn names(&self) -> Vec<&'static str> {
        self.types.iter().map(|fs_type| fs_type.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::vfs::superblock::{MountOpts, SuperBlock};

    struct Dummy(&'static str);

    impl FsType for Dummy {
        fn name(&self) -> &'static str {
            self.0
        }

        fn mount(&self, _sb_id: u64, _source: &str, _opts: &MountOpts) -> FsResult<SuperBlock> {
            Err(FsError::IoError)
        }
    }

    #[test]
    fn test_register_inserts_at_head() {
        let mut reg = FsRegistry::new();
        reg.register(Arc::new(Dummy("a"))).unwrap();
        reg.register(Arc::new(Dummy("b"))).unwrap();
        assert_eq!(reg.names(), vec!["b", "a"]);
    }

    #[test]
    fn test_register_duplicate() {
        let mut reg = FsRegistry::new();
        reg.register(Arc::new(Dummy("a"))).unwrap();
        assert_eq!(reg.register(Arc::new(Dummy("a"))), Err(FsError::AlreadyRegistered));
        assert_eq!(reg.names().len(), 1);
    }

    #[test]
    fn test_find() {
        let mut reg = FsRegistry::new();
        reg.register(Arc::new(Dummy("ramfs"))).unwrap();
        assert!(reg.find("ramfs").is_some());
        assert!(reg.find("ram").is_none());
        assert!(reg.find("ramfs2").is_none());
    }
}
