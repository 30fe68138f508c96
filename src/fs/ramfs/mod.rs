//! Ramfs
//!
//! In-memory filesystem used as the initial root filesystem.
//! Features:
//! - Per-mount node arena behind one lock
//! - Directory children kept as a newest-first linked list
//! - File data in block-granular buffers that grow on write
//! - Boot-time population helpers that bypass the VFS

pub mod dir;
pub mod file;
pub mod node;
pub mod super_impl;

pub use node::{NodeId, RamNode, RamRef, RamTree};
pub use super_impl::{create_dir, create_file, RamfsInfo, RamfsType};
