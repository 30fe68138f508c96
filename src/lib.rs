//! VibOS Virtual File System
//!
//! The naming, path-resolution and file-access layer of the VibOS kernel,
//! together with ramfs, the in-memory filesystem mounted as the initial root.
//!
//! Everything hangs off a [`Vfs`] context object; [`fs::boot`] builds one the
//! way the kernel does at startup.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
#[macro_use]
pub mod log;
pub mod fs;

pub use fs::vfs::{
    DirEntry, DirEntryType, Fd, FileMode, FsError, FsResult, MountFlags, MountOpts, OpenFlags,
    Stat, Vfs, Whence,
};
