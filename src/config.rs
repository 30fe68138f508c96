/// Configuration constants for the VibOS filesystem layer

/// Longest single path component in bytes
pub const NAME_MAX: usize = 255;

/// Longest path accepted by the resolver in bytes
pub const PATH_MAX: usize = 4096;

/// Number of slots in the mount table
pub const MAX_MOUNTS: usize = 64;

/// Number of simultaneously open files per VFS instance
pub const MAX_OPEN_FILES: usize = 256;

/// Longest device name kept on a mount (longer names are truncated)
pub const DEVNAME_MAX: usize = 63;

/// Ramfs data buffers grow in multiples of this size
pub const RAMFS_BLOCK_SIZE: usize = 4096;

/// Soft limit on cached dentries before LRU eviction kicks in
pub const DENTRY_CACHE_SIZE: usize = 1024;

/// Directories created in the root ramfs at boot, with their permission bits
pub const BOOT_DIRECTORIES: &[(&str, u16)] = &[
    ("bin", 0o755),
    ("dev", 0o755),
    ("etc", 0o755),
    ("home", 0o755),
    ("tmp", 0o1777),
];
