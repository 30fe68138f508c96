//! Filesystem Registry and Mount Table Tests
//!
//! Tests registration order and duplicates, mount error codes, mount table
//! capacity, and the absent-operation contract using a minimal filesystem
//! that fills in almost nothing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vibos_vfs::config::{DEVNAME_MAX, MAX_MOUNTS};
use vibos_vfs::fs::ramfs::RamfsType;
use vibos_vfs::fs::vfs::{
    FileOperations, FsType, Inode, InodeOperations, SuperBlock,
};
use vibos_vfs::{FileMode, FsError, FsResult, MountFlags, MountOpts, OpenFlags, Vfs, Whence};

/// Filesystem whose root contains one fixed file and supports nothing else
struct FixedFs {
    mounts: Arc<AtomicUsize>,
}

static ROOT_OPS: InodeOperations = InodeOperations {
    lookup: Some(fixed_lookup),
    unlink: Some(fixed_unlink),
    ..InodeOperations::EMPTY
};
static NO_OPS: InodeOperations = InodeOperations::EMPTY;
static NO_FILE_OPS: FileOperations = FileOperations::EMPTY;

fn fixed_lookup(dir: &Inode, name: &str) -> FsResult<Option<Inode>> {
    if name != "fixed" {
        return Ok(None);
    }
    let inode = Inode::new(2, FileMode::regular(0o444), dir.sb_id(), &NO_OPS, &NO_FILE_OPS);
    Ok(Some(inode.with_size(64)))
}

fn fixed_unlink(_dir: &Inode, name: &str) -> FsResult<()> {
    if name == "fixed" {
        Ok(())
    } else {
        Err(FsError::NoSuchEntry)
    }
}

impl FsType for FixedFs {
    fn name(&self) -> &'static str {
        "fixedfs"
    }

    fn mount(&self, sb_id: u64, _source: &str, opts: &MountOpts) -> FsResult<SuperBlock> {
        self.mounts.fetch_add(1, Ordering::SeqCst);
        let root = Inode::new(1, FileMode::directory(0o555), sb_id, &ROOT_OPS, &NO_FILE_OPS);
        Ok(SuperBlock::new(sb_id, 512, self.name(), opts.flags, root, Arc::new(())))
    }
}

/// Filesystem whose mount always fails
struct BrokenFs;

impl FsType for BrokenFs {
    fn name(&self) -> &'static str {
        "brokenfs"
    }

    fn mount(&self, _sb_id: u64, _source: &str, _opts: &MountOpts) -> FsResult<SuperBlock> {
        Err(FsError::OutOfMemory)
    }
}

fn fixed_vfs() -> (Vfs, Arc<AtomicUsize>) {
    let mounts = Arc::new(AtomicUsize::new(0));
    let mut vfs = Vfs::new();
    vfs.register_filesystem(Arc::new(FixedFs { mounts: mounts.clone() })).unwrap();
    vfs.mount("fixed0", "/", "fixedfs", MountOpts::default()).unwrap();
    (vfs, mounts)
}

/// Test registration order and duplicates
#[test]
fn test_register_filesystems() {
    let mut vfs = Vfs::new();
    assert!(vfs.filesystems().is_empty());
    vfs.register_filesystem(Arc::new(RamfsType)).unwrap();
    vfs.register_filesystem(Arc::new(BrokenFs)).unwrap();
    assert_eq!(vfs.filesystems(), ["brokenfs", "ramfs"]);

    assert_eq!(vfs.register_filesystem(Arc::new(RamfsType)), Err(FsError::AlreadyRegistered));
    assert_eq!(vfs.filesystems().len(), 2);
    assert_eq!(vfs.lookup_filesystem("ramfs").unwrap().name(), "ramfs");
    assert!(vfs.lookup_filesystem("ext4").is_none());
}

/// Test mount error codes
///
/// Verifies that:
/// 1. An unknown type fails NoSuchDevice
/// 2. A failing factory is reported as IoError
/// 3. unmount is not implemented
#[test]
fn test_mount_errors() {
    let mut vfs = Vfs::new();
    vfs.register_filesystem(Arc::new(BrokenFs)).unwrap();

    assert_eq!(vfs.mount("sda1", "/", "ext4", MountOpts::default()), Err(FsError::NoSuchDevice));
    assert_eq!(vfs.mount("x", "/", "brokenfs", MountOpts::default()), Err(FsError::IoError));
    assert!(vfs.mounts().is_empty());
    assert_eq!(vfs.unmount("/"), Err(FsError::NotImplemented));
    assert_eq!(FsError::NotImplemented.errno(), -38);
    assert_eq!(FsError::IoError.errno(), -5);
}

/// Test mount table capacity
///
/// Verifies that a full table fails OutOfMemory without calling the
/// filesystem's mount factory.
#[test]
fn test_mount_table_full() {
    let (mut vfs, mounts) = fixed_vfs();
    for i in 1..MAX_MOUNTS {
        vfs.mount("fixed", &format!("/mnt/{}", i), "fixedfs", MountOpts::default()).unwrap();
    }
    assert_eq!(mounts.load(Ordering::SeqCst), MAX_MOUNTS);
    assert_eq!(
        vfs.mount("fixed", "/mnt/overflow", "fixedfs", MountOpts::default()),
        Err(FsError::OutOfMemory)
    );
    assert_eq!(mounts.load(Ordering::SeqCst), MAX_MOUNTS);
    assert_eq!(vfs.mounts().len(), MAX_MOUNTS);
}

/// Test mount records
#[test]
fn test_mount_records() {
    let mut vfs = Vfs::new();
    vfs.register_filesystem(Arc::new(RamfsType)).unwrap();
    let root = vfs.mount("ram0", "/", "ramfs", MountOpts::default()).unwrap();

    let long_source = "s".repeat(100);
    let opts = MountOpts {
        flags: MountFlags::MS_RDONLY | MountFlags::MS_NOEXEC,
        data: Some("size=1m".to_string()),
    };
    let second = vfs.mount(&long_source, "/mnt", "ramfs", opts).unwrap();

    let mounts = vfs.mounts();
    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts[0].mount_id, root);
    assert_eq!(mounts[0].target, "/");
    assert_eq!(mounts[0].parent, None);
    assert_eq!(mounts[1].mount_id, second);
    assert_eq!(mounts[1].devname.len(), DEVNAME_MAX);
    assert_eq!(mounts[1].parent, Some(root));
    assert!(mounts[1].flags.contains(MountFlags::MS_RDONLY));
    assert_eq!(mounts[1].sb.flags(), mounts[1].flags);
    assert!(mounts[0].sb.flags().is_empty());
    assert_eq!(mounts[1].sb.fs_type(), "ramfs");
    assert_ne!(mounts[0].sb.id(), mounts[1].sb.id());

    // Flags are recorded, not enforced
    vfs.create("/writable", FileMode::new(0o644)).unwrap();
}

/// Test absent namespace operations
///
/// Verifies that missing table entries surface as errors and are never
/// called through.
#[test]
fn test_absent_inode_operations() {
    let (mut vfs, _) = fixed_vfs();

    assert_eq!(vfs.create("/new", FileMode::new(0o644)), Err(FsError::PermissionDenied));
    assert_eq!(vfs.mkdir("/new", FileMode::new(0o755)), Err(FsError::PermissionDenied));
    assert_eq!(
        vfs.open("/new", OpenFlags::O_RDWR | OpenFlags::O_CREAT, FileMode::new(0o644)),
        Err(FsError::PermissionDenied)
    );
    assert_eq!(vfs.rename("/fixed", "/moved"), Err(FsError::PermissionDenied));
    assert_eq!(vfs.rmdir("/fixed"), Err(FsError::NotSupported));
    assert_eq!(vfs.stat("/fixed/x"), Err(FsError::NotADirectory));

    let st = vfs.stat("/fixed").unwrap();
    assert_eq!((st.ino, st.size, st.blksize), (2, 64, 512));
}

/// Test absent file operations
#[test]
fn test_absent_file_operations() {
    let (mut vfs, _) = fixed_vfs();

    let fd = vfs.open("/fixed", OpenFlags::O_RDONLY, FileMode::new(0)).unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(vfs.read(fd, &mut buf, 8), Err(FsError::NotSupported));
    assert_eq!(vfs.write(fd, &buf, 8), Err(FsError::NotSupported));
    assert_eq!(vfs.readdir(fd, |_| {}), Err(FsError::InvalidArgument));
    // Without an llseek entry the generic arithmetic applies
    assert_eq!(vfs.lseek(fd, -4, Whence::End).unwrap(), 60);
    vfs.close(fd).unwrap();

    let root = vfs.open("/", OpenFlags::O_RDONLY, FileMode::new(0)).unwrap();
    assert_eq!(vfs.readdir(root, |_| {}), Err(FsError::InvalidArgument));
    vfs.close(root).unwrap();
}

/// Test that a successful unlink drops the cached entry
#[test]
fn test_unlink_drops_cached_dentry() {
    let (mut vfs, _) = fixed_vfs();
    let before = vfs.lookup("/fixed").unwrap();
    assert!(Arc::ptr_eq(&before, &vfs.lookup("/fixed").unwrap()));

    vfs.unlink("/fixed").unwrap();
    let after = vfs.lookup("/fixed").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(vfs.unlink("/other"), Err(FsError::NoSuchEntry));
}
