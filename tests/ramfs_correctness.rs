//! Ramfs Correctness Tests
//!
//! Tests the ramfs backing store through the VFS and through its boot-time
//! population helpers.

use vibos_vfs::config::RAMFS_BLOCK_SIZE;
use vibos_vfs::fs::boot;
use vibos_vfs::fs::ramfs::{self, RamfsInfo};
use vibos_vfs::log::read_log_buffer;
use vibos_vfs::{FileMode, FsError, OpenFlags, Whence};

/// Test files placed at boot without going through the VFS
#[test]
fn test_boot_helpers_visible_through_vfs() {
    let mut vfs = boot().unwrap();
    let sb = vfs.root_superblock().unwrap();

    ramfs::create_dir(&sb, "/etc/init", FileMode::new(0o755)).unwrap();
    let ino =
        ramfs::create_file(&sb, "/etc/init/rc", FileMode::new(0o755), b"#!/bin/sh\n").unwrap();

    let st = vfs.stat("/etc/init/rc").unwrap();
    assert_eq!(st.ino, ino);
    assert_eq!(st.size, 10);
    assert_eq!(st.mode, FileMode::regular(0o755));

    let fd = vfs.open("/etc/init/rc", OpenFlags::O_RDONLY, FileMode::new(0)).unwrap();
    let mut buf = [0u8; 10];
    vfs.read(fd, &mut buf, 10).unwrap();
    assert_eq!(&buf, b"#!/bin/sh\n");
    vfs.close(fd).unwrap();

    assert_eq!(
        ramfs::create_file(&sb, "/nope/rc", FileMode::new(0o644), b""),
        Err(FsError::NoSuchEntry)
    );
    assert_eq!(
        ramfs::create_dir(&sb, "/etc/init", FileMode::new(0o755)),
        Err(FsError::AlreadyExists)
    );
}

/// Test inode numbering
///
/// Verifies that numbers are unique per mount and the root is 1.
#[test]
fn test_inode_numbers() {
    let mut vfs = boot().unwrap();
    assert_eq!(vfs.stat("/").unwrap().ino, 1);

    let mut seen = vec![1];
    for name in ["bin", "dev", "etc", "home", "tmp"] {
        seen.push(vfs.stat(&format!("/{}", name)).unwrap().ino);
    }
    vfs.create("/tmp/a", FileMode::new(0o644)).unwrap();
    seen.push(vfs.stat("/tmp/a").unwrap().ino);

    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), seen.len());
}

/// Test buffer growth
///
/// Verifies that data buffers grow in whole blocks and never shrink.
#[test]
fn test_block_granular_growth() {
    let mut vfs = boot().unwrap();
    let sb = vfs.root_superblock().unwrap();
    let info = sb.private_as::<RamfsInfo>().unwrap();
    assert_eq!(info.bytes_allocated(), 0);

    let fd = vfs
        .open("/tmp/blob", OpenFlags::O_RDWR | OpenFlags::O_CREAT, FileMode::new(0o644))
        .unwrap();
    vfs.write(fd, b"x", 1).unwrap();
    assert_eq!(info.bytes_allocated(), RAMFS_BLOCK_SIZE);

    vfs.lseek(fd, (3 * RAMFS_BLOCK_SIZE) as i64, Whence::Set).unwrap();
    vfs.write(fd, b"y", 1).unwrap();
    assert_eq!(info.bytes_allocated(), 4 * RAMFS_BLOCK_SIZE);
    assert_eq!(vfs.fstat(fd).unwrap().size, (3 * RAMFS_BLOCK_SIZE + 1) as u64);

    // Overwriting inside the file allocates nothing
    vfs.lseek(fd, 0, Whence::Set).unwrap();
    vfs.write(fd, &[0u8; 100], 100).unwrap();
    assert_eq!(info.bytes_allocated(), 4 * RAMFS_BLOCK_SIZE);
    vfs.close(fd).unwrap();
}

/// Test that a gap left by seeking past the end reads back as zeros
#[test]
fn test_sparse_write_reads_zero() {
    let mut vfs = boot().unwrap();
    let fd = vfs
        .open("/tmp/sparse", OpenFlags::O_RDWR | OpenFlags::O_CREAT, FileMode::new(0o644))
        .unwrap();
    vfs.lseek(fd, 6000, Whence::Set).unwrap();
    vfs.write(fd, b"end", 3).unwrap();

    vfs.lseek(fd, 0, Whence::Set).unwrap();
    let mut buf = vec![0xAAu8; 6003];
    assert_eq!(vfs.read(fd, &mut buf, 6003).unwrap(), 6003);
    assert!(buf[..6000].iter().all(|&b| b == 0));
    assert_eq!(&buf[6000..], b"end");
    vfs.close(fd).unwrap();
}

/// Test node accounting
#[test]
fn test_node_count() {
    let mut vfs = boot().unwrap();
    let sb = vfs.root_superblock().unwrap();
    let info = sb.private_as::<RamfsInfo>().unwrap();
    // Root plus the boot directories
    assert_eq!(info.node_count(), 6);

    vfs.mkdir("/tmp/d", FileMode::new(0o755)).unwrap();
    vfs.create("/tmp/d/f", FileMode::new(0o644)).unwrap();
    assert_eq!(info.node_count(), 8);

    // Failed creations leave nothing behind
    assert!(vfs.create("/tmp/d/f", FileMode::new(0o644)).is_err());
    assert_eq!(info.node_count(), 8);
}

/// Test mount and boot logging
#[test]
fn test_boot_is_logged() {
    let _vfs = boot().unwrap();
    let mut buf = vec![0u8; 65536];
    let n = read_log_buffer(&mut buf);
    let log = String::from_utf8_lossy(&buf[..n]);
    assert!(log.contains("[VFS][INFO] Registered filesystem 'ramfs'"));
    assert!(log.contains("[RAMFS][INFO] Created directory 'tmp'"));
}

/// Test that a readdir callback may modify the directory being listed
///
/// Verifies that the listing reflects the directory at the time of the
/// call and that entries added from the callback are visible afterwards.
#[test]
fn test_readdir_callback_reenters_ramfs() {
    let mut vfs = boot().unwrap();
    let sb = vfs.root_superblock().unwrap();

    let fd = vfs.open("/", OpenFlags::O_RDONLY, FileMode::new(0)).unwrap();
    let mut seen = Vec::new();
    let mut created = 0;
    vfs.readdir(fd, |entry| {
        seen.push(entry.name.to_string());
        let path = format!("/copy-of-{}", entry.pos);
        if ramfs::create_dir(&sb, &path, FileMode::new(0o755)).is_ok() {
            created += 1;
        }
    })
    .unwrap();
    vfs.close(fd).unwrap();

    assert_eq!(seen.len(), 7);
    assert_eq!(created, 7);
    assert!(!seen.iter().any(|name| name.starts_with("copy-of-")));
    assert!(vfs.is_dir("/copy-of-0"));
    assert!(vfs.is_dir("/copy-of-6"));
}
