//! End-to-end integration test for the filesystem layer
//!
//! Exercises the complete flow: resolve type -> escape -> compose -> compare
//! -> file I/O -> notification drain.

use std::cmp::Ordering;
use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sync_fs::{
    AccessMode, FileSystemAccess, FileSystemType, FsConfig, LocalPath, NativePlatform,
    NotificationDeque, PathPlatform, RemoteNameOrder, StdBackendFactory, Waiter,
};
use sync_test_utils::{FakeHost, FixedClock, NodeTable};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    root: LocalPath,
    fsa: FileSystemAccess,
}

/// A real temporary directory that the host reports as NTFS.
fn setup() -> Fixture {
    let temp = TempDir::new().unwrap();
    let platform = NativePlatform::default();
    let root = platform.from_native(temp.path());
    let host = FakeHost::new().mount(&root.to_path(), FileSystemType::Ntfs);

    let fsa = FileSystemAccess::new(FsConfig::default())
        .with_host(Arc::new(host))
        .with_file_backends(Arc::new(StdBackendFactory))
        .with_waiter(Arc::new(Waiter::new()));

    Fixture {
        _temp: temp,
        root,
        fsa,
    }
}

#[test]
fn test_remote_name_survives_local_round_trip() {
    let fx = setup();
    let sep = fx.fsa.separator();
    let remote = b"Budget: 2024 <final>?.xlsx";

    let mut folder = fx.root.clone();
    folder.append_with_separator(&LocalPath::from_path("reports"), false, sep);
    assert_eq!(fx.fsa.local_fs_type(&folder), FileSystemType::Ntfs);

    let leaf = fx.fsa.local_name(remote, &folder);
    assert_eq!(leaf.to_path(), "Budget%3a 2024 %3cfinal%3e%3f.xlsx");

    let mut full = folder.clone();
    full.append_with_separator(&leaf, false, sep);
    assert_eq!(fx.fsa.remote_name(&full), remote);
    assert_eq!(
        leaf.fs_compare_remote(b"BUDGET: 2024 <FINAL>?.XLSX", FileSystemType::Ntfs),
        Ordering::Equal
    );

    fs::create_dir_all(fx.fsa.platform().to_native(&folder)).unwrap();
    let mut writer = fx.fsa.new_file_access();
    writer.open_with(&full, AccessMode::WRITE).unwrap();
    writer.write(b"quarterly numbers", 0).unwrap();
    writer.close();

    let mut reader = fx.fsa.new_file_access();
    reader.open(&full).unwrap();
    assert_eq!(reader.size(), 17);
    assert_eq!(fx.fsa.read(&mut reader, 9, 0).unwrap(), b"quarterly");
}

#[test]
fn test_counter_names_avoid_collision() {
    let fx = setup();
    let sep = fx.fsa.separator();

    let mut target = fx.root.clone();
    target.append_with_separator(&fx.fsa.local_name(b"photo.jpg", &fx.root), false, sep);
    fs::write(fx.fsa.platform().to_native(&target), b"one").unwrap();

    let mut counter = 1;
    let mut candidate = target.insert_filename_counter(counter, sep);
    while fx.fsa.platform().to_native(&candidate).exists() {
        counter += 1;
        candidate = target.insert_filename_counter(counter, sep);
    }
    assert_eq!(candidate.leaf_name(sep).to_path(), "photo (1).jpg");
    assert_eq!(fx.root.is_containing_path_of(&candidate, sep), Some(fx.root.len() + 1));
}

#[test]
fn test_remote_names_sort_case_insensitively_on_ntfs() {
    let fx = setup();
    let order = RemoteNameOrder::new(fx.fsa.local_fs_type(&fx.root));

    let mut names = vec!["beta", "Alpha", "100%", "alpha2"];
    order.sort(&mut names);
    assert_eq!(names, vec!["100%", "Alpha", "alpha2", "beta"]);
}

#[test]
fn test_notifications_drain_after_debounce() {
    let fx = setup();
    let nodes = NodeTable::new();
    let clock = FixedClock::new(50);
    let queue = NotificationDeque::new();

    let notifier = fx.fsa.new_dir_notify(fx.root.clone(), LocalPath::from_path(".debris"));
    assert!(notifier.needs_full_rescan());

    let root_node = nodes.insert();
    for name in ["a.txt", "b.txt", "c.txt"] {
        notifier.notify(&queue, root_node, LocalPath::from_path(name), false, &clock);
    }

    assert!(fx.fsa.next_notification(&queue, &clock).is_none());
    clock.advance(fx.fsa.config().notify_delay_ds);

    let drained: Vec<String> = std::iter::from_fn(|| fx.fsa.next_notification(&queue, &clock))
        .filter_map(|n| n.live_node(&nodes).map(|_| n.path.to_path()))
        .collect();
    assert_eq!(drained, vec!["a.txt", "b.txt", "c.txt"]);
}
