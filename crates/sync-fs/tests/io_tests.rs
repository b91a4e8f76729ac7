use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use sync_fs::io::{self, RobustnessConfig};
use tempfile::tempdir;

#[test]
fn test_write_atomic_without_fsync() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let config = RobustnessConfig {
        enable_fsync: false,
        ..RobustnessConfig::default()
    };

    io::write_atomic(&path, b"{}", config).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn test_concurrent_writes_leave_one_complete_version() {
    let dir = tempdir().unwrap();
    let path = Arc::new(dir.path().join("concurrent.txt"));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let config = RobustnessConfig {
        lock_timeout: Duration::from_secs(5),
        enable_fsync: false,
    };

    let handles: Vec<_> = (0..threads)
        .map(|id| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..10 {
                    // Writers racing on the same temp name may lose; corruption is the failure.
                    let content = format!("thread{id}:write{i}");
                    let _ = io::write_atomic(&path, content.as_bytes(), config);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let content = fs::read_to_string(path.as_path()).unwrap();
    assert!(content.starts_with("thread"), "unexpected content: {content}");
    assert!(content.contains(":write"));
}
