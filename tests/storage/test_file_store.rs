use std::time::Duration;

use fabstir_vision_node::config::StorageConfig;
use fabstir_vision_node::storage::{sanitize_filename, FileStore};

fn store_with_age(max_age: Duration) -> (tempfile::TempDir, FileStore) {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        upload_dir: dir.path().join("uploads"),
        results_dir: dir.path().join("results"),
        max_file_age: max_age,
        sweep_interval: Duration::from_secs(300),
    };
    let store = FileStore::new(&config).unwrap();
    (dir, store)
}

#[test]
fn test_new_creates_both_directories() {
    let (dir, _store) = store_with_age(Duration::from_secs(3600));
    assert!(dir.path().join("uploads").is_dir());
    assert!(dir.path().join("results").is_dir());
}

#[test]
fn test_result_path_prefixes_detected() {
    let (_dir, store) = store_with_age(Duration::from_secs(3600));
    let path = store.result_path("photo.png");
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "detected_photo.png"
    );
}

#[test]
fn test_resolve_result_sanitizes_client_names() {
    let (dir, store) = store_with_age(Duration::from_secs(3600));
    let resolved = store.resolve_result("../../outside.jpg");
    assert!(resolved.starts_with(dir.path().join("results")));
    assert_eq!(
        resolved.file_name().unwrap().to_str().unwrap(),
        "outside.jpg"
    );
}

#[test]
fn test_sweep_removes_expired_files_in_both_dirs() {
    let (dir, store) = store_with_age(Duration::ZERO);
    store.save_upload("old.png", b"old").unwrap();
    std::fs::write(dir.path().join("results/detected_old.png"), b"old").unwrap();
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(store.sweep_expired(), 2);
    assert!(!dir.path().join("uploads/old.png").exists());
    assert!(!dir.path().join("results/detected_old.png").exists());
}

#[test]
fn test_sweep_is_a_noop_for_fresh_files() {
    let (dir, store) = store_with_age(Duration::from_secs(3600));
    store.save_upload("fresh.png", b"fresh").unwrap();
    assert_eq!(store.sweep_expired(), 0);
    assert!(dir.path().join("uploads/fresh.png").exists());
}

#[test]
fn test_sanitize_filename_examples() {
    assert_eq!(sanitize_filename("photo.png"), "photo.png");
    assert_eq!(sanitize_filename("../escape.png"), "escape.png");
    assert_eq!(sanitize_filename("my photo.png"), "my_photo.png");
    assert_eq!(sanitize_filename(""), "upload");
}
