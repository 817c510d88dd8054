//! Relocation on trigger: collision safety and failure handling.

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use common::{RecordingSink, test_tuning, wait_until};
use dropwatch::{TaskProfile, WatchConfig, WatchRegistry};
use tempfile::TempDir;

// Scenario B: the destination name is taken; the existing file stays
// untouched and the newcomer lands under a suffixed name.
#[tokio::test(flavor = "multi_thread")]
async fn existing_destination_is_never_overwritten() {
    let w1 = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sink = RecordingSink::new();
    let registry = WatchRegistry::with_config(sink.clone(), test_tuning());

    let profile = TaskProfile::new("shots", true);
    profile.set_relocate(true);
    let config = WatchConfig::with_target(w1.path(), out.path());
    registry.add_watch(&config, &profile).unwrap();

    fs::write(out.path().join("a.png"), b"existing").unwrap();
    fs::write(w1.path().join("a.png"), b"fresh").unwrap();

    assert!(wait_until(Duration::from_secs(5), || sink.len() == 1).await);

    let dispatched = &sink.paths()[0];
    assert_eq!(*dispatched, out.path().join("a_1.png"));
    assert_eq!(fs::read(out.path().join("a.png")).unwrap(), b"existing");
    assert_eq!(fs::read(dispatched).unwrap(), b"fresh");
    assert!(!w1.path().join("a.png").exists());

    registry.shutdown_all();
}

// P4: two same-named files from different watches land as two distinct
// files in the shared destination.
#[tokio::test(flavor = "multi_thread")]
async fn colliding_relocations_yield_distinct_files() {
    let w1 = TempDir::new().unwrap();
    let w2 = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sink = RecordingSink::new();
    let registry = WatchRegistry::with_config(sink.clone(), test_tuning());

    let profile = TaskProfile::new("shots", true);
    profile.set_relocate(true);
    let c1 = WatchConfig::with_target(w1.path(), out.path());
    let c2 = WatchConfig::with_target(w2.path(), out.path());
    registry.add_watch(&c1, &profile).unwrap();
    registry.add_watch(&c2, &profile).unwrap();

    fs::write(w1.path().join("a.png"), b"one").unwrap();
    fs::write(w2.path().join("a.png"), b"two").unwrap();

    assert!(wait_until(Duration::from_secs(5), || sink.len() == 2).await);

    let mut dispatched = sink.paths();
    dispatched.sort();
    assert_eq!(
        dispatched,
        vec![out.path().join("a.png"), out.path().join("a_1.png")]
    );

    let mut contents = vec![
        fs::read(out.path().join("a.png")).unwrap(),
        fs::read(out.path().join("a_1.png")).unwrap(),
    ];
    contents.sort();
    assert_eq!(contents, vec![b"one".to_vec(), b"two".to_vec()]);

    registry.shutdown_all();
}

// A failed move abandons the trigger: no dispatch, source file untouched.
#[tokio::test(flavor = "multi_thread")]
async fn failed_relocation_abandons_the_trigger() {
    let w1 = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    // The target path exists as a file, so the destination directory can
    // never be created and every move fails.
    let bogus_target = root.path().join("out");
    fs::write(&bogus_target, b"not a directory").unwrap();

    let sink = RecordingSink::new();
    let registry = WatchRegistry::with_config(sink.clone(), test_tuning());

    let profile = TaskProfile::new("shots", true);
    profile.set_relocate(true);
    let config = WatchConfig::with_target(w1.path(), &bogus_target);
    registry.add_watch(&config, &profile).unwrap();

    fs::write(w1.path().join("a.png"), b"pixels").unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(sink.len(), 0);
    assert!(w1.path().join("a.png").exists());

    registry.shutdown_all();
}

// The relocation flag is read fresh at trigger time, not cached at entry
// construction.
#[tokio::test(flavor = "multi_thread")]
async fn relocation_flag_is_read_at_trigger_time() {
    let w1 = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sink = RecordingSink::new();
    let registry = WatchRegistry::with_config(sink.clone(), test_tuning());

    // Relocation off at entry creation.
    let profile = TaskProfile::new("shots", true);
    let config = WatchConfig::with_target(w1.path(), out.path());
    registry.add_watch(&config, &profile).unwrap();

    fs::write(w1.path().join("a.png"), b"first").unwrap();
    assert!(wait_until(Duration::from_secs(5), || sink.len() == 1).await);
    assert_eq!(sink.paths()[0], w1.path().join("a.png"));

    // Flip the flag on the live profile; the next trigger relocates.
    profile.set_relocate(true);

    fs::write(w1.path().join("b.png"), b"second").unwrap();
    assert!(wait_until(Duration::from_secs(5), || sink.len() == 2).await);
    assert_eq!(sink.paths()[1], out.path().join("b.png"));
    assert!(!w1.path().join("b.png").exists());

    registry.shutdown_all();
}
