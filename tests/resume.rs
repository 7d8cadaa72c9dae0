mod common;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use biggerfish::collector::{BatchOptions, Collector};
use biggerfish::store::{self, TargetStore};
use biggerfish::trace::{RunRecord, Trace};
use common::{FakeBrowser, FixedSampler};

fn batch(out_dir: &Path, runs: usize) -> BatchOptions {
    BatchOptions {
        out_dir: out_dir.to_path_buf(),
        runs_per_target: runs,
        window: Duration::from_millis(5),
        single_shot: false,
        single_shot_cap: None,
    }
}

fn seed_records(out_dir: &Path, target: &str, count: usize) {
    let mut store = TargetStore::open(out_dir, target).expect("open");
    for _ in 0..count {
        store
            .append(&RunRecord {
                trace: Trace::Samples(vec![7, 8, 9]),
                target: target.to_string(),
            })
            .expect("append");
    }
}

#[test]
fn target_at_full_quota_is_skipped_without_navigation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = "https://example.com";
    seed_records(dir.path(), target, 2);

    let mut browser = FakeBrowser::new();
    let log = browser.log.clone();
    let sampler = FixedSampler { invalid: false };
    let cancel = AtomicBool::new(false);

    let stats = Collector::new(&mut browser, &sampler, batch(dir.path(), 2), &cancel, None)
        .run(&[target.to_string()])
        .expect("batch");

    assert_eq!(stats.targets_skipped, 1);
    assert_eq!(stats.traces_collected, 0);
    // Only the end-of-batch teardown touches the browser.
    assert_eq!(log.calls(), vec!["quit"]);
    assert_eq!(store::count_records(dir.path(), target).expect("count"), 2);
}

#[test]
fn partial_target_is_topped_up_to_quota() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = "https://example.com";
    seed_records(dir.path(), target, 1);

    let mut browser = FakeBrowser::new();
    let log = browser.log.clone();
    let sampler = FixedSampler { invalid: false };
    let cancel = AtomicBool::new(false);

    let stats = Collector::new(&mut browser, &sampler, batch(dir.path(), 3), &cancel, None)
        .run(&[target.to_string()])
        .expect("batch");

    assert_eq!(stats.targets_completed, 1);
    assert_eq!(stats.traces_collected, 2);
    // Two remaining measured loads plus one priming load.
    assert_eq!(log.count_of(&format!("navigate {target}")), 3);
    assert_eq!(store::count_records(dir.path(), target).expect("count"), 3);
}

#[test]
fn seeded_records_survive_the_resumed_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = "https://example.com";
    seed_records(dir.path(), target, 1);

    let mut browser = FakeBrowser::new();
    let sampler = FixedSampler { invalid: false };
    let cancel = AtomicBool::new(false);

    Collector::new(&mut browser, &sampler, batch(dir.path(), 2), &cancel, None)
        .run(&[target.to_string()])
        .expect("batch");

    let records = store::read_records(dir.path(), target).expect("read");
    assert_eq!(records.len(), 2);
    // The seeded record is still the first line; resumption appends.
    assert_eq!(records[0].trace, Trace::Samples(vec![7, 8, 9]));
    assert_eq!(records[1].trace, Trace::Samples(vec![1, 2, 3]));
}
