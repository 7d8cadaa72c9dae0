mod common;

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use biggerfish::collector::{BatchOptions, Collector};
use biggerfish::store;
use common::{FakeBrowser, FixedSampler};

#[test]
fn pre_set_cancellation_attempts_nothing_and_reports_cancelled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut browser = FakeBrowser::new();
    let log = browser.log.clone();
    let sampler = FixedSampler { invalid: false };
    let cancel = AtomicBool::new(true);
    let targets = vec!["https://a.com".to_string(), "https://b.com".to_string()];

    let opts = BatchOptions {
        out_dir: dir.path().to_path_buf(),
        runs_per_target: 2,
        window: Duration::from_millis(5),
        single_shot: false,
        single_shot_cap: None,
    };
    let stats = Collector::new(&mut browser, &sampler, opts, &cancel, None)
        .run(&targets)
        .expect("batch");

    assert!(stats.cancelled);
    assert_eq!(stats.traces_collected, 0);
    assert_eq!(stats.targets_completed, 0);
    // The browser is still torn down cleanly.
    assert_eq!(log.calls(), vec!["quit"]);
    assert_eq!(store::count_records(dir.path(), "https://a.com").expect("count"), 0);
}
