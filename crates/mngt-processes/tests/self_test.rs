use std::sync::Arc;

use mngt_collab::{DeviceConfig, MockFtlDevice};
use mngt_core::{CoreDispatch, CoreJob, OriginDispatch};
use mngt_processes::self_test;

struct Inline;

impl CoreDispatch for Inline {
    fn post_to_core(&self, job: CoreJob) {
        job();
    }
}

impl OriginDispatch for Inline {
    fn post_to_origin(&self, job: CoreJob) {
        job();
    }
}

#[test]
fn self_test_passes_on_consistent_device() {
    let device = Arc::new(MockFtlDevice::new(DeviceConfig::default()));
    device.seed_l2p(0, 100, false);
    device.seed_l2p(1, 4096 + 1, true);

    self_test(
        device,
        Arc::new(Inline),
        Arc::new(Inline),
        Box::new(|_dev, status| assert_eq!(status, 0)),
    )
    .unwrap();
}

#[test]
fn self_test_fails_on_valid_map_mismatch() {
    let device = Arc::new(MockFtlDevice::new(DeviceConfig::default()));
    device.seed_l2p(0, 100, false);
    device.desync_valid_map_for_test(100);

    self_test(
        device,
        Arc::new(Inline),
        Arc::new(Inline),
        Box::new(|_dev, status| assert_eq!(status, -1)),
    )
    .unwrap();
}
