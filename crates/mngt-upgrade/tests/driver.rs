//! Driver-level test: layout_upgrade_process walks a table of two regions
//! and persists a super block after each, re-entering the driver step via
//! `call_continuing` until `upgrade_ctx_init` reports `Done`.

use std::sync::Arc;

use parking_lot::Mutex;

use mngt_core::{CoreDispatch, CoreJob, MngtHandle, OriginDispatch, execute};
use mngt_upgrade::{RegionUpgradeDesc, UpgradeOutcome, layout_upgrade_process};

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

struct Device {
    order: Mutex<Vec<&'static str>>,
    next_region: Mutex<usize>,
}

#[test]
fn driver_visits_every_region_then_persists_and_validates() {
    let device = Arc::new(Device { order: Mutex::new(Vec::new()), next_region: Mutex::new(0) });

    let table = vec![
        RegionUpgradeDesc {
            region_name: "region_a",
            from_version: 0,
            to_version: 1,
            ctx_size_hint: 0,
            upgrade: Arc::new(|h: Arc<MngtHandle<Device>>| {
                let device = h.get_device().unwrap();
                device.order.lock().push("region_a");
                h.next_step();
            }),
        },
        RegionUpgradeDesc {
            region_name: "region_b",
            from_version: 0,
            to_version: 1,
            ctx_size_hint: 0,
            upgrade: Arc::new(|h: Arc<MngtHandle<Device>>| {
                let device = h.get_device().unwrap();
                device.order.lock().push("region_b");
                h.next_step();
            }),
        },
    ];

    let source = |device: &Arc<Device>| {
        let mut next = device.next_region.lock();
        if *next >= 2 {
            return UpgradeOutcome::Done;
        }
        let outcome = UpgradeOutcome::Continue(*next);
        *next += 1;
        outcome
    };

    let validate = |device: &Arc<Device>| device.order.lock().len() == 2;

    let persist_super_block: mngt_core::StepFn<Device> = Arc::new(|h: Arc<MngtHandle<Device>>| {
        let device = h.get_device().unwrap();
        device.order.lock().push("persist_super_block");
        h.next_step();
    });

    let desc = layout_upgrade_process(table, source, validate, persist_super_block);

    execute(
        device.clone(),
        desc,
        Arc::new(Inline),
        Arc::new(Inline),
        Box::new(()),
        Box::new(|_dev, status| assert_eq!(status, 0)),
    )
    .unwrap();

    assert_eq!(
        *device.order.lock(),
        vec!["region_a", "persist_super_block", "region_b", "persist_super_block"]
    );
}
