//! Scenario (f): P2L v0 -> v1 upgrade over a region of 3 entries plus one
//! padding block, with entries 0 and 2 at v0 and entry 1 already at v1.

use std::sync::Arc;

use parking_lot::Mutex;

use mngt_core::{CoreDispatch, CoreJob, MngtHandle, OriginDispatch, ProcessDescriptor, StepDescriptor, execute};
use mngt_upgrade::{P2L_VERSION_0, P2L_VERSION_1, P2lPage, P2lRegionAccess, p2l_v0_to_v1_step};

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

struct Region {
    pages: Mutex<Vec<P2lPage>>,
    reads: Mutex<Vec<usize>>,
    writes: Mutex<Vec<usize>>,
}

impl Region {
    /// 3 live entries (0, 2 at v0; 1 at v1) plus 1 padding block.
    fn new() -> Self {
        let pages = vec![
            P2lPage { version: P2L_VERSION_0, payload: vec![1u8; mngt_upgrade::P2L_PAGE_PAYLOAD_LEN], checksum: 0 },
            P2lPage { version: P2L_VERSION_1, payload: vec![2u8; mngt_upgrade::P2L_PAGE_PAYLOAD_LEN], checksum: 0 },
            P2lPage { version: P2L_VERSION_0, payload: vec![3u8; mngt_upgrade::P2L_PAGE_PAYLOAD_LEN], checksum: 0 },
            P2lPage::zeroed(P2L_VERSION_0),
        ];
        Self { pages: Mutex::new(pages), reads: Mutex::new(Vec::new()), writes: Mutex::new(Vec::new()) }
    }
}

impl P2lRegionAccess for Region {
    fn num_entries(&self) -> usize {
        3
    }

    fn current_blocks(&self) -> usize {
        4
    }

    fn read_page(&self, index: usize) -> P2lPage {
        self.reads.lock().push(index);
        self.pages.lock()[index].clone()
    }

    fn write_page(&self, index: usize, page: P2lPage) {
        self.writes.lock().push(index);
        self.pages.lock()[index] = page;
    }
}

#[test]
fn p2l_region_upgrades_v0_entries_and_pads_with_v1() {
    let device = Arc::new(Region::new());
    let desc = ProcessDescriptor::new(
        "P2L upgrade",
        vec![StepDescriptor::new("p2l_v0_to_v1", p2l_v0_to_v1_step::<Region>())],
    );

    execute(
        device.clone(),
        desc,
        Arc::new(Inline),
        Arc::new(Inline),
        Box::new(()),
        Box::new(|_dev, status| assert_eq!(status, 0)),
    )
    .unwrap();

    assert_eq!(*device.reads.lock(), vec![0, 1, 2]);
    assert_eq!(*device.writes.lock(), vec![0, 2, 3]);

    let pages = device.pages.lock();
    for (index, page) in pages.iter().enumerate() {
        assert_eq!(page.version, P2L_VERSION_1, "index {index} not upgraded");
    }

    let expected_0 = crc32c::crc32c(&vec![1u8; mngt_upgrade::P2L_PAGE_PAYLOAD_LEN]);
    let expected_2 = crc32c::crc32c(&vec![3u8; mngt_upgrade::P2L_PAGE_PAYLOAD_LEN]);
    assert_eq!(pages[0].checksum, expected_0);
    assert_eq!(pages[2].checksum, expected_2);
}
