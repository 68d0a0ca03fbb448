//! The concrete P2L region upgrade: version 0 (no checksum) to version 1
//! (CRC32C-stamped) pages, one page per block.

use std::sync::Arc;

use mngt_core::{MngtHandle, StepFn};

/// Payload length of a single P2L page. Stands in for the source's
/// `FTL_NUM_LBA_IN_BLOCK * sizeof(struct ftl_lba_map_entry)`.
pub const P2L_PAGE_PAYLOAD_LEN: usize = 4096;

pub const P2L_VERSION_0: u8 = 0;
pub const P2L_VERSION_1: u8 = 1;

/// One on-media P2L page: a version tag, its opaque mapping payload, and the
/// CRC32C of that payload stamped into the page's out-of-band metadata.
#[derive(Clone)]
pub struct P2lPage {
    pub version: u8,
    pub payload: Vec<u8>,
    pub checksum: u32,
}

impl P2lPage {
    pub fn zeroed(version: u8) -> Self {
        Self { version, payload: vec![0u8; P2L_PAGE_PAYLOAD_LEN], checksum: 0 }
    }
}

/// What a device must expose for the v0→v1 P2L upgrade to run against it.
/// Implemented by the collaborator-side mock device; kept independent of it
/// here so this crate stays generic over any conforming `D`.
pub trait P2lRegionAccess {
    /// Number of in-use P2L entries (one page each) before the region's
    /// trailing padding blocks.
    fn num_entries(&self) -> usize;
    /// Total number of blocks reserved for the region, including padding.
    fn current_blocks(&self) -> usize;
    fn read_page(&self, index: usize) -> P2lPage;
    fn write_page(&self, index: usize, page: P2lPage);
}

/// Build the step body that upgrades one P2L region from version 0 to 1.
pub fn p2l_v0_to_v1_step<D>() -> StepFn<D>
where
    D: P2lRegionAccess + Send + Sync + 'static,
{
    Arc::new(move |h: Arc<MngtHandle<D>>| {
        let Some(device) = h.get_device() else {
            h.fail_step();
            return;
        };

        let num_entries = device.num_entries();
        let total_blocks = device.current_blocks();

        for index in 0..num_entries {
            let page = device.read_page(index);
            if page.version == P2L_VERSION_1 {
                continue;
            }
            let checksum = crc32c::crc32c(&page.payload);
            tracing::debug!(target: "mngt.upgrade", index, checksum, "stamping p2l page");
            device.write_page(index, P2lPage { version: P2L_VERSION_1, payload: page.payload, checksum });
        }

        for index in num_entries..total_blocks {
            device.write_page(index, P2lPage::zeroed(P2L_VERSION_1));
        }

        h.next_step();
    })
}
