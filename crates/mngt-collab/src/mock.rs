//! In-memory device collaborator used to make the process compositions and
//! engine mechanics testable. Not a real bdev/NVMe/L2P/P2L binding — see
//! this crate's module docs.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use parking_lot::Mutex;

use mngt_upgrade::{P2L_VERSION_0, P2lPage, P2lRegionAccess};

use crate::config::DeviceConfig;
use crate::error::CollaboratorError;
use crate::traits::{
    BandCollaborator, IoChannelCollaborator, L2pCollaborator, NvCacheCollaborator, P2lCollaborator,
    RelocationCollaborator, SelfTestCollaborator, SuperBlockCollaborator, TrimCollaborator, ZoneCollaborator,
};

/// How many P2L region entries the mock carries (see `new_with_p2l_region`).
const DEFAULT_P2L_ENTRIES: usize = 3;
const DEFAULT_P2L_BLOCKS: usize = 4;

pub struct MockFtlDevice {
    pub config: DeviceConfig,
    clean: Mutex<bool>,
    l2p: Mutex<HashMap<u64, u64>>,
    valid_map: Mutex<HashSet<u64>>,
    base_valid_count: Mutex<u64>,
    cache_valid_count: Mutex<u64>,
    p2l_pages: Mutex<Vec<P2lPage>>,
    p2l_num_entries: usize,
    io_channels: Mutex<u32>,
    stats_dumps: Mutex<u32>,
    unmap_retries_remaining: Mutex<u32>,
    base_blocks: Range<u64>,
    cache_blocks: Range<u64>,
}

impl MockFtlDevice {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            clean: Mutex::new(false),
            l2p: Mutex::new(HashMap::new()),
            valid_map: Mutex::new(HashSet::new()),
            base_valid_count: Mutex::new(0),
            cache_valid_count: Mutex::new(0),
            p2l_pages: Mutex::new(vec![P2lPage::zeroed(P2L_VERSION_0); DEFAULT_P2L_BLOCKS]),
            p2l_num_entries: DEFAULT_P2L_ENTRIES,
            io_channels: Mutex::new(0),
            stats_dumps: Mutex::new(0),
            unmap_retries_remaining: Mutex::new(0),
            base_blocks: 0..4096,
            cache_blocks: 4096..8192,
        }
    }

    // ---- test/demo helpers, not part of any collaborator contract --------

    pub fn set_clean_for_test(&self, clean: bool) {
        *self.clean.lock() = clean;
    }

    pub fn seed_l2p(&self, lba: u64, addr: u64, in_cache: bool) {
        self.l2p.lock().insert(lba, addr);
        self.valid_map.lock().insert(addr);
        if in_cache {
            *self.cache_valid_count.lock() += 1;
        } else {
            *self.base_valid_count.lock() += 1;
        }
    }

    /// Clears a valid-map bit without touching the L2P entry pointing at
    /// it, to manufacture an inconsistency for self-test tests.
    pub fn desync_valid_map_for_test(&self, addr: u64) {
        self.valid_map.lock().remove(&addr);
    }

    pub fn set_unmap_transient_retries(&self, retries: u32) {
        *self.unmap_retries_remaining.lock() = retries;
    }

    pub fn stats_dump_count(&self) -> u32 {
        *self.stats_dumps.lock()
    }

    pub fn io_channel_count(&self) -> u32 {
        *self.io_channels.lock()
    }
}

impl SuperBlockCollaborator for MockFtlDevice {
    fn open_base_bdev(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn close_base_bdev(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn open_cache_bdev(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn close_cache_bdev(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn init_super_block(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_super_block(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn init_memory_pool(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_memory_pool(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn init_layout(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn init_metadata(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_metadata(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn layout_dump(&self) -> bool {
        true
    }

    fn is_clean(&self) -> bool {
        *self.clean.lock()
    }

    fn set_dirty(&self) -> Result<(), CollaboratorError> {
        *self.clean.lock() = false;
        Ok(())
    }

    fn set_clean(&self) -> Result<(), CollaboratorError> {
        *self.clean.lock() = true;
        Ok(())
    }

    fn persist_super_block(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn persist_md(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn persist_md_fast(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn dump_stats(&self) -> Result<String, CollaboratorError> {
        *self.stats_dumps.lock() += 1;
        Ok(format!(
            "base_valid={} cache_valid={}",
            *self.base_valid_count.lock(),
            *self.cache_valid_count.lock()
        ))
    }

    fn finalize_init(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn fast_shdn(&self) -> bool {
        self.config.fast_shdn
    }
}

impl BandCollaborator for MockFtlDevice {
    fn init_bands(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_bands(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn init_band_md(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_band_md(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn decorate_bands(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn finalize_init_bands(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn persist_band_info(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn persist_band_md(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn restore_band_md(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

impl ZoneCollaborator for MockFtlDevice {
    fn init_zones(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

impl L2pCollaborator for MockFtlDevice {
    fn init_l2p(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_l2p(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn clear_l2p(&self) -> Result<(), CollaboratorError> {
        self.l2p.lock().clear();
        self.valid_map.lock().clear();
        *self.base_valid_count.lock() = 0;
        *self.cache_valid_count.lock() = 0;
        Ok(())
    }

    fn persist_l2p(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn restore_l2p(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn init_valid_map(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_valid_map(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn pin_l2p_range(&self, _lba_start: u64, _lba_end: u64) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn unpin_l2p_range(&self, _lba_start: u64, _lba_end: u64) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn update_l2p(&self, lba: u64, addr: u64) -> Result<(), CollaboratorError> {
        self.l2p.lock().insert(lba, addr);
        self.valid_map.lock().insert(addr);
        Ok(())
    }
}

impl P2lCollaborator for MockFtlDevice {
    fn init_p2l(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_p2l(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn wipe_p2l(&self) -> Result<(), CollaboratorError> {
        let mut pages = self.p2l_pages.lock();
        for page in pages.iter_mut() {
            *page = P2lPage::zeroed(P2L_VERSION_0);
        }
        Ok(())
    }

    fn restore_p2l(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn free_p2l_buffers(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

impl P2lRegionAccess for MockFtlDevice {
    fn num_entries(&self) -> usize {
        self.p2l_num_entries
    }

    fn current_blocks(&self) -> usize {
        self.p2l_pages.lock().len()
    }

    fn read_page(&self, index: usize) -> P2lPage {
        self.p2l_pages.lock()[index].clone()
    }

    fn write_page(&self, index: usize, page: P2lPage) {
        self.p2l_pages.lock()[index] = page;
    }
}

impl NvCacheCollaborator for MockFtlDevice {
    fn init_nv_cache(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_nv_cache(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn scrub_nv_cache(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn persist_nv_cache_metadata(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

impl RelocationCollaborator for MockFtlDevice {
    fn init_relocation(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_relocation(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

impl IoChannelCollaborator for MockFtlDevice {
    fn init_io_channel(&self) -> Result<(), CollaboratorError> {
        *self.io_channels.lock() += 1;
        Ok(())
    }

    fn deinit_io_channel(&self) -> Result<(), CollaboratorError> {
        let mut channels = self.io_channels.lock();
        *channels = channels.saturating_sub(1);
        Ok(())
    }

    fn start_task_core(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn stop_task_core(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

impl TrimCollaborator for MockFtlDevice {
    fn init_trim(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn deinit_trim(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn clear_trim(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn unmap(&self, lba: u64, num_blocks: u64) -> Result<(), CollaboratorError> {
        let mut remaining = self.unmap_retries_remaining.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(CollaboratorError::Transient);
        }
        for addr in lba..lba + num_blocks {
            if let Some(mapped) = self.l2p.lock().remove(&addr) {
                self.valid_map.lock().remove(&mapped);
            }
        }
        Ok(())
    }
}

impl SelfTestCollaborator for MockFtlDevice {
    fn base_block_range(&self) -> Range<u64> {
        self.base_blocks.clone()
    }

    fn cache_block_range(&self) -> Range<u64> {
        self.cache_blocks.clone()
    }

    fn l2p_get(&self, lba: u64) -> Option<u64> {
        self.l2p.lock().get(&lba).copied()
    }

    fn valid_map_is_set(&self, addr: u64) -> bool {
        self.valid_map.lock().contains(&addr)
    }

    fn valid_map_popcount(&self) -> u64 {
        self.valid_map.lock().len() as u64
    }
}
