//! One trait per subsystem collaborator row. A step body calls exactly one
//! method on exactly one of these; synchronous collaborators return their
//! result immediately, async ones would register the step's completion as
//! their I/O callback (the mock in this crate is fully synchronous).

use std::ops::Range;

use crate::error::CollaboratorError;

/// Whole-device lifecycle: opening the backing media, the super-block
/// codec, and the layout/metadata it governs.
pub trait SuperBlockCollaborator {
    fn open_base_bdev(&self) -> Result<(), CollaboratorError>;
    fn close_base_bdev(&self) -> Result<(), CollaboratorError>;
    fn open_cache_bdev(&self) -> Result<(), CollaboratorError>;
    fn close_cache_bdev(&self) -> Result<(), CollaboratorError>;
    fn init_super_block(&self) -> Result<(), CollaboratorError>;
    fn deinit_super_block(&self) -> Result<(), CollaboratorError>;
    fn init_memory_pool(&self) -> Result<(), CollaboratorError>;
    fn deinit_memory_pool(&self) -> Result<(), CollaboratorError>;
    fn init_layout(&self) -> Result<(), CollaboratorError>;
    fn init_metadata(&self) -> Result<(), CollaboratorError>;
    fn deinit_metadata(&self) -> Result<(), CollaboratorError>;
    /// Validate the current layout; `false` fails the calling step.
    fn layout_dump(&self) -> bool;
    fn is_clean(&self) -> bool;
    fn set_dirty(&self) -> Result<(), CollaboratorError>;
    fn set_clean(&self) -> Result<(), CollaboratorError>;
    fn persist_super_block(&self) -> Result<(), CollaboratorError>;
    fn persist_md(&self) -> Result<(), CollaboratorError>;
    fn persist_md_fast(&self) -> Result<(), CollaboratorError>;
    fn dump_stats(&self) -> Result<String, CollaboratorError>;
    fn finalize_init(&self) -> Result<(), CollaboratorError>;
    /// Whether Shutdown should take the fast path, per device config.
    fn fast_shdn(&self) -> bool;
}

pub trait BandCollaborator {
    fn init_bands(&self) -> Result<(), CollaboratorError>;
    fn deinit_bands(&self) -> Result<(), CollaboratorError>;
    fn init_band_md(&self) -> Result<(), CollaboratorError>;
    fn deinit_band_md(&self) -> Result<(), CollaboratorError>;
    fn decorate_bands(&self) -> Result<(), CollaboratorError>;
    fn finalize_init_bands(&self) -> Result<(), CollaboratorError>;
    fn persist_band_info(&self) -> Result<(), CollaboratorError>;
    fn persist_band_md(&self) -> Result<(), CollaboratorError>;
    fn restore_band_md(&self) -> Result<(), CollaboratorError>;
}

pub trait ZoneCollaborator {
    fn init_zones(&self) -> Result<(), CollaboratorError>;
}

pub trait L2pCollaborator {
    fn init_l2p(&self) -> Result<(), CollaboratorError>;
    fn deinit_l2p(&self) -> Result<(), CollaboratorError>;
    fn clear_l2p(&self) -> Result<(), CollaboratorError>;
    fn persist_l2p(&self) -> Result<(), CollaboratorError>;
    fn restore_l2p(&self) -> Result<(), CollaboratorError>;
    /// Allocates the authoritative valid-map bitmap the self-test walk
    /// cross-checks L2P against.
    fn init_valid_map(&self) -> Result<(), CollaboratorError>;
    fn deinit_valid_map(&self) -> Result<(), CollaboratorError>;
    fn pin_l2p_range(&self, lba_start: u64, lba_end: u64) -> Result<(), CollaboratorError>;
    fn unpin_l2p_range(&self, lba_start: u64, lba_end: u64) -> Result<(), CollaboratorError>;
    /// Repoint a single LBA at a new physical address, e.g. after a relocation.
    fn update_l2p(&self, lba: u64, addr: u64) -> Result<(), CollaboratorError>;
}

pub trait P2lCollaborator {
    fn init_p2l(&self) -> Result<(), CollaboratorError>;
    fn deinit_p2l(&self) -> Result<(), CollaboratorError>;
    fn wipe_p2l(&self) -> Result<(), CollaboratorError>;
    fn restore_p2l(&self) -> Result<(), CollaboratorError>;
    fn free_p2l_buffers(&self) -> Result<(), CollaboratorError>;
}

pub trait NvCacheCollaborator {
    fn init_nv_cache(&self) -> Result<(), CollaboratorError>;
    fn deinit_nv_cache(&self) -> Result<(), CollaboratorError>;
    fn scrub_nv_cache(&self) -> Result<(), CollaboratorError>;
    fn persist_nv_cache_metadata(&self) -> Result<(), CollaboratorError>;
}

pub trait RelocationCollaborator {
    fn init_relocation(&self) -> Result<(), CollaboratorError>;
    fn deinit_relocation(&self) -> Result<(), CollaboratorError>;
}

pub trait IoChannelCollaborator {
    fn init_io_channel(&self) -> Result<(), CollaboratorError>;
    /// Deregister a per-core I/O channel. Errs if none are registered, so a
    /// cleanup path can never drive the count negative.
    fn deinit_io_channel(&self) -> Result<(), CollaboratorError>;
    fn start_task_core(&self) -> Result<(), CollaboratorError>;
    fn stop_task_core(&self) -> Result<(), CollaboratorError>;
}

pub trait TrimCollaborator {
    fn init_trim(&self) -> Result<(), CollaboratorError>;
    fn deinit_trim(&self) -> Result<(), CollaboratorError>;
    fn clear_trim(&self) -> Result<(), CollaboratorError>;
    /// `Err(CollaboratorError::Transient)` means the caller should re-enter
    /// the step and try again rather than treat this as a hard failure.
    fn unmap(&self, lba: u64, num_blocks: u64) -> Result<(), CollaboratorError>;
}

/// L2P-vs-valid-map consistency walk (spec.md §4.5).
pub trait SelfTestCollaborator {
    fn base_block_range(&self) -> Range<u64>;
    fn cache_block_range(&self) -> Range<u64>;
    fn l2p_get(&self, lba: u64) -> Option<u64>;
    fn valid_map_is_set(&self, addr: u64) -> bool;
    fn valid_map_popcount(&self) -> u64;
}
