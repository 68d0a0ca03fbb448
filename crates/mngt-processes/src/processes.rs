//! The six concrete process compositions (spec.md §4.6 plus the supplemented
//! Check-configuration step and Recover process).

use std::sync::Arc;

use mngt_collab::{CollaboratorError, DeviceConfig, StartupMode};
use mngt_core::{MngtHandle, ProcessDescriptor, StepDescriptor, StepFn};
use mngt_upgrade::p2l_v0_to_v1_step;

use crate::device::FtlDevice;
use crate::steps::{simple_step, simple_step_fn, step_with_cleanup};

/// Rolls back Startup's own cleanup-bearing steps (closing bdevs, deiniting
/// bands/io-channel/metadata/nv-cache/valid-map/trim/reloc). Used both as
/// Startup's `error_handler` and as a literal last step in Shutdown, where it
/// tears the device fully down once everything has already been persisted.
///
/// Only the cleanup-bearing steps of `startup_process` are materialized for
/// a bare rollback call, so the `DeviceConfig` used to rebuild it here only
/// needs to be structurally valid, not a reflection of the device's own.
fn rollback_device<D: FtlDevice>() -> StepFn<D> {
    Arc::new(|h: Arc<MngtHandle<D>>| h.call_rollback(startup_process::<D>(DeviceConfig::default())))
}

/// **Startup**: open base bdev → open cache bdev → super-block init →
/// memory-pool init → init bands → init I/O channel → init zones → decorate
/// bands → init layout → init metadata → init NV cache → init valid map →
/// init trim → init band MD → init relocation → select-startup-mode.
pub fn startup_process<D: FtlDevice>(config: DeviceConfig) -> ProcessDescriptor<D> {
    let mode = config.startup_mode;
    let select_startup_mode: StepFn<D> = Arc::new(move |h: Arc<MngtHandle<D>>| match mode {
        StartupMode::Create => h.call(first_start_process()),
        StartupMode::Load => h.call(restore_process()),
    });

    ProcessDescriptor::new(
        "Startup",
        vec![
            StepDescriptor::new(
                "Check configuration",
                Arc::new(move |h: Arc<MngtHandle<D>>| match config.validate() {
                    Ok(()) => h.next_step(),
                    Err(error) => {
                        tracing::warn!(target: "mngt.processes", %error, "invalid device configuration");
                        h.fail_step();
                    }
                }),
            ),
            step_with_cleanup("open base bdev", |d| d.open_base_bdev(), "close base bdev", |d| d.close_base_bdev()),
            step_with_cleanup("open cache bdev", |d| d.open_cache_bdev(), "close cache bdev", |d| d.close_cache_bdev()),
            step_with_cleanup(
                "super-block init",
                |d| d.init_super_block(),
                "super-block deinit",
                |d| d.deinit_super_block(),
            ),
            step_with_cleanup(
                "memory-pool init",
                |d| d.init_memory_pool(),
                "memory-pool deinit",
                |d| d.deinit_memory_pool(),
            ),
            step_with_cleanup("init bands", |d| d.init_bands(), "deinit bands", |d| d.deinit_bands()),
            step_with_cleanup(
                "init I/O channel",
                |d| d.init_io_channel(),
                "deinit I/O channel",
                |d| d.deinit_io_channel(),
            ),
            simple_step("init zones", |d| d.init_zones()),
            simple_step("decorate bands", |d| d.decorate_bands()),
            simple_step("init layout", |d| d.init_layout()),
            step_with_cleanup("init metadata", |d| d.init_metadata(), "deinit metadata", |d| d.deinit_metadata()),
            step_with_cleanup("init NV cache", |d| d.init_nv_cache(), "deinit NV cache", |d| d.deinit_nv_cache()),
            step_with_cleanup(
                "init valid map",
                |d| d.init_valid_map(),
                "deinit valid map",
                |d| d.deinit_valid_map(),
            ),
            step_with_cleanup("init trim", |d| d.init_trim(), "deinit trim", |d| d.deinit_trim()),
            step_with_cleanup("init band MD", |d| d.init_band_md(), "deinit band MD", |d| d.deinit_band_md()),
            step_with_cleanup(
                "init relocation",
                |d| d.init_relocation(),
                "deinit relocation",
                |d| d.deinit_relocation(),
            ),
            StepDescriptor::new("select-startup-mode", select_startup_mode),
        ],
    )
    .with_error_handler(rollback_device())
}

/// **First-Start**: init L2P → clear L2P → scrub NV cache → finalize init
/// bands → persist band info → persist NV-cache metadata → P2L init → P2L
/// wipe → trim clear → free P2L buffers → set dirty → start task core →
/// finalize init.
pub fn first_start_process<D: FtlDevice>() -> ProcessDescriptor<D> {
    ProcessDescriptor::new(
        "First-Start",
        vec![
            simple_step("init L2P", |d| d.init_l2p()),
            simple_step("clear L2P", |d| d.clear_l2p()),
            simple_step("scrub NV cache", |d| d.scrub_nv_cache()),
            simple_step("finalize init bands", |d| d.finalize_init_bands()),
            simple_step("persist band info", |d| d.persist_band_info()),
            simple_step("persist NV-cache metadata", |d| d.persist_nv_cache_metadata()),
            simple_step("P2L init", |d| d.init_p2l()),
            simple_step("P2L wipe", |d| d.wipe_p2l()),
            simple_step("trim clear", |d| d.clear_trim()),
            simple_step("free P2L buffers", |d| d.free_p2l_buffers()),
            simple_step("set dirty", |d| d.set_dirty()),
            simple_step("start task core", |d| d.start_task_core()),
            simple_step("finalize init", |d| d.finalize_init()),
        ],
    )
}

/// **Restore**: branches to Clean-Start or Recover depending on whether the
/// super block reports a clean shutdown.
pub fn restore_process<D: FtlDevice>() -> ProcessDescriptor<D> {
    let branch: StepFn<D> = Arc::new(|h: Arc<MngtHandle<D>>| {
        let Some(device) = h.get_device() else {
            h.fail_step();
            return;
        };
        if device.is_clean() {
            h.call(clean_start_process());
        } else {
            h.call(recover_process());
        }
    });

    ProcessDescriptor::new("Restore", vec![StepDescriptor::new("select-restore-mode", branch)])
}

/// **Clean-Start**: restore MD → P2L init → P2L restore → init L2P →
/// restore L2P → finalize init bands → free P2L buffers → start task core →
/// self-test → set dirty → finalize init.
pub fn clean_start_process<D: FtlDevice>() -> ProcessDescriptor<D> {
    ProcessDescriptor::new(
        "Clean-Start",
        vec![
            simple_step("restore MD", |d| d.restore_band_md()),
            simple_step("P2L init", |d| d.init_p2l()),
            simple_step("P2L restore", |d| d.restore_p2l()),
            simple_step("init L2P", |d| d.init_l2p()),
            simple_step("restore L2P", |d| d.restore_l2p()),
            simple_step("finalize init bands", |d| d.finalize_init_bands()),
            simple_step("free P2L buffers", |d| d.free_p2l_buffers()),
            simple_step("start task core", |d| d.start_task_core()),
            StepDescriptor::new("self-test", crate::self_test::self_test_step()),
            simple_step("set dirty", |d| d.set_dirty()),
            simple_step("finalize init", |d| d.finalize_init()),
        ],
    )
}

/// **Recover**: structurally identical to Clean-Start in this crate's scope
/// (see `mngt-processes` module docs) but kept as its own named process so
/// the Restore branch is observable in the trace output.
pub fn recover_process<D: FtlDevice>() -> ProcessDescriptor<D> {
    ProcessDescriptor::new(
        "Recover",
        vec![
            simple_step("P2L init", |d| d.init_p2l()),
            simple_step("P2L restore", |d| d.restore_p2l()),
            simple_step("init L2P", |d| d.init_l2p()),
            simple_step("restore L2P", |d| d.restore_l2p()),
            simple_step("finalize init bands", |d| d.finalize_init_bands()),
            simple_step("free P2L buffers", |d| d.free_p2l_buffers()),
            simple_step("start task core", |d| d.start_task_core()),
            StepDescriptor::new("self-test", crate::self_test::self_test_step()),
            simple_step("set dirty", |d| d.set_dirty()),
            simple_step("finalize init", |d| d.finalize_init()),
        ],
    )
}

/// **Shutdown** (normal): stop task core → persist L2P → persist MD → set
/// clean → dump stats → deinit L2P → P2L deinit → rollback device. The fast
/// variant skips persisting L2P and carries no `error_handler` of its own.
pub fn shutdown_process<D: FtlDevice>(fast: bool) -> ProcessDescriptor<D> {
    let persist_md = if fast {
        simple_step("fast-persist MD", |d: &D| d.persist_md_fast())
    } else {
        simple_step("persist MD", |d: &D| d.persist_md())
    };

    let mut steps = vec![simple_step("stop task core", |d| d.stop_task_core())];
    if !fast {
        steps.push(simple_step("persist L2P", |d| d.persist_l2p()));
    }
    steps.push(persist_md);
    steps.push(simple_step("set clean", |d| d.set_clean()));
    steps.push(StepDescriptor::new(
        "dump stats",
        Arc::new(|h: Arc<MngtHandle<D>>| {
            let Some(device) = h.get_device() else {
                h.fail_step();
                return;
            };
            match device.dump_stats() {
                Ok(stats) => {
                    tracing::info!(target: "mngt.processes", %stats, "device stats");
                    h.next_step();
                }
                Err(error) => {
                    tracing::warn!(target: "mngt.processes", %error, "dump stats failed");
                    h.fail_step();
                }
            }
        }),
    ));
    steps.push(simple_step("deinit L2P", |d| d.deinit_l2p()));
    steps.push(simple_step("P2L deinit", |d| d.deinit_p2l()));
    steps.push(StepDescriptor::new("rollback device", rollback_device()));

    let desc = ProcessDescriptor::new(if fast { "Shutdown (fast)" } else { "Shutdown" }, steps);
    if fast { desc } else { desc.with_error_handler(rollback_device()) }
}

/// **Trim**: a single-step process invoking `unmap`, re-entering itself on
/// a transient result instead of treating it as a hard failure.
pub fn trim_process<D: FtlDevice>(lba: u64, num_blocks: u64) -> ProcessDescriptor<D> {
    let step: StepFn<D> = Arc::new(move |h: Arc<MngtHandle<D>>| {
        let Some(device) = h.get_device() else {
            h.fail_step();
            return;
        };
        match device.unmap(lba, num_blocks) {
            Ok(()) => h.next_step(),
            Err(CollaboratorError::Transient) => h.continue_step(),
            Err(error) => {
                tracing::warn!(target: "mngt.processes", %error, "unmap failed");
                h.fail_step();
            }
        }
    });

    ProcessDescriptor::new("Trim", vec![StepDescriptor::new("unmap", step)])
}

/// **Layout upgrade**: delegates to `mngt-upgrade`'s driver wired up with
/// the single P2L v0→v1 region upgrade this crate knows about.
pub fn layout_upgrade_process<D: FtlDevice>() -> ProcessDescriptor<D> {
    let table = vec![mngt_upgrade::RegionUpgradeDesc {
        region_name: "p2l",
        from_version: mngt_upgrade::P2L_VERSION_0,
        to_version: mngt_upgrade::P2L_VERSION_1,
        ctx_size_hint: 0,
        upgrade: p2l_v0_to_v1_step::<D>(),
    }];

    let source = |device: &Arc<D>| {
        for index in 0..device.num_entries() {
            let page = device.read_page(index);
            if page.version != mngt_upgrade::P2L_VERSION_1 {
                return mngt_upgrade::UpgradeOutcome::Continue(0);
            }
        }
        mngt_upgrade::UpgradeOutcome::Done
    };

    let validate = |device: &Arc<D>| device.layout_dump();

    let persist_super_block = simple_step_fn("persist_super_block", |d: &D| d.persist_super_block());

    mngt_upgrade::layout_upgrade_process(table, source, validate, persist_super_block)
}
