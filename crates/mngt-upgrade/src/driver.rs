//! The layout-upgrade driver: one step that walks on-media regions by
//! version, dispatching one child process per region via `call_continuing`
//! so each iteration re-enters the same step instead of advancing past it.

use std::sync::Arc;

use mngt_core::{MngtHandle, ProcessDescriptor, StepDescriptor, StepFn};

use crate::desc::RegionUpgradeDesc;

/// What `upgrade_ctx_init` reports back to the driver step each time it is
/// (re-)entered.
pub enum UpgradeOutcome {
    /// The region at this index in the caller-supplied table still needs
    /// upgrading.
    Continue(usize),
    /// No region needs upgrading anymore.
    Done,
    /// The device's on-media state can't be upgraded (unrecognized/corrupt).
    Fault,
}

/// Build the single-step layout-upgrade process described in spec.md §4.4.
///
/// `source` is called once per (re-)entry of the driver step and decides
/// which region (if any) still needs upgrading; `validate` is consulted once
/// `source` reports `Done`, to confirm the resulting layout is fully valid.
pub fn layout_upgrade_process<D: Send + Sync + 'static>(
    table: Vec<RegionUpgradeDesc<D>>,
    source: impl Fn(&Arc<D>) -> UpgradeOutcome + Send + Sync + 'static,
    validate: impl Fn(&Arc<D>) -> bool + Send + Sync + 'static,
    persist_super_block: StepFn<D>,
) -> ProcessDescriptor<D> {
    let table: Arc<[RegionUpgradeDesc<D>]> = table.into();

    let step: StepFn<D> = Arc::new(move |h: Arc<MngtHandle<D>>| {
        let Some(device) = h.get_device() else {
            h.fail_step();
            return;
        };
        match source(&device) {
            UpgradeOutcome::Continue(index) => {
                let Some(region) = table.get(index) else {
                    tracing::error!(target: "mngt.upgrade", index, "no descriptor for region index");
                    h.fail_step();
                    return;
                };
                let child = region_upgrade_process(region.clone(), persist_super_block.clone());
                h.call_continuing(child);
            }
            UpgradeOutcome::Done => {
                if validate(&device) {
                    h.next_step();
                } else {
                    tracing::error!(target: "mngt.upgrade", "layout invalid after upgrade pass completed");
                    h.fail_step();
                }
            }
            UpgradeOutcome::Fault => {
                tracing::error!(target: "mngt.upgrade", "upgrade_ctx_init reported a fault");
                h.fail_step();
            }
        }
    });

    ProcessDescriptor::new("Layout upgrade", vec![StepDescriptor::new("layout_upgrade_step", step)])
}

fn region_upgrade_process<D: Send + Sync + 'static>(
    region: RegionUpgradeDesc<D>,
    persist_super_block: StepFn<D>,
) -> ProcessDescriptor<D> {
    ProcessDescriptor::new(
        "Region upgrade",
        vec![
            StepDescriptor::new(region.region_name, region.upgrade),
            StepDescriptor::new("persist_super_block", persist_super_block),
        ],
    )
}
