//! Public entry points: one function per externally-triggerable management
//! process, hiding the concrete `ProcessDescriptor` construction from
//! callers (the binary in `mngtd` only ever calls these).

use std::any::Any;
use std::sync::Arc;

use mngt_collab::DeviceConfig;
use mngt_core::{CallerCb, CoreDispatch, EngineResult, OriginDispatch, ProcessDescriptor, StepDescriptor, execute};

use crate::device::FtlDevice;
use crate::processes;

pub fn startup<D: FtlDevice>(
    device: Arc<D>,
    config: DeviceConfig,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    execute(device, processes::startup_process(config), core, origin, empty_ctx(), cb)
}

pub fn shutdown<D: FtlDevice>(
    device: Arc<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    let fast = device.fast_shdn();
    execute(device, processes::shutdown_process(fast), core, origin, empty_ctx(), cb)
}

pub fn unmap<D: FtlDevice>(
    device: Arc<D>,
    lba: u64,
    num_blocks: u64,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    execute(device, processes::trim_process(lba, num_blocks), core, origin, empty_ctx(), cb)
}

pub fn layout_upgrade<D: FtlDevice>(
    device: Arc<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    execute(device, processes::layout_upgrade_process(), core, origin, empty_ctx(), cb)
}

pub fn self_test<D: FtlDevice>(
    device: Arc<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    let desc: ProcessDescriptor<D> = ProcessDescriptor::new(
        "Self-Test",
        vec![StepDescriptor::new("self-test", crate::self_test::self_test_step())],
    );
    execute(device, desc, core, origin, empty_ctx(), cb)
}

pub fn layout_verify<D: FtlDevice>(
    device: Arc<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    let desc: ProcessDescriptor<D> = ProcessDescriptor::new(
        "Layout verify",
        vec![crate::steps::simple_step("layout_dump", |d: &D| {
            if d.layout_dump() {
                Ok(())
            } else {
                Err(mngt_collab::CollaboratorError::InvalidConfig("layout failed verification".into()))
            }
        })],
    );
    execute(device, desc, core, origin, empty_ctx(), cb)
}

fn empty_ctx() -> Box<dyn Any + Send + Sync> {
    Box::new(())
}
