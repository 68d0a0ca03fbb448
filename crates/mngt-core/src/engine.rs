//! Public entry points that allocate a process instance and a management
//! handle, and kick off the first dispatch. Also home to the re-entrancy
//! guard that rejects a step calling `execute`/`rollback` directly instead of
//! through `MngtHandle::call`/`call_rollback`.

use std::any::Any;
use std::cell::Cell;
use std::sync::Arc;

use crate::context::ProcessInstance;
use crate::descriptor::ProcessDescriptor;
use crate::dispatch::{CoreDispatch, OriginDispatch};
use crate::error::{EngineError, EngineResult};
use crate::handle::{CallerCb, MngtHandle};

thread_local! {
    static IN_STEP: Cell<bool> = const { Cell::new(false) };
}

/// Marks the dynamic extent of a step/cleanup body so a nested direct call to
/// `execute`/`rollback` from within it can be rejected; `call`/`call_rollback`
/// go through `execute_child`/`rollback_child`, which skip this check.
pub(crate) fn run_step_body(f: impl FnOnce()) {
    let was_in_step = IN_STEP.with(|c| c.replace(true));
    f();
    IN_STEP.with(|c| c.set(was_in_step));
}

fn check_not_recursive() -> EngineResult<()> {
    if IN_STEP.with(|c| c.get()) {
        Err(EngineError::RecursiveExecute)
    } else {
        Ok(())
    }
}

/// Start a management process's forward (action) pass.
///
/// Returns an error without dispatching anything if `desc` has neither steps
/// nor an error handler, or if called directly from within a running step
/// (use [`MngtHandle::call`] for nested processes instead).
pub fn execute<D: Send + Sync + 'static>(
    device: Arc<D>,
    desc: ProcessDescriptor<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    caller_ctx: Box<dyn Any + Send + Sync>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    check_not_recursive()?;
    execute_inner(device, desc, core, origin, caller_ctx, cb)
}

/// Start a management process's reverse (rollback-only) pass: only steps with
/// a `cleanup` are materialized, and they run in LIFO descriptor order.
pub fn rollback<D: Send + Sync + 'static>(
    device: Arc<D>,
    desc: ProcessDescriptor<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    caller_ctx: Box<dyn Any + Send + Sync>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    check_not_recursive()?;
    rollback_inner(device, desc, core, origin, caller_ctx, cb)
}

pub(crate) fn execute_child<D: Send + Sync + 'static>(
    device: Arc<D>,
    desc: ProcessDescriptor<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    caller_ctx: Box<dyn Any + Send + Sync>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    execute_inner(device, desc, core, origin, caller_ctx, cb)
}

pub(crate) fn rollback_child<D: Send + Sync + 'static>(
    device: Arc<D>,
    desc: ProcessDescriptor<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    caller_ctx: Box<dyn Any + Send + Sync>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    rollback_inner(device, desc, core, origin, caller_ctx, cb)
}

fn execute_inner<D: Send + Sync + 'static>(
    device: Arc<D>,
    desc: ProcessDescriptor<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    caller_ctx: Box<dyn Any + Send + Sync>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    if desc.steps.is_empty() && desc.error_handler.is_none() {
        return Err(EngineError::EmptyProcess(desc.name));
    }
    let process = ProcessInstance::for_execute(desc);
    let handle = MngtHandle::new(device, process, cb, caller_ctx, core, origin, false);
    handle.kickoff_action();
    Ok(())
}

fn rollback_inner<D: Send + Sync + 'static>(
    device: Arc<D>,
    desc: ProcessDescriptor<D>,
    core: Arc<dyn CoreDispatch>,
    origin: Arc<dyn OriginDispatch>,
    caller_ctx: Box<dyn Any + Send + Sync>,
    cb: CallerCb<D>,
) -> EngineResult<()> {
    if desc.steps.is_empty() {
        return Err(EngineError::EmptyProcess(desc.name));
    }
    let process = ProcessInstance::for_rollback(desc);
    let handle = MngtHandle::new(device, process, cb, caller_ctx, core, origin, true);
    handle.kickoff_rollback();
    Ok(())
}
