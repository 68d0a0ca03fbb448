//! Helper constructors shared by every concrete process composition: the
//! repetitive "call one collaborator method, translate its `Result` into
//! `next_step`/`fail_step`" adapter shape.

use std::sync::Arc;

use mngt_collab::CollaboratorError;
use mngt_core::{MngtHandle, StepDescriptor, StepFn};

use crate::device::FtlDevice;

/// A step whose body calls exactly one collaborator method and advances or
/// fails based on its result.
pub fn simple_step<D, F>(name: &'static str, action: F) -> StepDescriptor<D>
where
    D: FtlDevice,
    F: Fn(&D) -> Result<(), CollaboratorError> + Send + Sync + 'static,
{
    StepDescriptor::new(name, simple_step_fn(name, action))
}

pub fn simple_step_fn<D, F>(name: &'static str, action: F) -> StepFn<D>
where
    D: FtlDevice,
    F: Fn(&D) -> Result<(), CollaboratorError> + Send + Sync + 'static,
{
    Arc::new(move |h: Arc<MngtHandle<D>>| {
        let Some(device) = h.get_device() else {
            h.fail_step();
            return;
        };
        match action(&device) {
            Ok(()) => h.next_step(),
            Err(error) => {
                tracing::warn!(target: "mngt.processes", step = name, %error, "step failed");
                h.fail_step();
            }
        }
    })
}

/// Same as [`simple_step`] but also registers a cleanup run on rollback.
pub fn step_with_cleanup<D, F, C>(name: &'static str, action: F, cleanup_name: &'static str, cleanup: C) -> StepDescriptor<D>
where
    D: FtlDevice,
    F: Fn(&D) -> Result<(), CollaboratorError> + Send + Sync + 'static,
    C: Fn(&D) -> Result<(), CollaboratorError> + Send + Sync + 'static,
{
    simple_step(name, action).with_cleanup(simple_step_fn(cleanup_name, cleanup))
}
