//! Immutable, table-resident descriptors for steps and processes.
//!
//! A [`StepDescriptor`] pairs a forward action with an optional cleanup; the
//! presence of `cleanup` alone is what qualifies a step to appear on the
//! rollback queue (see `ProcessDescriptor` invariant 2 in the data model).

use std::sync::Arc;

use crate::handle::MngtHandle;

/// A step or cleanup body. Runs on the device's core thread. Must terminate
/// by calling one of the step-facing completion methods on `handle`
/// (`next_step`, `skip_step`, `fail_step`, `continue_step`, `call`,
/// `call_rollback`) — possibly after returning without calling any of them,
/// if it has outstanding asynchronous work whose completion will invoke the
/// continuation later.
pub type StepFn<D> = Arc<dyn Fn(Arc<MngtHandle<D>>) + Send + Sync>;

/// Descriptor for a single management step.
#[derive(Clone)]
pub struct StepDescriptor<D> {
    pub name: &'static str,
    /// Documented size hint for the step's context buffer; unlike the source
    /// this is not load-bearing since the context is a `Box<dyn Any + Send>`
    /// allocated lazily by the step itself via `alloc_step_ctx`.
    pub arg_size_hint: usize,
    pub action: StepFn<D>,
    pub cleanup: Option<StepFn<D>>,
}

impl<D> StepDescriptor<D> {
    pub fn new(name: &'static str, action: StepFn<D>) -> Self {
        Self {
            name,
            arg_size_hint: 0,
            action,
            cleanup: None,
        }
    }

    pub fn with_cleanup(mut self, cleanup: StepFn<D>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    pub fn with_arg_size_hint(mut self, size: usize) -> Self {
        self.arg_size_hint = size;
        self
    }
}

/// Descriptor for an ordered composition of steps plus an optional
/// whole-process error handler.
#[derive(Clone)]
pub struct ProcessDescriptor<D> {
    pub name: &'static str,
    pub error_handler: Option<StepFn<D>>,
    pub steps: Arc<[StepDescriptor<D>]>,
}

impl<D> ProcessDescriptor<D> {
    pub fn new(name: &'static str, steps: Vec<StepDescriptor<D>>) -> Self {
        Self {
            name,
            error_handler: None,
            steps: steps.into(),
        }
    }

    pub fn with_error_handler(mut self, handler: StepFn<D>) -> Self {
        self.error_handler = Some(handler);
        self
    }
}
