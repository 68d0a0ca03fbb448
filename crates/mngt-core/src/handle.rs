//! The management handle: the object every action/cleanup body receives.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::context::{ProcessInstance, StepInstance};
use crate::descriptor::ProcessDescriptor;
use crate::dispatch::{CoreDispatch, OriginDispatch};
use crate::trace::TraceLog;

/// Completion callback delivered to the caller of `execute`/`rollback`. The
/// device is `None` if a step cleared it via [`MngtHandle::clear_device`]
/// before the process finished.
pub type CallerCb<D> = Box<dyn FnOnce(Option<Arc<D>>, i32) + Send>;

type AnyCtx = Box<dyn Any + Send + Sync>;

/// The object passed to every action/cleanup body. Shared via `Arc` because
/// asynchronous collaborator completions (arriving from I/O channel threads)
/// need to reach back into it from outside the core thread.
pub struct MngtHandle<D> {
    device: Mutex<Option<Arc<D>>>,
    status: Mutex<i32>,
    rollback_flag: AtomicBool,
    continuing: AtomicBool,
    process_silent: AtomicBool,
    caller_cb: Mutex<Option<CallerCb<D>>>,
    caller_ctx: AnyCtx,
    pub(crate) process: ProcessInstance<D>,
    pub(crate) core: Arc<dyn CoreDispatch>,
    pub(crate) origin: Arc<dyn OriginDispatch>,
    trace: TraceLog,
}

impl<D: Send + Sync + 'static> MngtHandle<D> {
    pub(crate) fn new(
        device: Arc<D>,
        process: ProcessInstance<D>,
        cb: CallerCb<D>,
        caller_ctx: AnyCtx,
        core: Arc<dyn CoreDispatch>,
        origin: Arc<dyn OriginDispatch>,
        start_in_rollback: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            device: Mutex::new(Some(device)),
            status: Mutex::new(0),
            rollback_flag: AtomicBool::new(start_in_rollback),
            continuing: AtomicBool::new(false),
            process_silent: AtomicBool::new(false),
            caller_cb: Mutex::new(Some(cb)),
            caller_ctx,
            process,
            core,
            origin,
            trace: TraceLog::new(),
        })
    }

    fn in_rollback(&self) -> bool {
        self.rollback_flag.load(Ordering::SeqCst)
    }

    fn current_step(&self) -> Option<Arc<StepInstance<D>>> {
        if self.in_rollback() {
            self.process.rollback_todo.lock().front().cloned()
        } else {
            self.process.action_todo.lock().front().cloned()
        }
    }

    // ---- step-facing API (spec.md 4.1) ------------------------------------

    pub fn get_device(&self) -> Option<Arc<D>> {
        self.device.lock().clone()
    }

    pub fn clear_device(&self) {
        *self.device.lock() = None;
    }

    pub fn get_status(&self) -> i32 {
        *self.status.lock()
    }

    /// Suppress the process-level summary trace line.
    pub fn set_silent(&self) {
        self.process_silent.store(true, Ordering::SeqCst);
    }

    pub fn with_step_ctx<T: Send + 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let step = self.current_step()?;
        let mut guard = step.ctx.lock();
        let typed = guard.as_mut()?.downcast_mut::<T>()?;
        Some(f(typed))
    }

    /// Reallocate the current step's context buffer, freeing any previous one.
    pub fn alloc_step_ctx<T: Send + 'static>(&self, value: T) {
        if let Some(step) = self.current_step() {
            *step.ctx.lock() = Some(Box::new(value));
        }
    }

    pub fn with_process_ctx<T: Send + 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.process.ctx.lock();
        let typed = guard.as_mut()?.downcast_mut::<T>()?;
        Some(f(typed))
    }

    pub fn alloc_process_ctx<T: Send + 'static>(&self, value: T) {
        *self.process.ctx.lock() = Some(Box::new(value));
    }

    pub fn with_caller_ctx<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.caller_ctx.downcast_ref::<T>().map(f)
    }

    pub fn next_step(self: &Arc<Self>) {
        if self.in_rollback() {
            self.rollback_next();
        } else {
            self.action_next();
        }
    }

    pub fn skip_step(self: &Arc<Self>) {
        if let Some(step) = self.current_step() {
            if self.in_rollback() {
                step.rollback.lock().silent = true;
            } else {
                step.action.lock().silent = true;
            }
        }
        self.next_step();
    }

    pub fn continue_step(self: &Arc<Self>) {
        let already_continuing = self.continuing.swap(true, Ordering::SeqCst);
        if !already_continuing {
            if self.in_rollback() {
                self.rollback_execute();
            } else {
                self.action_execute();
            }
        }
    }

    /// Fail the current step: records the first failure status, unconditionally
    /// enters rollback mode. The failing step itself is moved to "done"
    /// bookkeeping but — unlike a successful completion — its cleanup (if any)
    /// is *not* queued for rollback, since it never finished running.
    pub fn fail_step(self: &Arc<Self>) {
        {
            let mut status = self.status.lock();
            if *status == 0 {
                *status = -1;
            }
        }
        if self.in_rollback() {
            self.rollback_done(-1);
        } else {
            self.action_done(-1, false);
        }
        self.rollback_flag.store(true, Ordering::SeqCst);
        self.rollback_execute();
    }

    pub fn call(self: &Arc<Self>, child: ProcessDescriptor<D>) {
        let Some(device) = self.get_device() else {
            self.fail_step();
            return;
        };
        self.mark_current_silent();
        let parent = self.clone();
        let result = crate::engine::execute_child(
            device,
            child,
            self.core.clone(),
            self.origin.clone(),
            Box::new(()),
            Box::new(move |_dev: Option<Arc<D>>, status: i32| {
                if status != 0 {
                    parent.fail_step();
                } else {
                    parent.next_step();
                }
            }),
        );
        if result.is_err() {
            self.fail_step();
        }
    }

    pub fn call_rollback(self: &Arc<Self>, child: ProcessDescriptor<D>) {
        let Some(device) = self.get_device() else {
            self.fail_step();
            return;
        };
        self.mark_current_silent();
        let parent = self.clone();
        let result = crate::engine::rollback_child(
            device,
            child,
            self.core.clone(),
            self.origin.clone(),
            Box::new(()),
            Box::new(move |_dev: Option<Arc<D>>, status: i32| {
                if status != 0 {
                    parent.fail_step();
                } else {
                    parent.next_step();
                }
            }),
        );
        if result.is_err() {
            self.fail_step();
        }
    }

    /// Like [`call`](Self::call), but on child success re-enters the current
    /// step (`continue_step`) instead of advancing past it (`next_step`).
    /// Needed by loops that dispatch one child process per iteration from the
    /// same step body, such as the layout-upgrade driver walking one region
    /// per call until `upgrade_ctx_init` reports `Done`.
    pub fn call_continuing(self: &Arc<Self>, child: ProcessDescriptor<D>) {
        let Some(device) = self.get_device() else {
            self.fail_step();
            return;
        };
        self.mark_current_silent();
        let parent = self.clone();
        let result = crate::engine::execute_child(
            device,
            child,
            self.core.clone(),
            self.origin.clone(),
            Box::new(()),
            Box::new(move |_dev: Option<Arc<D>>, status: i32| {
                if status != 0 {
                    parent.fail_step();
                } else {
                    parent.continue_step();
                }
            }),
        );
        if result.is_err() {
            self.fail_step();
        }
    }

    fn mark_current_silent(&self) {
        if let Some(step) = self.current_step() {
            if self.in_rollback() {
                step.rollback.lock().silent = true;
            } else {
                step.action.lock().silent = true;
            }
        }
    }

    // ---- forward loop -------------------------------------------------

    pub(crate) fn kickoff_action(self: Arc<Self>) {
        self.action_execute();
    }

    fn action_execute(self: &Arc<Self>) {
        let this = self.clone();
        self.core.post_to_core(Box::new(move || this.action_msg()));
    }

    fn action_msg(self: Arc<Self>) {
        self.core.assert_on_core_thread();
        self.continuing.store(false, Ordering::SeqCst);
        let step = self.process.action_todo.lock().front().cloned();
        match step {
            None => self.finish(),
            Some(step) => {
                step.action.lock().stamp_start();
                let action = step.desc.action.clone();
                let handle = self.clone();
                crate::engine::run_step_body(move || action(handle));
            }
        }
    }

    fn action_next(self: &Arc<Self>) {
        if self.process.action_todo.lock().is_empty() {
            self.finish();
        } else {
            self.action_done(0, true);
            self.action_execute();
        }
    }

    fn action_done(self: &Arc<Self>, status: i32, enqueue_cleanup: bool) {
        let Some(step) = self.process.action_todo.lock().pop_front() else {
            return;
        };
        if enqueue_cleanup && step.desc.cleanup.is_some() {
            self.process.rollback_todo.lock().push_front(step.clone());
        }
        self.process.action_done.lock().push_back(step.clone());
        {
            let mut record = step.action.lock();
            record.finish(status);
        }
        let record = step.action.lock().clone();
        self.trace.emit_step(false, step.desc.name, &record);
    }

    // ---- reverse loop ---------------------------------------------------

    pub(crate) fn kickoff_rollback(self: Arc<Self>) {
        self.rollback_execute();
    }

    fn rollback_execute(self: &Arc<Self>) {
        let this = self.clone();
        self.core.post_to_core(Box::new(move || this.rollback_msg()));
    }

    fn rollback_msg(self: Arc<Self>) {
        self.core.assert_on_core_thread();
        self.continuing.store(false, Ordering::SeqCst);
        let step = self.process.rollback_todo.lock().front().cloned();
        match step {
            None => self.finish(),
            Some(step) => {
                step.rollback.lock().stamp_start();
                let Some(cleanup) = step.desc.cleanup.clone() else {
                    // Synthetic error-handler step stores its body in `cleanup`
                    // too, so this should only be reachable for malformed
                    // descriptors; treat as an immediate no-op completion.
                    self.rollback_done(0);
                    self.rollback_execute();
                    return;
                };
                let handle = self.clone();
                crate::engine::run_step_body(move || cleanup(handle));
            }
        }
    }

    fn rollback_next(self: &Arc<Self>) {
        if self.process.rollback_todo.lock().is_empty() {
            self.finish();
        } else {
            self.rollback_done(0);
            self.rollback_execute();
        }
    }

    fn rollback_done(self: &Arc<Self>, status: i32) {
        let Some(step) = self.process.rollback_todo.lock().pop_front() else {
            return;
        };
        self.process.rollback_done.lock().push_back(step.clone());
        {
            let mut record = step.rollback.lock();
            record.finish(status);
        }
        let record = step.rollback.lock().clone();
        self.trace.emit_step(true, step.desc.name, &record);
    }

    // ---- finish -----------------------------------------------------------

    fn finish(self: &Arc<Self>) {
        let stop = Instant::now();
        *self.process.stop.lock() = Some(stop);
        let status = *self.status.lock();

        if !self.process_silent.load(Ordering::SeqCst) {
            let duration = stop.saturating_duration_since(self.process.start);
            self.trace.emit_finished(self.process.desc.name, duration, status);
        }

        let device = self.device.lock().clone();
        let cb = self.caller_cb.lock().take();
        let this = self.clone();
        self.origin.post_to_origin(Box::new(move || {
            if let Some(cb) = cb {
                cb(device, status);
            }
            drop(this);
        }));
    }

    /// Ordered replay of the trace lines emitted so far (for diagnostics/tests).
    pub fn trace_lines(&self) -> Vec<crate::trace::TraceLine> {
        self.trace.lines()
    }
}
