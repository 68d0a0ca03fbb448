//! Step Context Arena: per-step and per-process heap-owned state with
//! deterministic lifetime, plus the queues that give a process instance its
//! ordered dequeue semantics.
//!
//! The source models `action_queue`/`rollback_queue` as a single doubly
//! linked list a step can be inserted into from either end. Rust's ownership
//! rules make that awkward without unsafe code; since steps are already
//! reference-counted here (so a step can simultaneously be "the current
//! action step" and "queued for rollback"), four plain `VecDeque<Arc<..>>`
//! queues give the same ordered dequeue semantics without index bookkeeping.

use std::any::Any;
use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::Mutex;

use crate::descriptor::{ProcessDescriptor, StepDescriptor};
use crate::trace::ExecRecord;

pub(crate) type AnyBox = Box<dyn Any + Send>;

/// A single step's owned state: its descriptor, its context buffer, and the
/// two timing/status records for the action and rollback passes.
pub struct StepInstance<D> {
    pub desc: StepDescriptor<D>,
    pub(crate) ctx: Mutex<Option<AnyBox>>,
    pub(crate) action: Mutex<ExecRecord>,
    pub(crate) rollback: Mutex<ExecRecord>,
}

impl<D> StepInstance<D> {
    pub(crate) fn new(desc: StepDescriptor<D>) -> Self {
        Self {
            desc,
            ctx: Mutex::new(None),
            action: Mutex::new(ExecRecord::default()),
            rollback: Mutex::new(ExecRecord::default()),
        }
    }
}

/// A process instance's queues plus its own context buffer and timing.
pub struct ProcessInstance<D> {
    pub desc: ProcessDescriptor<D>,
    pub(crate) ctx: Mutex<Option<AnyBox>>,
    pub(crate) action_todo: Mutex<VecDeque<std::sync::Arc<StepInstance<D>>>>,
    pub(crate) action_done: Mutex<VecDeque<std::sync::Arc<StepInstance<D>>>>,
    pub(crate) rollback_todo: Mutex<VecDeque<std::sync::Arc<StepInstance<D>>>>,
    pub(crate) rollback_done: Mutex<VecDeque<std::sync::Arc<StepInstance<D>>>>,
    pub(crate) start: Instant,
    pub(crate) stop: Mutex<Option<Instant>>,
}

impl<D> ProcessInstance<D> {
    /// Build a process instance with the full action queue materialized in
    /// descriptor order. If the descriptor declares an `error_handler`, it is
    /// wrapped into a synthetic step and seeded at the head of the rollback
    /// queue so it fires last during rollback (LIFO relative to everything
    /// the action pass pushes in front of it).
    pub(crate) fn for_execute(desc: ProcessDescriptor<D>) -> Self {
        let mut rollback_todo = VecDeque::new();
        if let Some(handler) = desc.error_handler.clone() {
            let error_step = StepDescriptor::new("Handle ERROR", handler.clone()).with_cleanup(handler);
            rollback_todo.push_back(std::sync::Arc::new(StepInstance::new(error_step)));
        }

        let action_todo = desc
            .steps
            .iter()
            .cloned()
            .map(|d| std::sync::Arc::new(StepInstance::new(d)))
            .collect();

        Self {
            desc,
            ctx: Mutex::new(None),
            action_todo: Mutex::new(action_todo),
            action_done: Mutex::new(VecDeque::new()),
            rollback_todo: Mutex::new(rollback_todo),
            rollback_done: Mutex::new(VecDeque::new()),
            start: Instant::now(),
            stop: Mutex::new(None),
        }
    }

    /// Build a process instance for a bare rollback invocation: only steps
    /// whose descriptor carries a `cleanup` are materialized, pre-stacked
    /// onto the rollback queue in LIFO order relative to descriptor
    /// position, and the action pass is marked silent (each such step's
    /// action never actually ran; only the original trace of the failed
    /// `execute` call should mention it).
    pub(crate) fn for_rollback(desc: ProcessDescriptor<D>) -> Self {
        let mut rollback_todo = VecDeque::new();
        for step_desc in desc.steps.iter() {
            if step_desc.cleanup.is_none() {
                continue;
            }
            let instance = std::sync::Arc::new(StepInstance::new(step_desc.clone()));
            instance.action.lock().silent = true;
            rollback_todo.push_front(instance);
        }

        Self {
            desc,
            ctx: Mutex::new(None),
            action_todo: Mutex::new(VecDeque::new()),
            action_done: Mutex::new(VecDeque::new()),
            rollback_todo: Mutex::new(rollback_todo),
            rollback_done: Mutex::new(VecDeque::new()),
            start: Instant::now(),
            stop: Mutex::new(None),
        }
    }
}
