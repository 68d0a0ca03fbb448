//! The concrete core-thread dispatcher: a dedicated OS thread driving a
//! single-threaded Tokio runtime, fed by an unbounded channel of [`CoreJob`]s,
//! plus origin-side delivery adapters satisfying `mngt-core`'s
//! `CoreDispatch`/`OriginDispatch` seams.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::ThreadId;

use mngt_core::{CoreDispatch, CoreJob, OriginDispatch};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;

/// A dedicated OS thread running a single-threaded Tokio runtime that drains
/// a FIFO queue of [`CoreJob`]s. This is the device's single core thread:
/// every step action/cleanup ultimately runs here.
pub struct CoreThread {
    sender: std::sync::Mutex<Option<UnboundedSender<CoreJob>>>,
    thread_id: ThreadId,
    jobs_posted: AtomicU64,
    handle: std::sync::Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl CoreThread {
    /// Spawn the worker thread and block until its runtime is ready to
    /// receive jobs, so the returned `CoreThread`'s `thread_id` is always
    /// valid for affinity assertions.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Arc<Self>> {
        let name = name.into();
        let (sender, receiver) = unbounded_channel::<CoreJob>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<ThreadId>();

        let handle = std::thread::Builder::new().name(name.clone()).spawn(move || {
            let _ = ready_tx.send(std::thread::current().id());
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .expect("failed to build core-thread runtime");
            rt.block_on(Self::drain(receiver, name));
        })?;

        let thread_id = ready_rx
            .recv()
            .expect("core thread dropped before signalling readiness");

        Ok(Arc::new(Self {
            sender: std::sync::Mutex::new(Some(sender)),
            thread_id,
            jobs_posted: AtomicU64::new(0),
            handle: std::sync::Mutex::new(Some(handle)),
        }))
    }

    async fn drain(mut receiver: UnboundedReceiver<CoreJob>, name: String) {
        while let Some(job) = receiver.recv().await {
            tracing::trace!(target: "mngt.core_thread", thread = %name, "job_dispatched");
            job();
        }
        tracing::debug!(target: "mngt.core_thread", thread = %name, "queue_closed");
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn jobs_posted(&self) -> u64 {
        self.jobs_posted.load(Ordering::Relaxed)
    }
}

impl Drop for CoreThread {
    fn drop(&mut self) {
        // Drop the sender first so `drain`'s `receiver.recv()` observes a
        // closed channel and the worker thread actually exits; joining
        // while a sender is still alive would deadlock.
        self.sender.lock().unwrap().take();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl CoreDispatch for CoreThread {
    fn post_to_core(&self, job: CoreJob) {
        self.jobs_posted.fetch_add(1, Ordering::Relaxed);
        let sent = match self.sender.lock().unwrap().as_ref() {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        };
        if !sent {
            tracing::error!(target: "mngt.core_thread", "post_to_core after queue closed");
        }
    }

    fn assert_on_core_thread(&self) {
        debug_assert_eq!(
            std::thread::current().id(),
            self.thread_id,
            "step body ran off the device's core thread"
        );
    }
}

/// A `CoreThread` can also serve as another process's origin: posting there
/// just enqueues onto the same FIFO, which is how a nested-device test (two
/// mock devices, two core threads) avoids deadlocking each other's queues.
impl OriginDispatch for CoreThread {
    fn post_to_origin(&self, job: CoreJob) {
        self.post_to_core(job);
    }
}

/// A one-shot origin: the caller awaits the returned receiver on its own
/// task, so the completion job runs wherever that `await` resumes — this is
/// what lets the public entry points preserve the caller's origin thread
/// identity without this crate needing to know what that thread is.
pub struct OneshotOrigin {
    sender: std::sync::Mutex<Option<oneshot::Sender<CoreJob>>>,
}

impl OneshotOrigin {
    pub fn pair() -> (Arc<Self>, oneshot::Receiver<CoreJob>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                sender: std::sync::Mutex::new(Some(tx)),
            }),
            rx,
        )
    }
}

impl OriginDispatch for OneshotOrigin {
    fn post_to_origin(&self, job: CoreJob) {
        if let Some(tx) = self.sender.lock().unwrap().take() {
            let _ = tx.send(job);
        } else {
            tracing::error!(target: "mngt.origin", "post_to_origin called more than once");
        }
    }
}
