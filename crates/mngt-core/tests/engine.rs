//! Scenario tests for the forward/reverse execution engine, independent of
//! any concrete collaborator device.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use mngt_core::{CoreDispatch, CoreJob, MngtHandle, OriginDispatch, ProcessDescriptor, StepDescriptor, execute, rollback};

/// Runs every posted job synchronously on the calling thread. Good enough for
/// these tests since nothing here actually needs concurrency; it still
/// exercises the same `post_to_core`/`post_to_origin` seam `mngt-engine` uses.
struct Inline;

impl CoreDispatch for Inline {
    fn post_to_core(&self, job: CoreJob) {
        job();
    }
}

impl OriginDispatch for Inline {
    fn post_to_origin(&self, job: CoreJob) {
        job();
    }
}

struct Device;

fn inline() -> (Arc<dyn CoreDispatch>, Arc<dyn OriginDispatch>) {
    (Arc::new(Inline), Arc::new(Inline))
}

fn recording_step(
    name: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
) -> StepDescriptor<Device> {
    StepDescriptor::new(
        name,
        Arc::new(move |h: Arc<MngtHandle<Device>>| {
            order.lock().unwrap().push(name);
            h.next_step();
        }),
    )
}

fn recording_step_with_cleanup(
    name: &'static str,
    cleanup_name: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
) -> StepDescriptor<Device> {
    let cleanup_order = order.clone();
    StepDescriptor::new(
        name,
        Arc::new(move |h: Arc<MngtHandle<Device>>| {
            order.lock().unwrap().push(name);
            h.next_step();
        }),
    )
    .with_cleanup(Arc::new(move |h: Arc<MngtHandle<Device>>| {
        cleanup_order.lock().unwrap().push(cleanup_name);
        h.next_step();
    }))
}

fn failing_step(name: &'static str, order: Arc<Mutex<Vec<&'static str>>>) -> StepDescriptor<Device> {
    StepDescriptor::new(
        name,
        Arc::new(move |h: Arc<MngtHandle<Device>>| {
            order.lock().unwrap().push(name);
            h.fail_step();
        }),
    )
}

#[test]
fn steps_run_in_descriptor_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let desc = ProcessDescriptor::new(
        "P",
        vec![
            recording_step("A", order.clone()),
            recording_step("B", order.clone()),
            recording_step("C", order.clone()),
        ],
    );
    let (core, origin) = inline();
    let done = Arc::new(AtomicUsize::new(0));
    let done2 = done.clone();

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(move |_dev, status| {
            assert_eq!(status, 0);
            done2.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[test]
fn cleanups_fire_in_lifo_order_on_failure() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let desc = ProcessDescriptor::new(
        "P1",
        vec![
            recording_step_with_cleanup("A", "cleanup(A)", order.clone()),
            recording_step_with_cleanup("B", "cleanup(B)", order.clone()),
            {
                let cleanup_order = order.clone();
                StepDescriptor::new(
                    "C",
                    Arc::new(move |h: Arc<MngtHandle<Device>>| {
                        order.lock().unwrap().push("C");
                        h.fail_step();
                    }),
                )
                .with_cleanup(Arc::new(move |h: Arc<MngtHandle<Device>>| {
                    cleanup_order.lock().unwrap().push("cleanup(C)");
                    h.next_step();
                }))
            },
        ],
    );
    let (core, origin) = inline();
    let status = Arc::new(AtomicUsize::new(0));
    let status2 = status.clone();

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(move |_dev, s| status2.store((s != 0) as usize, Ordering::SeqCst)),
    )
    .unwrap();

    assert_eq!(status.load(Ordering::SeqCst), 1);
    // C's own cleanup never fires: it failed mid-action, never completed.
    assert_eq!(
        *order.lock().unwrap(),
        vec!["A", "B", "C", "cleanup(B)", "cleanup(A)"]
    );
}

#[test]
fn predecessor_cleanup_runs_when_a_later_step_without_cleanup_fails() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let desc = ProcessDescriptor::new(
        "P2",
        vec![
            recording_step_with_cleanup("A", "cleanup(A)", order.clone()),
            failing_step("B", order.clone()),
            recording_step("C", order.clone()),
        ],
    );
    let (core, origin) = inline();

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(|_dev, _status| {}),
    )
    .unwrap();

    // C never ran; only A's cleanup fires.
    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "cleanup(A)"]);
}

#[test]
fn skip_step_suppresses_its_trace_line() {
    let desc = ProcessDescriptor::new(
        "P",
        vec![StepDescriptor::new(
            "Skippable",
            Arc::new(|h: Arc<MngtHandle<Device>>| h.skip_step()),
        )],
    );
    let (core, origin) = inline();

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(|_dev, _status| {}),
    )
    .unwrap();
}

#[test]
fn fail_step_is_idempotent() {
    let desc = ProcessDescriptor::new(
        "P",
        vec![StepDescriptor::new(
            "DoubleFail",
            Arc::new(|h: Arc<MngtHandle<Device>>| {
                h.fail_step();
                // A second fail_step should not change the recorded status.
                h.fail_step();
            }),
        )],
    );
    let (core, origin) = inline();
    let status = Arc::new(Mutex::new(0i32));
    let status2 = status.clone();

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(move |_dev, s| *status2.lock().unwrap() = s),
    )
    .unwrap();

    assert_eq!(*status.lock().unwrap(), -1);
}

#[test]
fn call_runs_child_process_then_resumes_parent() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let child_order = order.clone();
    let child = ProcessDescriptor::new(
        "Child",
        vec![StepDescriptor::new(
            "ChildStep",
            Arc::new(move |h: Arc<MngtHandle<Device>>| {
                child_order.lock().unwrap().push("child");
                h.next_step();
            }),
        )],
    );

    let parent_order = order.clone();
    let after_order = order.clone();
    let desc = ProcessDescriptor::new(
        "Parent",
        vec![
            StepDescriptor::new(
                "CallChild",
                Arc::new(move |h: Arc<MngtHandle<Device>>| {
                    parent_order.lock().unwrap().push("before");
                    h.call(child.clone());
                }),
            ),
            StepDescriptor::new(
                "After",
                Arc::new(move |h: Arc<MngtHandle<Device>>| {
                    after_order.lock().unwrap().push("after");
                    h.next_step();
                }),
            ),
        ],
    );
    let (core, origin) = inline();

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(|_dev, status| assert_eq!(status, 0)),
    )
    .unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["before", "child", "after"]);
}

#[test]
fn bare_rollback_only_runs_steps_with_cleanup_in_lifo_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let desc = ProcessDescriptor::new(
        "P",
        vec![
            recording_step_with_cleanup("A", "cleanup(A)", order.clone()),
            recording_step("B", order.clone()),
            recording_step_with_cleanup("C", "cleanup(C)", order.clone()),
        ],
    );
    let (core, origin) = inline();

    rollback(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(|_dev, _status| {}),
    )
    .unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["cleanup(C)", "cleanup(A)"]);
}

#[test]
fn empty_process_is_rejected() {
    let desc: ProcessDescriptor<Device> = ProcessDescriptor::new("Empty", vec![]);
    let (core, origin) = inline();
    let result = execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(|_dev, _status| {}),
    );
    assert!(result.is_err());
}

#[test]
fn direct_recursive_execute_from_within_a_step_is_rejected() {
    let (core, origin) = inline();
    let inner_core = core.clone();
    let inner_origin = origin.clone();

    let desc = ProcessDescriptor::new(
        "Outer",
        vec![StepDescriptor::new(
            "Reenter",
            Arc::new(move |h: Arc<MngtHandle<Device>>| {
                let inner = ProcessDescriptor::new(
                    "Inner",
                    vec![StepDescriptor::new(
                        "InnerStep",
                        Arc::new(|h: Arc<MngtHandle<Device>>| h.next_step()),
                    )],
                );
                let result = execute(
                    Arc::new(Device),
                    inner,
                    inner_core.clone(),
                    inner_origin.clone(),
                    Box::new(()),
                    Box::new(|_dev, _status| {}),
                );
                assert!(result.is_err());
                h.next_step();
            }),
        )],
    );

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(|_dev, status| assert_eq!(status, 0)),
    )
    .unwrap();
}

#[test]
fn caller_context_is_visible_from_within_a_step() {
    struct UnmapArgs {
        lba: u64,
    }

    let desc = ProcessDescriptor::new(
        "Unmap",
        vec![StepDescriptor::new(
            "ReadArgs",
            Arc::new(|h: Arc<MngtHandle<Device>>| {
                let lba = h.with_caller_ctx::<UnmapArgs, u64>(|args| args.lba).unwrap();
                assert_eq!(lba, 42);
                h.next_step();
            }),
        )],
    );
    let (core, origin) = inline();

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(UnmapArgs { lba: 42 }),
        Box::new(|_dev, _status| {}),
    )
    .unwrap();
}

struct BufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl BufferWriter {
    fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (Self { inner: buf.clone() }, buf)
    }
}

struct LockedWriter<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl<'a> Write for LockedWriter<'a> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for BufferWriter {
    type Writer = LockedWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LockedWriter {
            guard: self.inner.lock().expect("log buffer poisoned"),
        }
    }
}

#[test]
fn finished_process_emits_a_trace_line_on_the_mngt_trace_target() {
    let (writer, buffer) = BufferWriter::new();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .with_ansi(false)
        .without_time()
        .with_writer(writer)
        .finish();

    let desc = ProcessDescriptor::new(
        "Traced",
        vec![StepDescriptor::new(
            "Only",
            Arc::new(|h: Arc<MngtHandle<Device>>| h.next_step()),
        )],
    );
    let (core, origin) = inline();

    tracing::subscriber::with_default(subscriber, || {
        execute(
            Arc::new(Device),
            desc,
            core,
            origin,
            Box::new(()),
            Box::new(|_dev, _status| {}),
        )
        .unwrap();
    });

    let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(log_output.contains("mngt.trace"));
    assert!(log_output.contains("Management process finished, name 'Traced'"));
}

#[test]
fn step_context_survives_across_a_step_that_never_completes_synchronously() {
    let desc = ProcessDescriptor::new(
        "Ctx",
        vec![StepDescriptor::new(
            "Alloc",
            Arc::new(|h: Arc<MngtHandle<Device>>| {
                h.alloc_step_ctx(7u32);
                let seen = h.with_step_ctx::<u32, u32>(|v| *v).unwrap();
                assert_eq!(seen, 7);
                h.next_step();
            }),
        )],
    );
    let (core, origin) = inline();

    execute(
        Arc::new(Device),
        desc,
        core,
        origin,
        Box::new(()),
        Box::new(|_dev, _status| {}),
    )
    .unwrap();
}
