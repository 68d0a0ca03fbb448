//! Per-step timing/status records and the ordered audit trail.

use std::time::{Duration, Instant};

/// Timing and outcome for one pass (action or rollback) of one step.
#[derive(Debug, Clone, Default)]
pub struct ExecRecord {
    pub start: Option<Instant>,
    pub stop: Option<Instant>,
    pub status: i32,
    pub silent: bool,
}

impl ExecRecord {
    pub fn stamp_start(&mut self) {
        if self.start.is_none() {
            self.start = Some(Instant::now());
        }
    }

    pub fn finish(&mut self, status: i32) {
        self.stop = Some(Instant::now());
        self.status = status;
    }

    pub fn duration(&self) -> Duration {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }
}

/// One line of the audit trail: either a step completion or the final
/// process summary.
#[derive(Debug, Clone)]
pub enum TraceLine {
    Step {
        rollback: bool,
        name: &'static str,
        duration: Duration,
        status: i32,
    },
    ProcessFinished {
        name: &'static str,
        duration: Duration,
        status: i32,
    },
}

impl std::fmt::Display for TraceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceLine::Step {
                rollback,
                name,
                duration,
                status,
            } => {
                let what = if *rollback { "Rollback" } else { "Action" };
                write!(
                    f,
                    "{what} name={name} duration={:.3} status={status}",
                    duration.as_secs_f64() * 1000.0
                )
            }
            TraceLine::ProcessFinished {
                name,
                duration,
                status,
            } => write!(
                f,
                "Management process finished, name '{name}', duration={:.3} ms, result {status}",
                duration.as_secs_f64() * 1000.0
            ),
        }
    }
}

/// Ordered replay log for a single process instance. Steps append to this
/// in completion order (action pass, then rollback pass), matching Testable
/// Property 4 (trace monotonicity).
#[derive(Debug, Default)]
pub struct TraceLog {
    lines: parking_lot::Mutex<Vec<TraceLine>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: TraceLine) {
        tracing::info!(target: "mngt.trace", "{line}");
        self.lines.lock().push(line);
    }

    pub fn emit_step(&self, rollback: bool, name: &'static str, record: &ExecRecord) {
        if record.silent {
            return;
        }
        self.push(TraceLine::Step {
            rollback,
            name,
            duration: record.duration(),
            status: record.status,
        });
    }

    pub fn emit_finished(&self, name: &'static str, duration: Duration, status: i32) {
        self.push(TraceLine::ProcessFinished {
            name,
            duration,
            status,
        });
    }

    /// Snapshot of lines recorded so far, in emission order.
    pub fn lines(&self) -> Vec<TraceLine> {
        self.lines.lock().clone()
    }
}
