//! Generic process/step descriptors, the step-facing management handle, and
//! the forward/reverse execution engine that sequences them.
//!
//! Everything here is generic over the device type `D` so this crate never
//! depends on a concrete collaborator implementation; `mngt-collab` and
//! `mngt-processes` close the loop by instantiating `D`.

mod context;
mod descriptor;
mod dispatch;
mod engine;
mod error;
mod handle;
mod trace;

pub use descriptor::{ProcessDescriptor, StepDescriptor, StepFn};
pub use dispatch::{CoreDispatch, CoreJob, OriginDispatch};
pub use engine::{execute, rollback};
pub use error::{EngineError, EngineResult};
pub use handle::{CallerCb, MngtHandle};
pub use trace::{ExecRecord, TraceLine, TraceLog};
