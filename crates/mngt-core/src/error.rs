//! Error kinds surfaced by the process engine itself.
//!
//! Collaborator-level failures are not represented here; a step body is
//! expected to translate its own error type into a call to
//! [`crate::handle::MngtHandle::fail_step`].

use thiserror::Error;

/// Errors the engine can return from `execute`/`rollback` or from the
/// step-facing API when it is misused.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A process descriptor with no steps and no error handler was submitted.
    #[error("process descriptor '{0}' has no steps to run")]
    EmptyProcess(&'static str),

    /// A step-facing method was called while no step was current (outside of
    /// an action/cleanup body, or after the process already finished).
    #[error("step-facing API called outside of an active step")]
    NotInStep,

    /// `execute`/`rollback` was invoked recursively from within a running
    /// step instead of going through `call`/`call_rollback`.
    #[error("direct recursive execute() from within a step is forbidden, use call()")]
    RecursiveExecute,

    /// A transient collaborator condition (the Rust analogue of the source's
    /// `-EAGAIN`): the caller may retry the whole entry point later.
    #[error("transient condition, retry later")]
    Transient,
}

pub type EngineResult<T> = Result<T, EngineError>;
