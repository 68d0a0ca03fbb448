use thiserror::Error;

/// Errors a collaborator adapter can report back to a step body. A step
/// translates these into `handle.fail_step()` itself; this crate has no
/// dependency on `mngt-core`.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The operation can't complete right now but may succeed if retried
    /// (the Rust analogue of the source's `-EAGAIN`).
    #[error("collaborator busy, retry later")]
    Transient,

    #[error("subsystem '{0}' is not initialized")]
    NotInitialized(&'static str),

    #[error("invalid device configuration: {0}")]
    InvalidConfig(String),

    #[error("index {0} out of range")]
    OutOfRange(usize),
}
