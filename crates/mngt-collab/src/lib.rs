//! Subsystem collaborator façade: one thin-adapter trait per row of the
//! collaborator table, plus an in-memory mock device implementing all of
//! them so the process compositions in `mngt-processes` are testable.

mod config;
mod error;
mod mock;
mod traits;

pub use config::{DeviceConfig, StartupMode};
pub use error::CollaboratorError;
pub use mock::MockFtlDevice;
pub use traits::{
    BandCollaborator, IoChannelCollaborator, L2pCollaborator, NvCacheCollaborator, P2lCollaborator,
    RelocationCollaborator, SelfTestCollaborator, SuperBlockCollaborator, TrimCollaborator, ZoneCollaborator,
};
