//! The device bound every concrete process composition is generic over: a
//! single type implementing every collaborator trait plus the P2L region
//! access the layout-upgrade driver needs.

use mngt_collab::{
    BandCollaborator, IoChannelCollaborator, L2pCollaborator, NvCacheCollaborator, P2lCollaborator,
    RelocationCollaborator, SelfTestCollaborator, SuperBlockCollaborator, TrimCollaborator, ZoneCollaborator,
};
use mngt_upgrade::P2lRegionAccess;

pub trait FtlDevice:
    SuperBlockCollaborator
    + BandCollaborator
    + ZoneCollaborator
    + L2pCollaborator
    + P2lCollaborator
    + NvCacheCollaborator
    + RelocationCollaborator
    + IoChannelCollaborator
    + TrimCollaborator
    + SelfTestCollaborator
    + P2lRegionAccess
    + Send
    + Sync
    + 'static
{
}

impl<T> FtlDevice for T where
    T: SuperBlockCollaborator
        + BandCollaborator
        + ZoneCollaborator
        + L2pCollaborator
        + P2lCollaborator
        + NvCacheCollaborator
        + RelocationCollaborator
        + IoChannelCollaborator
        + TrimCollaborator
        + SelfTestCollaborator
        + P2lRegionAccess
        + Send
        + Sync
        + 'static
{
}
