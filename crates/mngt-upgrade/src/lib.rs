//! Layout upgrade driver and concrete region upgrades.

mod desc;
mod driver;
mod error;
mod p2l_v0_v1;

pub use desc::RegionUpgradeDesc;
pub use driver::{UpgradeOutcome, layout_upgrade_process};
pub use error::UpgradeError;
pub use p2l_v0_v1::{
    P2L_PAGE_PAYLOAD_LEN, P2L_VERSION_0, P2L_VERSION_1, P2lPage, P2lRegionAccess,
    p2l_v0_to_v1_step,
};
