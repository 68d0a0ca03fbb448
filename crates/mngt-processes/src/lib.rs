//! Concrete FTL management process compositions built on `mngt-core`,
//! `mngt-collab`, and `mngt-upgrade`.

mod device;
mod entry;
mod processes;
mod steps;

pub use device::FtlDevice;
pub use entry::{layout_upgrade, layout_verify, self_test, shutdown, startup, unmap};
pub use processes::{
    clean_start_process, first_start_process, layout_upgrade_process, recover_process, restore_process,
    shutdown_process, startup_process, trim_process,
};
pub use self_test::SELF_TEST_CHUNK_LBAS;
