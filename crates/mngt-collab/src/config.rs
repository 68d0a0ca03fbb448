//! Device configuration loaded from TOML, with resilient fallback to
//! defaults on a missing or unparseable file.

use std::path::Path;

use serde::Deserialize;

use crate::error::CollaboratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupMode {
    /// First boot of a never-initialized device: run First-Start.
    Create,
    /// Reattach to an already-initialized device: run Restore.
    Load,
}

impl Default for StartupMode {
    fn default() -> Self {
        StartupMode::Load
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "DeviceConfig::default_startup_mode")]
    pub startup_mode: StartupMode,
    #[serde(default = "DeviceConfig::default_band_size_blocks")]
    pub band_size_blocks: u64,
    #[serde(default)]
    pub zoned: bool,
    #[serde(default = "DeviceConfig::default_num_io_channels")]
    pub num_io_channels: u32,
    #[serde(default)]
    pub self_test_on_start: bool,
    /// Selects the fast Shutdown variant (skips persisting L2P).
    #[serde(default)]
    pub fast_shdn: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            startup_mode: Self::default_startup_mode(),
            band_size_blocks: Self::default_band_size_blocks(),
            zoned: false,
            num_io_channels: Self::default_num_io_channels(),
            self_test_on_start: false,
            fast_shdn: false,
        }
    }
}

impl DeviceConfig {
    const fn default_startup_mode() -> StartupMode {
        StartupMode::Load
    }

    const fn default_band_size_blocks() -> u64 {
        1024
    }

    const fn default_num_io_channels() -> u32 {
        1
    }

    /// Internal-consistency check run by Startup's "Check configuration"
    /// step, before any bdev is opened.
    pub fn validate(&self) -> Result<(), CollaboratorError> {
        if self.band_size_blocks == 0 {
            return Err(CollaboratorError::InvalidConfig(
                "band_size_blocks must be nonzero".into(),
            ));
        }
        if self.num_io_channels == 0 {
            return Err(CollaboratorError::InvalidConfig(
                "num_io_channels must be nonzero".into(),
            ));
        }
        Ok(())
    }

    /// Load from `path`, falling back to defaults if the file is absent or
    /// fails to parse.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Self>(&content) {
                Ok(cfg) => cfg,
                Err(error) => {
                    tracing::debug!(
                        target: "mngt.config",
                        path = %path.display(),
                        %error,
                        "device config parse failed, using defaults"
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
