use thiserror::Error;

/// Errors the upgrade driver can surface independent of a step failure.
#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("layout failed validation after the upgrade pass completed")]
    LayoutInvalid,
    #[error("no upgrade descriptor registered for region index {0}")]
    UnknownRegion(usize),
}
