use mngt_core::StepFn;

/// One region's registered upgrade: the step body that performs it plus the
/// bookkeeping the driver needs to name and size it.
pub struct RegionUpgradeDesc<D> {
    pub region_name: &'static str,
    pub from_version: u8,
    pub to_version: u8,
    /// Documented size hint for the child process's step context; not
    /// load-bearing in this crate's arena (see `mngt-core`'s `arg_size_hint`).
    pub ctx_size_hint: usize,
    pub upgrade: StepFn<D>,
}

impl<D> Clone for RegionUpgradeDesc<D> {
    fn clone(&self) -> Self {
        Self {
            region_name: self.region_name,
            from_version: self.from_version,
            to_version: self.to_version,
            ctx_size_hint: self.ctx_size_hint,
            upgrade: self.upgrade.clone(),
        }
    }
}
