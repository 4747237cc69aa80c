use obe_core::RngHandle;

/// Independent random streams used by one engine, all forked from the master seed.
#[derive(Debug, Clone)]
pub struct EngineStreams {
    /// Initial particle draw.
    pub prior: RngHandle,
    /// Systematic resampling offset and jitter.
    pub resample: RngHandle,
    /// Particles drawn for utility estimates.
    pub utility: RngHandle,
    /// Setting choice in `good_setting`.
    pub select: RngHandle,
}

impl EngineStreams {
    /// Forks every stream from `master_seed`.
    pub fn from_seed(master_seed: u64) -> Self {
        let root = RngHandle::from_seed(master_seed);
        Self {
            prior: root.fork("prior"),
            resample: root.fork("resample"),
            utility: root.fork("utility"),
            select: root.fork("select"),
        }
    }
}
