//! Engine parameter record.

use crate::error::ResubError;
use lutopt_core::MAX_LUT_SIZE;

/// Knobs accepted by [`optimize`](crate::optimize).
#[derive(Debug, Clone)]
pub struct ResubParams {
    /// Maximum fan-in of any node produced (≤ 6).
    pub lut_size: usize,
    /// TFO depth bound of the window, in levels above the pivot.
    pub tfo_lev_max: u32,
    /// TFI depth bound of the window, in levels below the pivot.
    pub tfi_lev_max: u32,
    /// Nodes with more fan-outs do not propagate the TFO frontier.
    pub fanout_max: usize,
    /// Windows larger than this are skipped.
    pub win_node_max: usize,
    /// Maximum allowed growth in level (accepted, currently inert).
    pub growth_level: u32,
    /// SAT budget per call (decision limit); 0 = unlimited.
    pub bt_limit: u64,
    /// Cap on the number of pivots visited; 0 = unlimited.
    pub nodes_max: usize,
    /// Enables the two-node (Supp3) reimplementation.
    pub use_ashen: bool,
    /// Area pass (MFFC buckets, Supp1/2/3) vs. delay pass (priority queue).
    pub area: bool,
    /// High-effort minimization (accepted, currently inert).
    pub more_effort: bool,
    /// Emit the end-of-run summary.
    pub verbose: bool,
    /// Emit per-pivot detail.
    pub very_verbose: bool,
}

impl Default for ResubParams {
    fn default() -> Self {
        ResubParams {
            lut_size: 4,
            tfo_lev_max: 2,
            tfi_lev_max: 3,
            fanout_max: 20,
            win_node_max: 100,
            growth_level: 0,
            bt_limit: 0,
            nodes_max: 0,
            use_ashen: false,
            area: true,
            more_effort: false,
            verbose: false,
            very_verbose: false,
        }
    }
}

impl ResubParams {
    pub fn validate(&self) -> Result<(), ResubError> {
        if self.lut_size == 0 || self.lut_size > MAX_LUT_SIZE {
            return Err(ResubError::InvalidParams(format!(
                "lut_size {} outside 1..={}",
                self.lut_size, MAX_LUT_SIZE
            )));
        }
        if self.fanout_max == 0 {
            return Err(ResubError::InvalidParams("fanout_max must be >= 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ResubParams::default().validate().unwrap();
    }

    #[test]
    fn lut_size_bounds() {
        let mut p = ResubParams::default();
        p.lut_size = 0;
        assert!(p.validate().is_err());
        p.lut_size = 7;
        assert!(p.validate().is_err());
        p.lut_size = 6;
        assert!(p.validate().is_ok());
    }
}
