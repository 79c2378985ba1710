use serde::{Deserialize, Serialize};

use crate::error::{PloidyError, Result};
use crate::transition::DEFAULT_STAY_SWITCH_RATIO;

/// Fetal fraction pinned by the fixed-fraction read-count decoder.
pub const DEFAULT_FIXED_FETAL_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub stay_switch_ratio: f64,
    /// Set from library code only; config files cannot move it.
    #[serde(skip)]
    pub fixed_fetal_fraction: f64,
    /// Decode sample groups on the rayon pool.
    pub parallel: bool,
    /// Show a per-group progress bar on stderr.
    pub progress: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            stay_switch_ratio: DEFAULT_STAY_SWITCH_RATIO,
            fixed_fetal_fraction: DEFAULT_FIXED_FETAL_FRACTION,
            parallel: true,
            progress: false,
        }
    }
}

impl DecodeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.stay_switch_ratio.is_finite() || self.stay_switch_ratio <= 0.0 {
            return Err(PloidyError::invalid_parameter(format!(
                "stay_switch_ratio must be finite and > 0, got {}",
                self.stay_switch_ratio
            )));
        }
        if !(self.fixed_fetal_fraction > 0.0 && self.fixed_fetal_fraction <= 1.0) {
            return Err(PloidyError::invalid_parameter(format!(
                "fixed_fetal_fraction must be in (0, 1], got {}",
                self.fixed_fetal_fraction
            )));
        }
        Ok(())
    }
}
