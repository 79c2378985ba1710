pub mod config;
pub mod table;

use crate::states::Feature;

/// One segment measurement as read from the segment table.
///
/// Missing cells are `None`; non-finite values are kept as read so the
/// decoder can decide whether to drop or reject them.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRow {
    pub sample: String,
    pub total_count: Option<f64>,
    pub allelic_ratio: Option<f64>,
}

impl SegmentRow {
    pub fn new(sample: &str, total_count: Option<f64>, allelic_ratio: Option<f64>) -> Self {
        Self {
            sample: sample.to_string(),
            total_count,
            allelic_ratio,
        }
    }

    pub fn feature(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::TotalCount => self.total_count,
            Feature::AllelicRatio => self.allelic_ratio,
        }
    }
}
