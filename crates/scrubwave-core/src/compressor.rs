//! Two-tier compression of the quiet end of a loudness series

use crate::types::LoudnessSeries;

/// Percentile below which levels are halved
const LOWER_PERCENTILE: f64 = 0.10;
/// Percentile below which levels are divided by 1.5
const UPPER_PERCENTILE: f64 = 0.20;

/// Pushes the quietest readings further down so intros and outros read as
/// quiet rather than as a flat line
pub struct DynamicRangeCompressor;

impl DynamicRangeCompressor {
    /// Compress a series, returning a new one of the same length and times
    ///
    /// Levels at or below the 10th percentile are halved, levels up to the
    /// 20th percentile are divided by 1.5, everything else is left alone.
    pub fn compress(series: &LoudnessSeries) -> LoudnessSeries {
        if series.is_empty() {
            return LoudnessSeries::default();
        }

        let mut sorted = series.levels();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let p10 = nearest_rank(&sorted, LOWER_PERCENTILE);
        let p20 = nearest_rank(&sorted, UPPER_PERCENTILE);

        series.map_levels(|level| {
            if level <= p10 {
                level / 2.0
            } else if level <= p20 {
                level / 1.5
            } else {
                level
            }
        })
    }
}

/// `sorted[floor(percentile * n)]`
fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let idx = (percentile * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
