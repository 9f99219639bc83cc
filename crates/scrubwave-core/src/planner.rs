//! Evenly spaced sample timestamps

use tracing::debug;

use crate::error::CoreError;
use crate::types::TimePointPlan;

/// Largest sample count a plan may hold
pub const MAX_SAMPLE_COUNT: usize = 100_000;

/// Produces the time points at which loudness is sampled
pub struct TimePointPlanner;

impl TimePointPlanner {
    /// Plan `sample_count` timestamps across `duration_seconds`
    ///
    /// Point `i` sits at `round(i * duration / count)`. If rounding up would
    /// reach the duration itself the value is floored instead, so every point
    /// stays inside `[0, duration)` and the sequence stays non-decreasing.
    pub fn plan(duration_seconds: f64, sample_count: usize) -> Result<TimePointPlan, CoreError> {
        if sample_count == 0 {
            return Err(CoreError::InvalidArgument(
                "sample count must be at least 1".to_string(),
            ));
        }

        if sample_count > MAX_SAMPLE_COUNT {
            return Err(CoreError::InvalidArgument(format!(
                "sample count {} exceeds the maximum of {}",
                sample_count, MAX_SAMPLE_COUNT
            )));
        }

        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(CoreError::InvalidArgument(format!(
                "duration must be a positive number of seconds, got {}",
                duration_seconds
            )));
        }

        let interval = duration_seconds / sample_count as f64;
        let times: Vec<f64> = (0..sample_count)
            .map(|i| {
                let exact = i as f64 * interval;
                let rounded = exact.round();
                if rounded >= duration_seconds {
                    exact.floor()
                } else {
                    rounded
                }
            })
            .collect();

        debug!(
            "Planned {} time points over {:.1}s (interval {:.3}s)",
            sample_count, duration_seconds, interval
        );

        Ok(TimePointPlan::new_unchecked(times))
    }
}
