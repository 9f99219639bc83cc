//! Shared data model

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Ordered sample timestamps in seconds
///
/// Non-empty, finite, non-negative and non-decreasing. Only the planner and
/// [`TimePointPlan::from_times`] can build one, so every plan in circulation
/// satisfies these invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimePointPlan {
    times: Vec<f64>,
}

impl TimePointPlan {
    pub(crate) fn new_unchecked(times: Vec<f64>) -> Self {
        Self { times }
    }

    /// Build a plan from explicit timestamps supplied by an external trigger
    pub fn from_times(times: Vec<f64>) -> Result<Self, CoreError> {
        if times.is_empty() {
            return Err(CoreError::InvalidArgument(
                "time-point plan must not be empty".to_string(),
            ));
        }

        if let Some(bad) = times.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(CoreError::InvalidArgument(format!(
                "time point {} is not a non-negative number",
                bad
            )));
        }

        if times.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(CoreError::InvalidArgument(
                "time points must be non-decreasing".to_string(),
            ));
        }

        Ok(Self { times })
    }

    /// Timestamps in seconds
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.times.iter().copied()
    }
}

/// Loudness measured around one time point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessSample {
    /// Time point in seconds
    pub time: f64,
    /// Normalized loudness (0.0 = -60 dBFS floor, 1.0 = full scale)
    pub level: f64,
}

/// Ordered loudness readings, one per time point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoudnessSeries {
    samples: Vec<LoudnessSample>,
}

impl LoudnessSeries {
    /// Pair each plan entry with the level at the same position
    pub fn from_plan(plan: &TimePointPlan, levels: &[f64]) -> Result<Self, CoreError> {
        if plan.len() != levels.len() {
            return Err(CoreError::InvalidArgument(format!(
                "plan has {} time points but {} levels were given",
                plan.len(),
                levels.len()
            )));
        }

        let samples = plan
            .iter()
            .zip(levels.iter().copied())
            .map(|(time, level)| LoudnessSample { time, level })
            .collect();

        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[LoudnessSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoudnessSample> {
        self.samples.iter()
    }

    /// Levels only, in series order
    pub fn levels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.level).collect()
    }

    /// Build a new series with every level passed through `f`; times are kept
    pub fn map_levels<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            samples: self
                .samples
                .iter()
                .map(|s| LoudnessSample {
                    time: s.time,
                    level: f(s.level),
                })
                .collect(),
        }
    }
}

impl FromIterator<LoudnessSample> for LoudnessSeries {
    fn from_iter<I: IntoIterator<Item = LoudnessSample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}
