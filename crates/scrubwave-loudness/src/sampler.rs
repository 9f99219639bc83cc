//! Loudness sampling: one pass over the source, one level per time point

use std::time::{Duration, Instant};

use scrubwave_core::{LoudnessSample, LoudnessSeries, TimePointPlan};
use tracing::{debug, info, warn};

use crate::analyzer::{db_to_level, AudioAnalyzer};
use crate::error::LoudnessError;
use crate::source::{pump, AudioFetcher, AudioSource};
use crate::stream;
use crate::window::AnalysisWindow;

/// Level used for time points the analyzer produced no reading for
pub const DEFAULT_LEVEL: f64 = 0.5;

/// Sampler tuning
#[derive(Debug, Clone, Copy)]
pub struct SamplerOptions {
    /// Wall-clock budget for fetching and analyzing the whole source
    pub timeout: Duration,
    /// Chunks buffered between the reader and the analyzer
    pub buffer_chunks: usize,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            buffer_chunks: 32,
        }
    }
}

/// Measures loudness around every point of a plan
pub struct LoudnessSampler<A> {
    analyzer: A,
    fetcher: AudioFetcher,
    options: SamplerOptions,
}

impl<A: AudioAnalyzer> LoudnessSampler<A> {
    pub fn new(analyzer: A, fetcher: AudioFetcher, options: SamplerOptions) -> Self {
        Self {
            analyzer,
            fetcher,
            options,
        }
    }

    /// Sample `source` at every time point in `plan`
    ///
    /// The result has exactly one entry per plan entry, in plan order. If the
    /// audio runs out early the remaining points get [`DEFAULT_LEVEL`].
    /// Exceeding the timeout drops the fetch, the pipe and any analyzer
    /// process.
    pub async fn sample(
        &self,
        source: &AudioSource,
        plan: &TimePointPlan,
    ) -> Result<LoudnessSeries, LoudnessError> {
        let budget = self.options.timeout;

        match tokio::time::timeout(budget, self.sample_within_budget(source, plan)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Loudness analysis of {} exceeded {:?}", source.describe(), budget);
                Err(LoudnessError::Timeout(budget))
            }
        }
    }

    async fn sample_within_budget(
        &self,
        source: &AudioSource,
        plan: &TimePointPlan,
    ) -> Result<LoudnessSeries, LoudnessError> {
        let started = Instant::now();
        let opened = self.fetcher.open(source).await?;

        info!(
            "Sampling {} points from {} with {}",
            plan.len(),
            source.describe(),
            self.analyzer.name()
        );

        let windows = AnalysisWindow::for_plan(plan);
        let (tx, audio) = stream::bounded(self.options.buffer_chunks, opened.hint);

        let (pumped, analyzed) = tokio::join!(
            pump(opened.body, tx),
            self.analyzer.analyze(audio, &windows)
        );

        // A broken source explains any decoder failure that followed it
        let delivered = pumped?;
        let readings = analyzed?;

        debug!(
            "Read {} of {:?} bytes, {} readings in {:?}",
            delivered,
            opened.content_length,
            readings.len(),
            started.elapsed()
        );

        Ok(assemble_series(plan, &readings))
    }
}

/// Pair plan entries with dB readings, filling or trimming to the plan length
pub fn assemble_series(plan: &TimePointPlan, readings_db: &[f64]) -> LoudnessSeries {
    if readings_db.len() < plan.len() {
        warn!(
            "Only {} of {} time points were measured, using level {} for the rest",
            readings_db.len(),
            plan.len(),
            DEFAULT_LEVEL
        );
    } else if readings_db.len() > plan.len() {
        debug!(
            "Ignoring {} surplus readings",
            readings_db.len() - plan.len()
        );
    }

    plan.iter()
        .enumerate()
        .map(|(i, time)| LoudnessSample {
            time,
            level: readings_db.get(i).copied().map_or(DEFAULT_LEVEL, db_to_level),
        })
        .collect()
}
