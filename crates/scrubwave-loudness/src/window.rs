//! Measurement windows and their single-pass power accumulator

use scrubwave_core::TimePointPlan;

/// Half the width of a loudness window, in seconds
pub const WINDOW_HALF_WIDTH: f64 = 0.5;

/// Mean power floor; silence reads as -120 dBFS instead of -inf
const POWER_FLOOR: f64 = 1e-12;

/// Half-open interval `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisWindow {
    pub start: f64,
    pub end: f64,
}

impl AnalysisWindow {
    /// Window centered on `time`, clamped at the start of the stream
    pub fn around(time: f64) -> Self {
        Self {
            start: (time - WINDOW_HALF_WIDTH).max(0.0),
            end: time + WINDOW_HALF_WIDTH,
        }
    }

    /// Windows for every point of a plan, in plan order
    ///
    /// Because plans are non-decreasing, both starts and ends come out sorted.
    pub fn for_plan(plan: &TimePointPlan) -> Vec<Self> {
        plan.iter().map(Self::around).collect()
    }
}

/// Convert mean power (linear, full scale = 1.0) to dBFS
pub fn power_to_db(mean_power: f64) -> f64 {
    10.0 * mean_power.max(POWER_FLOOR).log10()
}

/// Accumulates squared samples into every window covering each frame
///
/// Frames must arrive in time order. Windows that end before the current frame
/// are retired, so each frame only touches the windows that overlap it.
pub struct WindowAccumulator {
    windows: Vec<AnalysisWindow>,
    energy: Vec<f64>,
    counts: Vec<u64>,
    first_open: usize,
}

impl WindowAccumulator {
    /// `windows` must be sorted by start and by end, as [`AnalysisWindow::for_plan`] produces
    pub fn new(windows: Vec<AnalysisWindow>) -> Self {
        let n = windows.len();
        Self {
            windows,
            energy: vec![0.0; n],
            counts: vec![0; n],
            first_open: 0,
        }
    }

    /// Add one frame at `time` whose squared samples sum to `energy` over `samples` channels
    pub fn push_frame(&mut self, time: f64, energy: f64, samples: u32) {
        while self.first_open < self.windows.len() && self.windows[self.first_open].end <= time {
            self.first_open += 1;
        }

        for idx in self.first_open..self.windows.len() {
            if self.windows[idx].start > time {
                break;
            }
            self.energy[idx] += energy;
            self.counts[idx] += u64::from(samples);
        }
    }

    /// True once every window has closed; later audio cannot change the result
    pub fn is_done(&self) -> bool {
        self.first_open >= self.windows.len()
    }

    /// Mean power of each window in dBFS
    ///
    /// Stops at the first window that saw no audio, so a truncated stream
    /// yields fewer readings than windows.
    pub fn finish(self) -> Vec<f64> {
        self.energy
            .iter()
            .zip(self.counts.iter())
            .take_while(|(_, count)| **count > 0)
            .map(|(&energy, &count)| power_to_db(energy / count as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_constant(acc: &mut WindowAccumulator, amplitude: f64, rate: u32, seconds: f64) {
        let frames = (rate as f64 * seconds) as u64;
        for i in 0..frames {
            acc.push_frame(i as f64 / rate as f64, amplitude * amplitude, 1);
        }
    }

    #[test]
    fn test_window_clamped_at_start() {
        assert_eq!(AnalysisWindow::around(0.0), AnalysisWindow { start: 0.0, end: 0.5 });
        assert_eq!(AnalysisWindow::around(2.0), AnalysisWindow { start: 1.5, end: 2.5 });
    }

    #[test]
    fn test_power_to_db() {
        assert!((power_to_db(1.0)).abs() < 1e-12);
        assert!((power_to_db(0.01) + 20.0).abs() < 1e-9);
        assert!((power_to_db(0.0) + 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_signal_reads_same_level_everywhere() {
        let windows = vec![
            AnalysisWindow::around(0.0),
            AnalysisWindow::around(1.0),
            AnalysisWindow::around(2.0),
        ];
        let mut acc = WindowAccumulator::new(windows);
        feed_constant(&mut acc, 0.5, 1000, 3.0);

        let readings = acc.finish();
        assert_eq!(readings.len(), 3);
        for db in readings {
            // 0.5 amplitude -> power 0.25 -> about -6.02 dB
            assert!((db - power_to_db(0.25)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_windows_separate_loud_and_quiet_parts() {
        let windows = vec![AnalysisWindow::around(1.0), AnalysisWindow::around(3.0)];
        let mut acc = WindowAccumulator::new(windows);
        feed_constant(&mut acc, 1.0, 100, 2.0);
        for i in 200..400 {
            acc.push_frame(i as f64 / 100.0, 0.0, 1);
        }

        let readings = acc.finish();
        assert!(readings[0].abs() < 1e-9);
        assert!((readings[1] + 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_windows_both_receive_frames() {
        let windows = vec![AnalysisWindow::around(1.0), AnalysisWindow::around(1.0)];
        let mut acc = WindowAccumulator::new(windows);
        feed_constant(&mut acc, 0.1, 100, 2.0);

        let readings = acc.finish();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0], readings[1]);
    }

    #[test]
    fn test_truncated_stream_yields_fewer_readings() {
        let windows = (0..5).map(|i| AnalysisWindow::around(i as f64 * 2.0)).collect();
        let mut acc = WindowAccumulator::new(windows);
        // Audio stops at 4.2s: windows at 6s and 8s never see a frame
        feed_constant(&mut acc, 0.3, 100, 4.2);

        assert!(!acc.is_done());
        assert_eq!(acc.finish().len(), 3);
    }

    #[test]
    fn test_done_after_last_window_closes() {
        let mut acc = WindowAccumulator::new(vec![AnalysisWindow::around(0.0)]);
        acc.push_frame(0.1, 0.0, 2);
        assert!(!acc.is_done());
        acc.push_frame(0.5, 0.0, 2);
        assert!(acc.is_done());
    }
}
