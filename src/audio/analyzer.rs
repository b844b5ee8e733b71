use rustfft::{num_complex::Complex, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

/// Transform size. 2048 samples give 1024 magnitude bins, the resolution
/// the band table is calibrated for.
pub const FFT_SIZE: usize = 2048;

/// Number of frequency bins in a snapshot.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// Smoothing over linear magnitudes: new = 0.3 * old + 0.7 * current.
/// Low on purpose; the waves should react, not drift.
const SMOOTHING: f32 = 0.3;

/// dB window mapped onto the 0-255 byte range.
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// Frequency analyzer producing byte-magnitude snapshots.
///
/// Keeps a rolling window of the most recent `FFT_SIZE` mono samples and,
/// on `refresh`, runs a Hann-windowed FFT, smooths the linear magnitudes
/// against the previous frame, and quantizes to 0-255 over a fixed dB
/// window. The output buffer is allocated once and refreshed in place.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
    magnitudes: Vec<u8>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        Self {
            fft,
            window: Self::hann_window(FFT_SIZE),
            samples: VecDeque::with_capacity(FFT_SIZE),
            smoothed: vec![0.0; BIN_COUNT],
            magnitudes: vec![0; BIN_COUNT],
        }
    }

    fn hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    pub fn bin_count(&self) -> usize {
        BIN_COUNT
    }

    /// Appends mono samples, keeping only the most recent `FFT_SIZE`.
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.samples.extend(samples.iter().copied());
        let excess = self.samples.len().saturating_sub(FFT_SIZE);
        if excess > 0 {
            self.samples.drain(..excess);
        }
    }

    /// Drops all accumulated signal and smoothing history so a snapshot
    /// taken after a source switch cannot show the previous input.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.smoothed.fill(0.0);
        self.magnitudes.fill(0);
    }

    /// Recomputes the byte magnitudes from the current sample window and
    /// returns the shared buffer. Synchronous and cheap enough per frame.
    pub fn refresh(&mut self) -> &[u8] {
        let mut buffer: Vec<Complex<f32>> = self
            .samples
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        buffer.resize(FFT_SIZE, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        for (i, c) in buffer[..BIN_COUNT].iter().enumerate() {
            let magnitude = c.norm() * 2.0 / FFT_SIZE as f32;
            self.smoothed[i] = SMOOTHING * self.smoothed[i] + (1.0 - SMOOTHING) * magnitude;

            let db = 20.0 * self.smoothed[i].max(f32::MIN_POSITIVE).log10();
            let scaled = (db - MIN_DB) / (MAX_DB - MIN_DB);
            self.magnitudes[i] = (scaled.clamp(0.0, 1.0) * 255.0) as u8;
        }

        &self.magnitudes
    }
}

/// Center frequency of a bin, matching how the debug overlay labels the
/// band ranges: bin / bin_count * nyquist.
pub fn bin_frequency_hz(bin: usize, sample_rate: u32) -> f32 {
    (bin as f32 / BIN_COUNT as f32) * (sample_rate as f32 / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(frequency_bins: f32, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| (2.0 * PI * frequency_bins * i as f32 / FFT_SIZE as f32).sin())
            .collect()
    }

    #[test]
    fn test_snapshot_has_fixed_bin_count() {
        let mut analyzer = SpectrumAnalyzer::new();
        analyzer.push_samples(&vec![0.0; FFT_SIZE]);
        assert_eq!(analyzer.refresh().len(), BIN_COUNT);
        assert_eq!(analyzer.bin_count(), 1024);
    }

    #[test]
    fn test_silence_stays_at_floor() {
        let mut analyzer = SpectrumAnalyzer::new();
        analyzer.push_samples(&vec![0.0; FFT_SIZE]);
        assert!(analyzer.refresh().iter().all(|&m| m == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut analyzer = SpectrumAnalyzer::new();
        analyzer.push_samples(&sine(100.0, FFT_SIZE));
        let magnitudes = analyzer.refresh().to_vec();

        assert!(magnitudes[100] > 200, "peak bin read {}", magnitudes[100]);
        assert!(magnitudes[400] < 50, "far bin read {}", magnitudes[400]);
    }

    #[test]
    fn test_smoothing_retains_history_then_decays() {
        let mut analyzer = SpectrumAnalyzer::new();
        analyzer.push_samples(&sine(100.0, FFT_SIZE));
        analyzer.refresh();

        // One silent window: the smoothed magnitude still carries most of
        // the previous energy.
        analyzer.push_samples(&vec![0.0; FFT_SIZE]);
        let after_one = analyzer.refresh()[100];
        assert!(after_one > 200, "smoothing lost history: {}", after_one);

        for _ in 0..30 {
            analyzer.push_samples(&vec![0.0; FFT_SIZE]);
            analyzer.refresh();
        }
        assert_eq!(analyzer.refresh()[100], 0);
    }

    #[test]
    fn test_clear_discards_signal_and_history() {
        let mut analyzer = SpectrumAnalyzer::new();
        analyzer.push_samples(&sine(100.0, FFT_SIZE));
        analyzer.refresh();

        analyzer.clear();
        assert!(analyzer.refresh().iter().all(|&m| m == 0));
    }

    #[test]
    fn test_bin_frequency_mapping() {
        assert_eq!(bin_frequency_hz(0, 44_100), 0.0);
        assert!((bin_frequency_hz(512, 44_100) - 11_025.0).abs() < 1e-3);
        assert!((bin_frequency_hz(1023, 48_000) - 23_976.56).abs() < 0.1);
    }
}
