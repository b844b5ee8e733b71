//! Frequency-band table and the per-band animation parameter mapping.

/// Minimum wave height in pixels; live amplitude grows from here.
const BASE_THICKNESS: f32 = 70.0;

/// Pixel gain applied to the band's normalized average magnitude.
const AMPLITUDE_GAIN: f32 = 100.0;

/// Gain of the deterministic per-band wobble.
const PERTURBATION_GAIN: f32 = 5.0;

/// Upper bound of a single magnitude sample (8-bit encoding).
const MAX_MAGNITUDE: f32 = 255.0;

/// A named, contiguous sub-range of frequency bins drawn as one wave.
///
/// Bin ranges are inclusive and calibrated for a 2048-sample transform
/// (1024 bins). Colors are linear RGBA for the vertex path.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyBand {
    pub name: &'static str,
    pub color: [f32; 4],
    pub glow_color: [f32; 4],
    pub range: (usize, usize),
}

/// The five visualized bands, in increasing bin order.
pub const BANDS: [FrequencyBand; 5] = [
    FrequencyBand {
        name: "low",
        color: [0.541, 0.169, 0.886, 0.7],
        glow_color: [0.541, 0.169, 0.886, 0.9],
        range: (0, 19),
    },
    FrequencyBand {
        name: "mid-low",
        color: [1.0, 0.0, 1.0, 0.7],
        glow_color: [1.0, 0.0, 1.0, 0.9],
        range: (20, 99),
    },
    FrequencyBand {
        name: "mid",
        color: [1.0, 0.078, 0.576, 0.7],
        glow_color: [1.0, 0.078, 0.576, 0.9],
        range: (100, 299),
    },
    FrequencyBand {
        name: "mid-high",
        color: [0.0, 0.749, 1.0, 0.7],
        glow_color: [0.0, 0.749, 1.0, 0.9],
        range: (300, 599),
    },
    FrequencyBand {
        name: "high",
        color: [0.0, 1.0, 1.0, 0.7],
        glow_color: [0.0, 1.0, 1.0, 0.9],
        range: (600, 1023),
    },
];

/// Per-band, per-frame animation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandRenderParams {
    /// Number of spatial oscillations across the canvas.
    pub wave_frequency: f32,
    /// Wave height in pixels.
    pub amplitude: f32,
}

/// Maps one band of a spectrum snapshot to its animation parameters.
///
/// Pure: identical inputs always yield identical output. With no snapshot
/// (source inactive) each band falls back to a fixed idle wave.
pub fn compute_band_params(
    band: &FrequencyBand,
    band_index: usize,
    snapshot: Option<&[u8]>,
    clock_value: f32,
) -> BandRenderParams {
    let snapshot = match snapshot {
        Some(data) if !data.is_empty() => data,
        _ => return default_band_params(band_index),
    };

    let (start, end) = band.range;
    let safe_start = start.min(snapshot.len() - 1);
    let safe_end = end.min(snapshot.len() - 1);

    let sum: u32 = snapshot[safe_start..=safe_end].iter().map(|&m| m as u32).sum();
    let average = sum as f32 / (safe_end - safe_start + 1) as f32;

    let amplitude = BASE_THICKNESS + (average / MAX_MAGNITUDE) * AMPLITUDE_GAIN;

    // Bass bands oscillate slowly, treble bands quickly, independent of
    // the live data.
    let wave_frequency = 2.0 + (start as f32 / snapshot.len() as f32) * 10.0;

    // Deterministic wobble with a distinct phase per band.
    let perturbation = (clock_value * (band_index as f32 + 1.0)).sin() * PERTURBATION_GAIN;

    BandRenderParams {
        wave_frequency,
        amplitude: amplitude + perturbation,
    }
}

/// Idle visualization when no source is active.
fn default_band_params(band_index: usize) -> BandRenderParams {
    BandRenderParams {
        wave_frequency: 2.0 + band_index as f32 * 0.5,
        amplitude: 20.0 + band_index as f32 * 5.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_table_covers_disjoint_increasing_ranges() {
        for pair in BANDS.windows(2) {
            assert!(pair[0].range.1 < pair[1].range.0, "bands must not overlap");
        }
        assert_eq!(BANDS[0].range.0, 0);
        assert_eq!(BANDS[4].range.1, 1023);
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let snapshot = vec![128u8; 1024];
        let a = compute_band_params(&BANDS[3], 3, Some(&snapshot), 1.75);
        let b = compute_band_params(&BANDS[3], 3, Some(&snapshot), 1.75);
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_params_for_mid_band() {
        let params = compute_band_params(&BANDS[2], 2, None, 0.42);
        assert_eq!(params.wave_frequency, 3.0);
        assert_eq!(params.amplitude, 30.0);
    }

    #[test]
    fn test_empty_snapshot_falls_back_to_defaults() {
        let params = compute_band_params(&BANDS[0], 0, Some(&[]), 0.0);
        assert_eq!(params.wave_frequency, 2.0);
        assert_eq!(params.amplitude, 20.0);
    }

    #[test]
    fn test_degenerate_range_clamps_to_single_sample() {
        // High band against a half-size snapshot: both bounds collapse to
        // the last valid index and the average is that one sample.
        let mut snapshot = vec![0u8; 512];
        snapshot[511] = 200;
        let params = compute_band_params(&BANDS[4], 4, Some(&snapshot), 0.0);

        let expected = BASE_THICKNESS + (200.0 / MAX_MAGNITUDE) * AMPLITUDE_GAIN;
        assert!((params.amplitude - expected).abs() < 1e-4);
    }

    #[test]
    fn test_amplitude_follows_average_magnitude() {
        let quiet = vec![0u8; 1024];
        let loud = vec![255u8; 1024];

        let q = compute_band_params(&BANDS[1], 1, Some(&quiet), 0.0);
        let l = compute_band_params(&BANDS[1], 1, Some(&loud), 0.0);

        assert!((q.amplitude - BASE_THICKNESS).abs() < 1e-4);
        assert!((l.amplitude - (BASE_THICKNESS + AMPLITUDE_GAIN)).abs() < 1e-4);
    }

    #[test]
    fn test_perturbation_is_band_distinct() {
        let snapshot = vec![100u8; 1024];
        let clock = 0.9;
        let a = compute_band_params(&BANDS[1], 1, Some(&snapshot), clock);
        let b = compute_band_params(&BANDS[1], 2, Some(&snapshot), clock);
        // Same band data, different index: only the wobble phase differs.
        assert_eq!(a.wave_frequency, b.wave_frequency);
        assert!((a.amplitude - b.amplitude).abs() > 1e-6);
    }

    #[test]
    fn test_wave_frequency_rises_with_band_start() {
        let snapshot = vec![0u8; 1024];
        let low = compute_band_params(&BANDS[0], 0, Some(&snapshot), 0.0);
        let high = compute_band_params(&BANDS[4], 4, Some(&snapshot), 0.0);
        assert!((low.wave_frequency - 2.0).abs() < 1e-6);
        assert!(high.wave_frequency > low.wave_frequency);
    }
}
