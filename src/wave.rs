//! Waveform geometry. Pure point computation; drawing lives in `graphics`.

use glam::Vec2;
use std::f32::consts::PI;

use crate::bands::BandRenderParams;

/// Envelope sharpness. At the canvas edges the bell curve is down to
/// exp(-6.25), flattening every wave onto the shared center line.
const ENVELOPE_SHARPNESS: f32 = 5.0;

/// Fixed phase offset between adjacent bands.
const BAND_PHASE_STEP: f32 = PI / 5.0;

/// Computes one plot point per integer x column in `[0, canvas_width)`.
///
/// The wave oscillates `params.wave_frequency` times across the canvas,
/// shaped by a Gaussian envelope peaking at the horizontal center so every
/// band starts and ends at `vertical_center` regardless of amplitude.
pub fn compute_wave_points(
    params: &BandRenderParams,
    band_index: usize,
    clock_value: f32,
    canvas_width: u32,
    vertical_center: f32,
) -> Vec<Vec2> {
    let width = canvas_width as f32;
    let phase = clock_value + band_index as f32 * BAND_PHASE_STEP;

    (0..canvas_width)
        .map(|x| {
            let x = x as f32;
            let relative_pos = x / width;
            let envelope = (-((relative_pos - 0.5) * ENVELOPE_SHARPNESS).powi(2)).exp();
            let y = vertical_center
                + (x * (2.0 * PI * params.wave_frequency) / width + phase).sin()
                    * params.amplitude
                    * envelope;
            Vec2::new(x, y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(wave_frequency: f32, amplitude: f32) -> BandRenderParams {
        BandRenderParams {
            wave_frequency,
            amplitude,
        }
    }

    #[test]
    fn test_one_point_per_column() {
        let points = compute_wave_points(&params(3.0, 40.0), 0, 0.0, 800, 300.0);
        assert_eq!(points.len(), 800);
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[799].x, 799.0);
    }

    #[test]
    fn test_zero_amplitude_is_flat_at_center() {
        let center = 360.0;
        let points = compute_wave_points(&params(7.5, 0.0), 3, 2.2, 1280, center);
        for p in &points {
            assert_eq!(p.y, center);
        }
    }

    #[test]
    fn test_envelope_flattens_edges() {
        let center = 200.0;
        let amplitude = 120.0;
        let points = compute_wave_points(&params(2.0, amplitude), 0, 0.0, 1000, center);

        // exp(-6.25) ~= 0.0019: both edges stay within a fraction of a
        // pixel of the center line even at large amplitude.
        let edge_bound = amplitude * (-6.25f32).exp() * 1.1;
        assert!((points[0].y - center).abs() <= edge_bound);
        assert!((points[999].y - center).abs() <= edge_bound + amplitude * 0.001);
    }

    #[test]
    fn test_center_column_reaches_full_amplitude() {
        let center = 200.0;
        let width = 1000;
        // Phase chosen so the sine is near a peak at the center column.
        let freq = 1.0;
        let x_mid = 500.0;
        let phase_at_mid = x_mid * (2.0 * PI * freq) / width as f32;
        let clock = PI / 2.0 - phase_at_mid;

        let points = compute_wave_points(&params(freq, 80.0), 0, clock, width, center);
        let peak = (points[500].y - center).abs();
        assert!(peak > 79.0, "expected near-full amplitude, got {}", peak);
    }

    #[test]
    fn test_band_index_offsets_phase() {
        let a = compute_wave_points(&params(2.0, 50.0), 0, 1.0, 400, 100.0);
        let b = compute_wave_points(&params(2.0, 50.0), 1, 1.0, 400, 100.0);
        // Identical params but shifted phase: interior columns differ.
        assert!((a[200].y - b[200].y).abs() > 1e-3);
    }
}
