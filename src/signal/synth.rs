//! Synthetic signals for tests, benches and the demo.

use std::f32::consts::PI;

/// Generate a sine wave.
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Amplitude (0.0 to 1.0)
pub fn generate_sine(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Generate a square wave that holds each level for `half_period` samples.
pub fn generate_square(num_samples: usize, half_period: usize, amplitude: f32) -> Vec<f32> {
    let half_period = half_period.max(1);
    (0..num_samples)
        .map(|i| {
            if (i / half_period) % 2 == 0 {
                amplitude
            } else {
                -amplitude
            }
        })
        .collect()
}

/// Generate white noise.
///
/// Uses a simple linear congruential generator for reproducibility.
pub fn generate_white_noise(num_samples: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut state = seed;
    let a: u64 = 6364136223846793005;
    let c: u64 = 1442695040888963407;

    (0..num_samples)
        .map(|_| {
            state = state.wrapping_mul(a).wrapping_add(c);
            let normalized = (state as f32 / u64::MAX as f32) * 2.0 - 1.0;
            amplitude * normalized
        })
        .collect()
}

/// A magnitude grid (row 0 = highest bin) with a bright ridge that sweeps
/// linearly from the bottom row to the top row over the columns.
pub fn chirp_grid(width: u32, height: u32) -> Vec<f32> {
    let mut grid = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let ridge = (height - 1) as f32 * (1.0 - x as f32 / width.max(2).saturating_sub(1) as f32);
            let dist = (y as f32 - ridge).abs();
            grid.push((1.0 - dist / 6.0).clamp(0.0, 1.0) * 0.9 + 0.05);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_length_and_range() {
        let s = generate_sine(440.0, 44100, 0.5, 0.8);
        assert_eq!(s.len(), 22050);
        assert!(s.iter().all(|v| v.abs() <= 0.8 + 1e-6));
    }

    #[test]
    fn test_square_alternates() {
        let s = generate_square(8, 2, 1.0);
        assert_eq!(s, vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_white_noise_is_reproducible() {
        assert_eq!(generate_white_noise(64, 1.0, 7), generate_white_noise(64, 1.0, 7));
    }

    #[test]
    fn test_chirp_grid_in_unit_range() {
        let g = chirp_grid(32, 16);
        assert_eq!(g.len(), 32 * 16);
        assert!(g.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
