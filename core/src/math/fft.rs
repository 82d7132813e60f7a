use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Helper that wraps the `rustfft` planner for reuse.
pub struct FftHelper {
    fft: Arc<dyn Fft<f64>>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    /// Forward transform; input is zero-padded or truncated to the planned size.
    pub fn forward(&self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&value| Complex64::new(value, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::zero());
        self.fft.process(&mut buffer);
        buffer
    }

    /// Frequency (Hz) of the strongest non-DC bin below Nyquist.
    pub fn dominant_frequency(samples: &[f64], sample_interval: f64) -> Option<f64> {
        if samples.len() < 4 || sample_interval <= 0.0 {
            return None;
        }
        let helper = FftHelper::new(samples.len());
        let spectrum = helper.forward(samples);
        let half = samples.len() / 2;
        let (bin, magnitude) = spectrum[1..=half]
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx + 1, c.norm()))
            .fold((0, 0.0), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });
        if magnitude <= 0.0 {
            return None;
        }
        Some(bin as f64 / (samples.len() as f64 * sample_interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn fft_helper_returns_same_length() {
        let helper = FftHelper::new(4);
        let output = helper.forward(&[1.0, 0.0, -1.0, 0.0]);
        assert_eq!(output.len(), 4);
    }

    #[test]
    fn dominant_frequency_finds_pure_tone() {
        let dt = 0.001;
        let samples: Vec<f64> = (0..1000)
            .map(|i| (2.0 * PI * 50.0 * i as f64 * dt).sin())
            .collect();
        let freq = FftHelper::dominant_frequency(&samples, dt).unwrap();
        assert!((freq - 50.0).abs() < 1.0, "got {}", freq);
    }

    #[test]
    fn flat_signal_has_no_dominant_frequency() {
        assert_eq!(FftHelper::dominant_frequency(&[0.0; 16], 0.002), None);
        assert_eq!(FftHelper::dominant_frequency(&[1.0, 2.0], 0.002), None);
    }
}
