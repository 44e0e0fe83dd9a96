//! Fixed parameters of the published VGGish model.
//!
//! These must match the values the checkpoint was trained with.

/// Rate every input is resampled to before feature extraction.
pub const SAMPLE_RATE: u32 = 16_000;

/// STFT analysis window, seconds.
pub const STFT_WINDOW_SECONDS: f64 = 0.025;
/// STFT hop, seconds.
pub const STFT_HOP_SECONDS: f64 = 0.010;

pub const NUM_MEL_BINS: usize = 64;
pub const MEL_MIN_HZ: f64 = 125.0;
pub const MEL_MAX_HZ: f64 = 7500.0;

/// Added to mel energies before the log so silence stays finite.
pub const LOG_OFFSET: f64 = 0.01;

/// Each example covers 0.96 s of audio and examples do not overlap.
pub const EXAMPLE_WINDOW_SECONDS: f64 = 0.96;
pub const EXAMPLE_HOP_SECONDS: f64 = 0.96;

pub const EMBEDDING_SIZE: usize = 128;

pub const QUANTIZE_MIN_VAL: f64 = -2.0;
pub const QUANTIZE_MAX_VAL: f64 = 2.0;

pub const PCA_EIGEN_VECTORS_NAME: &str = "pca_eigen_vectors";
pub const PCA_MEANS_NAME: &str = "pca_means";

/// STFT window length in samples (400).
pub fn stft_window_samples() -> usize {
    (SAMPLE_RATE as f64 * STFT_WINDOW_SECONDS).round() as usize
}

/// STFT hop length in samples (160).
pub fn stft_hop_samples() -> usize {
    (SAMPLE_RATE as f64 * STFT_HOP_SECONDS).round() as usize
}

/// FFT length: the window rounded up to a power of two (512).
pub fn fft_length() -> usize {
    stft_window_samples().next_power_of_two()
}

/// Log-mel frames per example (96).
pub fn example_window_frames() -> usize {
    (EXAMPLE_WINDOW_SECONDS / STFT_HOP_SECONDS).round() as usize
}

/// Log-mel frames between example starts (96).
pub fn example_hop_frames() -> usize {
    (EXAMPLE_HOP_SECONDS / STFT_HOP_SECONDS).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_sizes_match_published_model() {
        assert_eq!(stft_window_samples(), 400);
        assert_eq!(stft_hop_samples(), 160);
        assert_eq!(fft_length(), 512);
        assert_eq!(example_window_frames(), 96);
        assert_eq!(example_hop_frames(), 96);
    }
}
