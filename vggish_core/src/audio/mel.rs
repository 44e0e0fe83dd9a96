//! Log-mel front end producing VGGish input examples.

use std::sync::Arc;

use ndarray::{Array2, Array3, s};
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::{Error, Result};
use crate::params;

/// Converts 16 kHz mono PCM into `[examples, 96, 64]` log-mel patches.
pub struct LogMelFrontend {
    window: Vec<f64>,
    hop_len: usize,
    fft_len: usize,
    fft: Arc<dyn RealToComplex<f64>>,
    /// `[fft_len / 2 + 1, NUM_MEL_BINS]`
    mel_matrix: Array2<f64>,
    example_frames: usize,
    example_hop: usize,
}

impl Default for LogMelFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl LogMelFrontend {
    pub fn new() -> Self {
        let window_len = params::stft_window_samples();
        let fft_len = params::fft_length();
        let fft = RealFftPlanner::<f64>::new().plan_fft_forward(fft_len);

        Self {
            window: periodic_hann(window_len),
            hop_len: params::stft_hop_samples(),
            fft_len,
            fft,
            mel_matrix: mel_weight_matrix(
                params::NUM_MEL_BINS,
                fft_len / 2 + 1,
                params::SAMPLE_RATE as f64,
                params::MEL_MIN_HZ,
                params::MEL_MAX_HZ,
            ),
            example_frames: params::example_window_frames(),
            example_hop: params::example_hop_frames(),
        }
    }

    /// Number of STFT frames for a signal of `len` samples. The tail is never padded.
    pub fn num_frames(&self, len: usize) -> usize {
        frame_count(len, self.window.len(), self.hop_len)
    }

    /// Log mel spectrogram, `[frames, 64]`.
    pub fn log_mel(&self, samples: &[f32]) -> Result<Array2<f32>> {
        let n_frames = self.num_frames(samples.len());
        let n_bins = self.fft_len / 2 + 1;
        let mut out = Array2::<f32>::zeros((n_frames, params::NUM_MEL_BINS));

        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut magnitude = ndarray::Array1::<f64>::zeros(n_bins);

        for frame in 0..n_frames {
            let start = frame * self.hop_len;
            input.iter_mut().for_each(|x| *x = 0.0);
            for (i, w) in self.window.iter().enumerate() {
                input[i] = samples[start + i] as f64 * w;
            }

            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|e| Error::Spectrogram(e.to_string()))?;

            for (m, c) in magnitude.iter_mut().zip(spectrum.iter()) {
                *m = c.norm();
            }

            let mel = magnitude.dot(&self.mel_matrix);
            for (dst, energy) in out.row_mut(frame).iter_mut().zip(mel.iter()) {
                *dst = (energy + params::LOG_OFFSET).ln() as f32;
            }
        }

        Ok(out)
    }

    /// Split a 16 kHz signal into non-overlapping 0.96 s examples.
    ///
    /// A trailing partial example is dropped; signals shorter than one
    /// example give an empty `[0, 96, 64]` array.
    pub fn examples(&self, samples: &[f32]) -> Result<Array3<f32>> {
        let log_mel = self.log_mel(samples)?;
        let n_examples = frame_count(log_mel.nrows(), self.example_frames, self.example_hop);

        let mut examples =
            Array3::<f32>::zeros((n_examples, self.example_frames, params::NUM_MEL_BINS));
        for i in 0..n_examples {
            let start = i * self.example_hop;
            examples
                .slice_mut(s![i, .., ..])
                .assign(&log_mel.slice(s![start..start + self.example_frames, ..]));
        }

        log::debug!(
            "log-mel: {} samples -> {} frames -> {} examples",
            samples.len(),
            log_mel.nrows(),
            n_examples
        );
        Ok(examples)
    }
}

fn frame_count(len: usize, window: usize, hop: usize) -> usize {
    if len < window { 0 } else { 1 + (len - window) / hop }
}

/// Hann window without the repeated end point.
fn periodic_hann(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / len as f64).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    1127.0 * (1.0 + hz / 700.0).ln()
}

/// HTK-style triangular filterbank mapping linear bins to mel bands.
///
/// The DC bin contributes to no band.
fn mel_weight_matrix(
    num_mel_bins: usize,
    num_spectrogram_bins: usize,
    sample_rate: f64,
    lower_hz: f64,
    upper_hz: f64,
) -> Array2<f64> {
    let nyquist = sample_rate / 2.0;
    let bin_mel: Vec<f64> = (0..num_spectrogram_bins)
        .map(|i| hz_to_mel(nyquist * i as f64 / (num_spectrogram_bins - 1) as f64))
        .collect();

    let mel_lo = hz_to_mel(lower_hz);
    let mel_hi = hz_to_mel(upper_hz);
    let edges: Vec<f64> = (0..num_mel_bins + 2)
        .map(|i| mel_lo + (mel_hi - mel_lo) * i as f64 / (num_mel_bins + 1) as f64)
        .collect();

    let mut weights = Array2::<f64>::zeros((num_spectrogram_bins, num_mel_bins));
    for band in 0..num_mel_bins {
        let (lower, center, upper) = (edges[band], edges[band + 1], edges[band + 2]);
        for (bin, &mel) in bin_mel.iter().enumerate().skip(1) {
            let rising = (mel - lower) / (center - lower);
            let falling = (upper - mel) / (upper - center);
            weights[[bin, band]] = rising.min(falling).max(0.0);
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(seconds: f32, freq: f32) -> Vec<f32> {
        crate::audio::synthetic_tone(seconds, freq, params::SAMPLE_RATE)
    }

    #[test]
    fn one_second_gives_one_example() {
        let frontend = LogMelFrontend::new();
        let x = tone(1.0, 440.0);
        assert_eq!(frontend.num_frames(x.len()), 98);
        assert_eq!(frontend.examples(&x).unwrap().dim(), (1, 96, 64));
    }

    #[test]
    fn two_seconds_gives_two_examples() {
        let frontend = LogMelFrontend::new();
        let x = tone(2.0, 440.0);
        assert_eq!(frontend.num_frames(x.len()), 198);
        assert_eq!(frontend.examples(&x).unwrap().dim(), (2, 96, 64));
    }

    #[test]
    fn short_input_gives_no_examples() {
        let frontend = LogMelFrontend::new();
        assert_eq!(frontend.log_mel(&[0.0; 399]).unwrap().nrows(), 0);
        assert_eq!(frontend.examples(&[0.0; 8000]).unwrap().dim(), (0, 96, 64));
    }

    #[test]
    fn silence_is_log_offset() {
        let frontend = LogMelFrontend::new();
        let mel = frontend.log_mel(&vec![0.0; 16_000]).unwrap();
        let floor = (params::LOG_OFFSET).ln() as f32;
        assert!(mel.iter().all(|v| (v - floor).abs() < 1e-6));
    }

    #[test]
    fn tone_energy_lands_in_matching_band() {
        let frontend = LogMelFrontend::new();
        let low = frontend.log_mel(&tone(1.0, 300.0)).unwrap();
        let high = frontend.log_mel(&tone(1.0, 4000.0)).unwrap();

        let argmax = |row: ndarray::ArrayView1<f32>| {
            row.iter()
                .enumerate()
                .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
                .0
        };
        assert!(argmax(low.row(10)) < argmax(high.row(10)));
    }

    #[test]
    fn mel_matrix_ignores_dc_and_is_non_negative() {
        let m = mel_weight_matrix(64, 257, 16_000.0, 125.0, 7500.0);
        assert_eq!(m.dim(), (257, 64));
        assert!(m.row(0).iter().all(|&w| w == 0.0));
        assert!(m.iter().all(|&w| (0.0..=1.0).contains(&w)));
        for band in 0..64 {
            assert!(m.column(band).iter().any(|&w| w > 0.0), "band {band} is empty");
        }
    }

    #[test]
    fn periodic_hann_starts_at_zero_and_peaks_mid_window() {
        let w = periodic_hann(400);
        assert_eq!(w[0], 0.0);
        assert!((w[200] - 1.0).abs() < 1e-12);
    }
}
