pub mod decoder;
pub mod mel;

pub use decoder::{DecodedAudio, decode_to_f32_mono_16k, decode_to_mono, resample};
pub use mel::LogMelFrontend;

/// Sine tone used when no input file is given.
///
/// Defaults elsewhere are 5 s at 1 kHz sampled at 44.1 kHz.
pub fn synthetic_tone(seconds: f32, freq_hz: f32, sample_rate: u32) -> Vec<f32> {
    let n = (seconds * sample_rate as f32) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * freq_hz * t).sin()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_has_expected_length_and_range() {
        let tone = synthetic_tone(5.0, 1000.0, 44_100);
        assert_eq!(tone.len(), 5 * 44_100);
        assert!(tone.iter().all(|s| (-1.0..=1.0).contains(s)));
    }
}
