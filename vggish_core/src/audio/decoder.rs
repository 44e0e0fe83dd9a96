use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

use crate::error::{Error, Result};
use crate::params::SAMPLE_RATE;

/// Mono samples at the file's native rate.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file and average its channels down to mono.
pub fn decode_to_mono<P: AsRef<Path>>(path: P) -> Result<DecodedAudio> {
    let path = path.as_ref();

    // -------------------------
    // 1) Decode with Symphonia
    // -------------------------
    let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::decode(path, format!("unsupported format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::decode(path, "no supported audio tracks found"))?;

    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::decode(path, format!("failed to create decoder: {e}")))?;

    let mut interleaved_f32: Vec<f32> = Vec::new();

    // Codec params usually carry the rate; the first decoded buffer is the fallback.
    let mut input_sample_rate: Option<u32> = track.codec_params.sample_rate;
    let mut input_channels: Option<usize> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::ResetRequired) => {
                return Err(Error::decode(path, "chained streams are not supported"));
            }
            Err(SymphoniaError::IoError(_)) => break, // end of file
            Err(e) => return Err(Error::decode(path, format!("error reading packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => {
                log::debug!("skipping corrupt packet in {}", path.display());
                continue;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(Error::decode(path, "decoder reset required mid-stream"));
            }
            Err(e) => return Err(Error::decode(path, format!("unrecoverable decode error: {e}"))),
        };

        input_sample_rate.get_or_insert(decoded.spec().rate);
        input_channels.get_or_insert(decoded.spec().channels.count());

        let mut sbuf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        sbuf.copy_interleaved_ref(decoded);

        interleaved_f32.extend_from_slice(sbuf.samples());
    }

    let sample_rate =
        input_sample_rate.ok_or_else(|| Error::decode(path, "could not determine sample rate"))?;
    let channels =
        input_channels.ok_or_else(|| Error::decode(path, "could not determine channel count"))?;

    if interleaved_f32.is_empty() {
        return Err(Error::decode(path, "decoded audio was empty"));
    }

    // -------------------------
    // 2) Downmix to mono
    // -------------------------
    let samples = downmix(interleaved_f32, channels);

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

fn downmix(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample a mono signal with rubato's FFT resampler.
pub fn resample(mono: Vec<f32>, sr_in: u32, sr_out: u32) -> Result<Vec<f32>> {
    if sr_in == sr_out || mono.is_empty() {
        return Ok(mono);
    }

    let chunk_size: usize = 1024;
    let sub_chunks: usize = 1;

    let mut resampler = Fft::<f32>::new(
        sr_in as usize,
        sr_out as usize,
        chunk_size,
        sub_chunks,
        1,
        FixedSync::Input,
    )
    .map_err(|e| Error::Resample(e.to_string()))?;

    let input_len_frames = mono.len();
    let out_len_frames = resampler.process_all_needed_output_len(input_len_frames);

    let mut out = vec![0.0f32; out_len_frames];

    let input_adapter = InterleavedSlice::new(&mono, 1, input_len_frames)
        .map_err(|e| Error::Resample(format!("bad input adapter: {e}")))?;

    let mut output_adapter = InterleavedSlice::new_mut(&mut out, 1, out_len_frames)
        .map_err(|e| Error::Resample(format!("bad output adapter: {e}")))?;

    let (_frames_read, frames_written) = resampler
        .process_all_into_buffer(&input_adapter, &mut output_adapter, input_len_frames, None)
        .map_err(|e| Error::Resample(e.to_string()))?;

    out.truncate(frames_written);
    Ok(out)
}

/// Decode an audio file to mono f32 samples at 16 kHz.
pub fn decode_to_f32_mono_16k<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let decoded = decode_to_mono(path)?;
    resample(decoded.samples, decoded.sample_rate, SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix(stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix(mono.clone(), 1), mono);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let x = vec![0.25f32; 100];
        assert_eq!(resample(x.clone(), 16_000, 16_000).unwrap(), x);
    }

    #[test]
    fn resample_halves_length_roughly() {
        let x: Vec<f32> = (0..32_000).map(|i| (i as f32 * 0.01).sin()).collect();
        let y = resample(x, 32_000, 16_000).unwrap();
        assert!(y.len() > 15_000 && y.len() < 17_000, "got {}", y.len());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = decode_to_mono("/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
