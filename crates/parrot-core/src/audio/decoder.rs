use crate::{AudioError, CoreResult};

use std::{io::Cursor, panic::Location};

use error_location::ErrorLocation;
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use tracing::{debug, instrument};

/// Decoded PCM, interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    /// Sample rate of `samples`.
    pub sample_rate: u32,
    /// Channel count of `samples`.
    pub channels: u16,
}

impl DecodedAudio {
    /// Samples per channel.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Average all channels into one.
    pub fn into_mono(self) -> Self {
        if self.channels <= 1 {
            return self;
        }

        let channels = self.channels as usize;
        let samples = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
        }
    }
}

/// Decode a WAV, MP3 or other supported clip.
///
/// WAV data (a `RIFF` header) goes through `hound`; everything else is
/// probed by `symphonia`, with `extension` as a format hint.
#[track_caller]
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> CoreResult<DecodedAudio> {
    let decoded = if bytes.starts_with(b"RIFF") {
        decode_wav(bytes)?
    } else {
        decode_compressed(bytes, extension)?
    };

    debug!(
        sample_rate = decoded.sample_rate,
        channels = decoded.channels,
        frames = decoded.frames(),
        "Clip decoded"
    );

    Ok(decoded)
}

#[track_caller]
fn decode_wav(bytes: Vec<u8>) -> CoreResult<DecodedAudio> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::LoadError {
        reason: format!("Invalid WAV header: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>(),
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
        }
    }
    .map_err(|e| AudioError::LoadError {
        reason: format!("Failed to read WAV samples: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

#[track_caller]
fn decode_compressed(bytes: Vec<u8>, extension: Option<&str>) -> CoreResult<DecodedAudio> {
    let load_error = |reason: String| AudioError::LoadError {
        reason,
        location: ErrorLocation::from(Location::caller()),
    };

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| load_error(format!("Unrecognized audio format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| load_error("No audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| load_error("Audio track has no sample rate".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| load_error(format!("Unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(load_error(format!("Failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // A corrupt frame is skipped rather than failing the whole clip.
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!(reason, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(load_error(format!("Failed to decode packet: {}", e))),
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}
