use crate::{AudioError, CoreResult};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

const CHUNK_FRAMES: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Converts decoded clips to the output device's sample rate.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
}

impl Resampler {
    /// Build an FFT resampler for interleaved audio with `channels` channels.
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> CoreResult<Self> {
        let channels = usize::from(channels.max(1));

        let resampler = Fft::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            CHUNK_FRAMES,
            SUB_CHUNKS,
            channels,
            FixedSync::Input,
        )
        .map_err(|e| AudioError::ResamplingError {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            channels,
        })
    }

    /// Resample a whole clip. The input is zero-padded to whole chunks and
    /// flushed until the filter delay has passed; the delay is then dropped
    /// from the front and the output trimmed to the expected length.
    #[track_caller]
    #[instrument(skip(self, samples), fields(len = samples.len()))]
    pub fn resample(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let input_frames = samples.len() / self.channels;
        let expected_frames =
            (input_frames as f64 * self.output_rate as f64 / self.input_rate as f64) as usize;
        let delay_frames = self.resampler.output_delay();
        let wanted_frames = expected_frames + delay_frames;
        let mut output = Vec::with_capacity(wanted_frames * self.channels);

        let chunk_len = CHUNK_FRAMES * self.channels;
        let silence = vec![0.0f32; chunk_len];
        let mut chunks = samples.chunks(chunk_len);
        let flush_chunks = (delay_frames as f64 * self.input_rate as f64
            / self.output_rate as f64
            / CHUNK_FRAMES as f64)
            .ceil() as usize
            + 2;
        let max_chunks = samples.len().div_ceil(chunk_len) + flush_chunks;

        for _ in 0..max_chunks {
            if output.len() / self.channels >= wanted_frames {
                break;
            }
            let chunk = chunks.next().unwrap_or(silence.as_slice());
            self.process_chunk(chunk, &mut output)?;
        }

        output.drain(..(delay_frames * self.channels).min(output.len()));
        output.truncate(expected_frames * self.channels);

        debug!(
            input_frames,
            output_frames = output.len() / self.channels,
            input_rate = self.input_rate,
            output_rate = self.output_rate,
            "Clip resampled"
        );

        Ok(output)
    }

    #[track_caller]
    fn process_chunk(&mut self, chunk: &[f32], output: &mut Vec<f32>) -> CoreResult<()> {
        let chunk_len = CHUNK_FRAMES * self.channels;
        let mut input_chunk = chunk.to_vec();
        input_chunk.resize(chunk_len, 0.0);

        let max_out_frames = self.resampler.output_frames_max();
        let mut output_chunk = vec![0.0f32; max_out_frames * self.channels];

        let input_adapter = InterleavedSlice::new(&input_chunk, self.channels, CHUNK_FRAMES)
            .map_err(|e| AudioError::ResamplingError {
                reason: format!("Failed to create input adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut output_adapter =
            InterleavedSlice::new_mut(&mut output_chunk, self.channels, max_out_frames).map_err(
                |e| AudioError::ResamplingError {
                    reason: format!("Failed to create output adapter: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                },
            )?;

        let (_, frames_written) = self
            .resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| AudioError::ResamplingError {
                reason: format!("Resampling failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        output.extend_from_slice(&output_chunk[..frames_written * self.channels]);
        Ok(())
    }
}
