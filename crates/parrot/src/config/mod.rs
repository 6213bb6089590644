mod audio_config;
mod clips_config;
#[allow(clippy::module_inception)]
mod config;
mod playback_config;

pub(crate) use {
    audio_config::AudioConfig, clips_config::ClipsConfig, config::Config,
    playback_config::PlaybackConfig,
};

pub(crate) const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
pub(crate) const DEFAULT_STATUS_INTERVAL_MS: u64 = 500;
pub(crate) const DEFAULT_STOP_AT_END: bool = true;
pub(crate) const DEFAULT_RATE_SCALE: f32 = 3.0;

pub(crate) fn default_bits_per_sample() -> u16 {
    DEFAULT_BITS_PER_SAMPLE
}

pub(crate) fn default_status_interval_ms() -> u64 {
    DEFAULT_STATUS_INTERVAL_MS
}

pub(crate) fn default_clip_host() -> String {
    parrot_core::DEFAULT_CLIP_HOST.to_string()
}

pub(crate) fn default_clip_prefix() -> String {
    parrot_core::DEFAULT_CLIP_PREFIX.to_string()
}

pub(crate) fn default_stop_at_end() -> bool {
    DEFAULT_STOP_AT_END
}

pub(crate) fn default_rate_scale() -> f32 {
    DEFAULT_RATE_SCALE
}
