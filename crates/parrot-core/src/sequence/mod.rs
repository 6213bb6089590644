mod navigator;

pub use navigator::{ClipUrlTemplate, DEFAULT_CLIP_HOST, DEFAULT_CLIP_PREFIX, SequenceNavigator};
