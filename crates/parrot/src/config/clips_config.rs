use crate::config::{default_clip_host, default_clip_prefix};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where reference clips come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipsConfig {
    /// Host (and path) serving `audio/<prefix>_<NN>.mp3`.
    #[serde(default = "default_clip_host")]
    pub host: String,
    /// Clip file name prefix.
    #[serde(default = "default_clip_prefix")]
    pub prefix: String,
    /// Downloaded clips are kept here (None = platform cache dir).
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for ClipsConfig {
    fn default() -> Self {
        Self {
            host: default_clip_host(),
            prefix: default_clip_prefix(),
            cache_dir: None,
        }
    }
}
