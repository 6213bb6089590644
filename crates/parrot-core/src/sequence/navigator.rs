use crate::audio::Locator;

use tracing::debug;

/// Host used for reference clips unless configured otherwise.
pub const DEFAULT_CLIP_HOST: &str = "s3.eu-central-1.amazonaws.com/liutaoran.com";
/// File name prefix used for reference clips unless configured otherwise.
pub const DEFAULT_CLIP_PREFIX: &str = "10_spektrum_a2-1";

/// `https://<host>/audio/<prefix>_<NN>.mp3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipUrlTemplate {
    /// Host plus optional path, without scheme.
    pub host: String,
    /// File name before the index.
    pub prefix: String,
}

impl ClipUrlTemplate {
    /// Template for `host` and `prefix`.
    pub fn new(host: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            prefix: prefix.into(),
        }
    }

    /// URL of clip `index`, zero-padded to at least two digits. Wider
    /// indices keep all their digits.
    pub fn url_for(&self, index: u32) -> String {
        format!(
            "https://{}/audio/{}_{:02}.mp3",
            self.host.trim_end_matches('/'),
            self.prefix,
            index
        )
    }
}

impl Default for ClipUrlTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_CLIP_HOST, DEFAULT_CLIP_PREFIX)
    }
}

/// Position in the ordered collection of reference clips.
///
/// The index never goes below 0; stepping back from the first clip stays
/// on it. There is no upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceNavigator {
    index: u32,
    template: ClipUrlTemplate,
}

impl SequenceNavigator {
    /// Navigator starting at `index`.
    pub fn new(index: u32, template: ClipUrlTemplate) -> Self {
        Self { index, template }
    }

    /// Current clip index.
    pub fn current(&self) -> u32 {
        self.index
    }

    /// Move by `delta`, saturating at 0. Returns the new index.
    pub fn advance(&mut self, delta: i64) -> u32 {
        let target = i64::from(self.index).saturating_add(delta);
        self.index = u32::try_from(target.max(0)).unwrap_or(u32::MAX);
        debug!(index = self.index, delta, "Clip index changed");
        self.index
    }

    /// Locator of clip `index`.
    pub fn locator_for(&self, index: u32) -> Locator {
        Locator::Remote(self.template.url_for(index))
    }

    /// Locator of the current clip.
    pub fn current_locator(&self) -> Locator {
        self.locator_for(self.index)
    }
}
