//! Persisted position in the reference clip sequence.
//!
//! A single decimal integer in a small file, read once at startup and
//! rewritten on every navigation command.

use crate::{AppError, AppResult};

use std::{
    fs,
    io::{ErrorKind, Write},
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use tracing::{debug, instrument, warn};

/// File name of the persisted index.
pub const INDEX_FILE_NAME: &str = "current_clip_index";

/// Reads and writes the current clip index.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    /// Store backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store in `dir` under the well-known file name.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(INDEX_FILE_NAME))
    }

    /// Stored index. Missing file means 0; unreadable, unparsable or
    /// negative content also means 0 and is logged.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub fn load(&self) -> u32 {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored clip index, starting at 0");
                return 0;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored clip index, starting at 0");
                return 0;
            }
        };

        match contents.trim().parse::<u32>() {
            Ok(index) => index,
            Err(e) => {
                warn!(contents = %contents.trim(), error = %e, "Invalid stored clip index, starting at 0");
                0
            }
        }
    }

    /// Persist `index` (atomic write).
    #[track_caller]
    #[instrument(skip(self), fields(path = ?self.path))]
    pub fn save(&self, index: u32) -> AppResult<()> {
        let storage_error = |reason: String| AppError::StorageError {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| storage_error(format!("Failed to create index dir: {}", e)))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut temp_file = fs::File::create(&temp_path)
            .map_err(|e| storage_error(format!("Failed to create temp index file: {}", e)))?;
        temp_file
            .write_all(index.to_string().as_bytes())
            .map_err(|e| storage_error(format!("Failed to write temp index file: {}", e)))?;
        temp_file
            .sync_all()
            .map_err(|e| storage_error(format!("Failed to sync temp index file: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| storage_error(format!("Failed to rename temp index file: {}", e)))?;

        debug!(index, "Clip index saved");

        Ok(())
    }
}
