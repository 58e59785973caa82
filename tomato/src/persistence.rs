use crate::config::project_dirs;
use crate::timer::CountStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not determine data directory")]
    NoDataDir,
    #[error("state file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("state file is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    completed_work_count: u32,
}

/// Keeps the completed work count in `state.json` under the data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn open_default() -> Result<Self, StoreError> {
        let proj_dirs = project_dirs().ok_or(StoreError::NoDataDir)?;
        Ok(Self::in_dir(proj_dirs.data_dir()))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("state.json")
    }
}

impl CountStore for FileStore {
    fn load_count(&self) -> Result<u32, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Ok(0);
        }
        let json = fs::read_to_string(path)?;
        let state: StoredState = serde_json::from_str(&json)?;
        Ok(state.completed_work_count)
    }

    fn save_count(&self, count: u32) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&StoredState {
            completed_work_count: count,
        })?;
        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.dir.join("state.json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(tmp, self.path())?;
        Ok(())
    }
}
