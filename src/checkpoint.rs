//! Named, atomic persistence of parameter blobs.
//!
//! Each checkpoint is one file `<dir>/<name>.ckpt`. Writes go to a hidden
//! temporary file in the same directory and are renamed into place, so a
//! reader sees either the previous blob or the new one, never a torn write.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{MindError, Result};

const EXTENSION: &str = "ckpt";

#[derive(Clone, Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        CheckpointStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn validate_name(name: &str) -> std::result::Result<(), &'static str> {
        if name.is_empty() {
            return Err("name is empty");
        }
        if name.starts_with('.') || name.contains(|c: char| c == '/' || c == '\\') {
            return Err("name must be a plain file stem");
        }
        Ok(())
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        Self::validate_name(name).is_ok() && self.path_for(name).is_file()
    }

    /// Atomically replace the checkpoint `name` with `bytes`.
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        Self::validate_name(name).map_err(|reason| MindError::checkpoint_save(name, reason))?;
        self.write_atomic(name, bytes)
            .map_err(|e| MindError::checkpoint_save(name, e))
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{}.{}.tmp", name, EXTENSION));
        let result = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, self.path_for(name))
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    pub fn load(&self, name: &str) -> Result<Vec<u8>> {
        Self::validate_name(name).map_err(|reason| MindError::checkpoint_load(name, reason))?;
        fs::read(self.path_for(name)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MindError::checkpoint_load(name, "not found"),
            _ => MindError::checkpoint_load(name, e),
        })
    }
}
