//! The Working Copy: filesystem operations rooted at a freshly cloned
//! working directory. Thin on purpose — the engine decides what the
//! contents mean, this module only knows how to read/write/enumerate.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SligError;

pub struct WorkingCopy {
    root: PathBuf,
}

impl WorkingCopy {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Basenames of every entry at the root, at this moment.
    pub fn list_entries(&self) -> Result<HashSet<String>, SligError> {
        let mut names = HashSet::new();
        for entry in fs::read_dir(&self.root).map_err(|e| SligError::Io {
            path: self.root.clone(),
            source: e,
        })? {
            let entry = entry.map_err(|e| SligError::Io {
                path: self.root.clone(),
                source: e,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.root.join(name).exists()
    }

    /// First line of `name`, without the trailing newline. `None` if the
    /// file doesn't exist.
    pub fn read_first_line(&self, name: &str) -> Result<Option<String>, SligError> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| SligError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(content.lines().next().unwrap_or("").to_string()))
    }

    /// Write `contents` to `name`, truncating any existing file.
    pub fn write(&self, name: &str, contents: &str) -> Result<(), SligError> {
        let path = self.root.join(name);
        fs::write(&path, contents).map_err(|e| SligError::Io { path, source: e })
    }

    pub fn remove(&self, name: &str) -> Result<(), SligError> {
        let path = self.root.join(name);
        fs::remove_file(&path).map_err(|e| SligError::Io { path, source: e })
    }
}
