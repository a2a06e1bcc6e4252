//! Append-only log of created resource identifiers.

use crate::Error;
use std::{
    fmt::Display,
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Appends `key:value` lines to a text file.
///
/// Each entry is flushed as soon as it is written so that identifiers of resources created
/// before a failing step survive the failure.
pub struct Record {
    path: PathBuf,
    file: File,
}

impl Record {
    /// Opens `path` for appending, creating it if it does not exist
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a single `key:value` line
    pub fn write(&mut self, key: &str, value: impl Display) -> Result<(), Error> {
        writeln!(self.file, "{key}:{value}")?;
        self.file.flush()?;
        debug!(path = ?self.path, key, "recorded entry");
        Ok(())
    }
}
