//! Loading and saving drawings as TOML

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::Drawing;

/// Errors that can occur when reading or writing drawing files
#[derive(Error, Debug)]
pub enum DrawingIoError {
    #[error("failed to access drawing file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse drawing TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize drawing: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl DrawingIoError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Drawing {
    /// Load a drawing from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, DrawingIoError> {
        let content = std::fs::read_to_string(path).map_err(|e| DrawingIoError::io(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a drawing from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, DrawingIoError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, DrawingIoError> {
        Ok(toml::to_string(self)?)
    }

    /// Write the drawing to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), DrawingIoError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DrawingIoError::io(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| DrawingIoError::io(path, e))
    }
}

/// Default location for a parameterized copy of `input`:
/// `<dir>/parametric/parametric_<name>`
pub fn parametric_output_path(input: &Path) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join("parametric").join(format!("parametric_{}", name))
}

/// Backup location used when `output` already exists: the same file name
/// prefixed with `.backup_`, in the same directory
pub fn backup_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".backup_{}", name))
}

/// Move an existing `output` out of the way. Returns the backup path when a
/// file was moved.
pub fn backup_existing(output: &Path) -> Result<Option<PathBuf>, DrawingIoError> {
    if !output.exists() {
        return Ok(None);
    }
    let backup = backup_path(output);
    std::fs::rename(output, &backup).map_err(|e| DrawingIoError::io(output, e))?;
    info!(from = %output.display(), to = %backup.display(), "backed up existing output");
    Ok(Some(backup))
}
