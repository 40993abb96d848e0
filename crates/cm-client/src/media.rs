//! Media-source capability.
//!
//! Platform camera/library pickers sit behind [`MediaSource`]; orchestration
//! only sees an async call that yields an optional image (`None` = the user
//! cancelled). [`FileMediaSource`] is the desktop/CLI implementation.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cm_core::CapturedImage;

// ---------------------------------------------------------------------------
// MediaError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum MediaError {
    /// Reading the image failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The picker reported an error of its own.
    Picker(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Io { path, source } => {
                write!(f, "could not read {}: {source}", path.display())
            }
            MediaError::Picker(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MediaError::Io { source, .. } => Some(source),
            MediaError::Picker(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// MediaSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Acquire one image. `Ok(None)` means the user cancelled.
    async fn pick(&self) -> Result<Option<CapturedImage>, MediaError>;
}

/// Reads a selfie from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileMediaSource {
    path: PathBuf,
}

impl FileMediaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MediaSource for FileMediaSource {
    async fn pick(&self) -> Result<Option<CapturedImage>, MediaError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| MediaError::Io {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(CapturedImage {
            uri: self.path.display().to_string(),
            file_size_bytes: Some(bytes.len() as u64),
            base64: Some(STANDARD.encode(&bytes)),
            width: None,
            height: None,
            mime_type: mime_from_extension(&self.path).map(str::to_string),
        }))
    }
}

/// Image mime type guessed from the file extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
