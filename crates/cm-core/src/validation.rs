//! Pre-submission checks on the captured selfie.
//!
//! Every failure here is detected before any network call. The variants are
//! deliberately distinct because callers react differently: a missing image
//! is a silent no-op (the user cancelled the picker), the other two raise a
//! user-facing alert with different copy.

use std::fmt;

use crate::payload::CapturedImage;

/// Default upper bound for a selfie, 5 MiB.
pub const MAX_SELFIE_BYTES: u64 = 5 * 1024 * 1024;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// A one-shot, user-facing notice. Rendering is the UI layer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SubmissionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionError {
    /// Nothing selected. Not shown to the user.
    NoImage,
    /// The image reports a size above the limit.
    TooLarge { size_bytes: u64, limit_bytes: u64 },
    /// The image has no encoded data to upload.
    MissingEncodedData,
}

impl SubmissionError {
    /// The alert to show for this failure, or `None` for silent failures.
    pub fn alert(&self) -> Option<Alert> {
        match self {
            SubmissionError::NoImage => None,
            SubmissionError::TooLarge {
                size_bytes,
                limit_bytes,
            } => Some(Alert::new(
                "File too large",
                format!(
                    "Please choose a lighter selfie (<{}MB). Your file is {:.1}MB.",
                    bytes_to_mb(Some(*limit_bytes)),
                    bytes_to_mb(Some(*size_bytes)),
                ),
            )),
            SubmissionError::MissingEncodedData => Some(Alert::new(
                "Invalid selfie",
                "We need the image's base64 data to send your selfie.",
            )),
        }
    }
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::NoImage => write!(f, "no image selected"),
            SubmissionError::TooLarge {
                size_bytes,
                limit_bytes,
            } => write!(
                f,
                "selfie exceeds the allowed size ({:.1}MB > {}MB)",
                bytes_to_mb(Some(*size_bytes)),
                bytes_to_mb(Some(*limit_bytes)),
            ),
            SubmissionError::MissingEncodedData => write!(f, "selfie is missing base64 data"),
        }
    }
}

impl std::error::Error for SubmissionError {}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Bytes to megabytes (MiB). An unknown size counts as 0.
pub fn bytes_to_mb(bytes: Option<u64>) -> f64 {
    bytes.map_or(0.0, |b| b as f64 / BYTES_PER_MB)
}

/// Size check on its own. Images that do not report a size pass.
pub fn check_size(image: &CapturedImage, limit_bytes: u64) -> Result<(), SubmissionError> {
    match image.file_size_bytes {
        Some(size) if size > limit_bytes => Err(SubmissionError::TooLarge {
            size_bytes: size,
            limit_bytes,
        }),
        _ => Ok(()),
    }
}

/// Encoded-data check on its own.
pub fn check_encoded_data(image: &CapturedImage) -> Result<(), SubmissionError> {
    image
        .encoded_data()
        .map(|_| ())
        .ok_or(SubmissionError::MissingEncodedData)
}

/// Full gate run before a try-on is submitted.
///
/// Both independent checks run in order (size, then encoded data); the first
/// failure is reported.
pub fn validate_for_submission(
    image: Option<&CapturedImage>,
    limit_bytes: u64,
) -> Result<(), SubmissionError> {
    let image = image.ok_or(SubmissionError::NoImage)?;
    check_size(image, limit_bytes)?;
    check_encoded_data(image)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
