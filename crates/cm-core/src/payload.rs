//! Wire payload construction for a try-on attempt.
//!
//! A [`TryOnRequestPayload`] is built once per attempt from the captured
//! selfie, the chosen shade name and the raw intensity. Building never
//! touches the network; the only failure is a selfie without encoded data.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::numeric::{clamp, round_to_step};
use crate::palette::{DEFAULT_INTENSITY, INTENSITY_STEP, MAX_INTENSITY, MIN_INTENSITY};

// ---------------------------------------------------------------------------
// CapturedImage
// ---------------------------------------------------------------------------

/// A selfie produced by a camera or library picker.
///
/// Only `base64` is required for submission; everything else is metadata the
/// picker may or may not report.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CapturedImage {
    /// Opaque local handle (file path, content URI, ...).
    pub uri: String,
    pub base64: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mime_type: Option<String>,
}

impl CapturedImage {
    /// Encoded bytes, treating an empty string the same as absent.
    pub fn encoded_data(&self) -> Option<&str> {
        self.base64.as_deref().filter(|b| !b.is_empty())
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Selfies run to megabytes; print the length, not the data.
        f.debug_struct("CapturedImage")
            .field("uri", &self.uri)
            .field("base64_len", &self.base64.as_ref().map(String::len))
            .field("file_size_bytes", &self.file_size_bytes)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TryOnRequestPayload
// ---------------------------------------------------------------------------

/// Body of `POST /api/try-on`, serialized with snake_case field names.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryOnRequestPayload {
    pub selfie: String,
    pub color: String,
    /// Multiple of 5 in `[0, 100]`.
    pub intensity: u8,
    pub request_id: String,
}

impl fmt::Debug for TryOnRequestPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryOnRequestPayload")
            .field("selfie_len", &self.selfie.len())
            .field("color", &self.color)
            .field("intensity", &self.intensity)
            .field("request_id", &self.request_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PayloadError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The captured image carries no (or empty) base64 data.
    MissingSelfieData,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::MissingSelfieData => write!(f, "selfie must include base64 data"),
        }
    }
}

impl std::error::Error for PayloadError {}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Snap a raw intensity to the nearest step of 5 and bound it to `[0, 100]`.
///
/// Snapping happens before clamping, so 103 rounds to 105 and is then pulled
/// back to 100. `None` yields the default intensity; `NaN` clamps to 0.
pub fn snap_intensity(value: Option<f64>) -> u8 {
    let Some(v) = value else {
        return DEFAULT_INTENSITY;
    };
    let snapped = round_to_step(v, f64::from(INTENSITY_STEP));
    clamp(snapped, f64::from(MIN_INTENSITY), f64::from(MAX_INTENSITY)) as u8
}

/// Mint a correlation id: `req-<unix millis>-<8 random hex chars>`.
pub fn create_request_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("req-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Build the wire payload for one attempt.
///
/// `color` is passed through verbatim. When `request_id` is `None` a fresh one
/// is minted.
pub fn build_payload(
    image: &CapturedImage,
    color: &str,
    intensity: Option<f64>,
    request_id: Option<&str>,
) -> Result<TryOnRequestPayload, PayloadError> {
    let selfie = image.encoded_data().ok_or(PayloadError::MissingSelfieData)?;

    Ok(TryOnRequestPayload {
        selfie: selfie.to_string(),
        color: color.to_string(),
        intensity: snap_intensity(intensity),
        request_id: request_id.map_or_else(create_request_id, str::to_string),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn image_with(base64: Option<&str>) -> CapturedImage {
        CapturedImage {
            uri: "file:///tmp/selfie.jpg".to_string(),
            base64: base64.map(str::to_string),
            ..CapturedImage::default()
        }
    }

    #[test]
    fn snap_intensity_defaults_when_absent() {
        assert_eq!(snap_intensity(None), 50);
    }

    #[test]
    fn snap_intensity_snaps_then_clamps() {
        assert_eq!(snap_intensity(Some(63.0)), 65);
        assert_eq!(snap_intensity(Some(62.0)), 60);
        assert_eq!(snap_intensity(Some(103.0)), 100);
        assert_eq!(snap_intensity(Some(-4.0)), 0);
        assert_eq!(snap_intensity(Some(f64::NAN)), 0);
        assert_eq!(snap_intensity(Some(f64::INFINITY)), 100);
    }

    #[test]
    fn snap_intensity_is_multiple_of_five_in_range() {
        let mut v = -300.0;
        while v <= 300.0 {
            let s = snap_intensity(Some(v));
            assert!(s <= 100, "v={v} -> {s}");
            assert_eq!(s % 5, 0, "v={v} -> {s}");
            v += 0.9;
        }
    }

    #[test]
    fn build_payload_scenario() {
        let p = build_payload(&image_with(Some("abc")), "Sunlit Amber", Some(63.0), Some("req-1"))
            .unwrap();
        assert_eq!(
            p,
            TryOnRequestPayload {
                selfie: "abc".to_string(),
                color: "Sunlit Amber".to_string(),
                intensity: 65,
                request_id: "req-1".to_string(),
            }
        );
    }

    #[test]
    fn build_payload_rejects_missing_or_empty_base64() {
        for b in [None, Some("")] {
            let err = build_payload(&image_with(b), "Copper Bloom", None, None).unwrap_err();
            assert_eq!(err, PayloadError::MissingSelfieData);
            assert_eq!(err.to_string(), "selfie must include base64 data");
        }
    }

    #[test]
    fn build_payload_mints_request_id_when_absent() {
        let p = build_payload(&image_with(Some("abc")), "Lilac Mist", None, None).unwrap();
        assert!(p.request_id.starts_with("req-"));
        assert_eq!(p.intensity, 50);
        assert_eq!(p.color, "Lilac Mist");
    }

    #[test]
    fn payload_serializes_snake_case() {
        let p = build_payload(&image_with(Some("abc")), "Soft Slate", Some(40.0), Some("r9"))
            .unwrap();
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "selfie": "abc",
                "color": "Soft Slate",
                "intensity": 40,
                "request_id": "r9"
            })
        );
    }

    #[test]
    fn request_id_format() {
        let id = create_request_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3, "{id}");
        assert_eq!(parts[0], "req");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn request_ids_do_not_collide() {
        let ids: HashSet<String> = (0..5_000).map(|_| create_request_id()).collect();
        assert_eq!(ids.len(), 5_000);
    }

    #[test]
    fn debug_does_not_print_selfie_bytes() {
        let img = image_with(Some("c2VjcmV0LXNlbGZpZQ=="));
        let dbg = format!("{img:?}");
        assert!(!dbg.contains("c2VjcmV0"));
        assert!(dbg.contains("base64_len"));
    }
}
