//! Try-on lifecycle state machine.
//!
//! # Design
//!
//! [`TryOnStateMachine`] exclusively owns one [`TryOnState`]. Every status
//! change goes through [`TryOnStateMachine::apply`], which only accepts the
//! legal transitions:
//!
//! ```text
//!            Start                Succeed
//!   Idle ──────────► Loading ──────────────► Success ─┐
//!    ▲                 │  ▲                            │ Start (retry)
//!    │                 │  └────────────────────────────┤
//!    │                 │ Fail                          │
//!    │                 ▼                               │
//!    │               Error ──── Start (retry) ─────────┘
//!    │                 │
//!    └──── Reset ──────┴──── (Reset is legal from any state)
//! ```
//!
//! Field rules enforced here:
//! - `Start` clears `error` but keeps the previous `result`.
//! - `Succeed` stores the result, clears `error`, and resets the
//!   before/after blend to 1.0 (show "after" in full).
//! - `Fail` stores the error and keeps any previous `result`, so the UI can
//!   show the last good result next to the latest failure.
//! - `Reset` reinitialises everything, including a fresh request id.
//!
//! Intensity is always a multiple of 5 in `[0, 100]`; the blend is always in
//! `[0, 1]`.

use std::fmt;

use serde::Serialize;

use crate::numeric::clamp;
use crate::palette::{default_color, PaletteColor, DEFAULT_INTENSITY};
use crate::payload::{create_request_id, snap_intensity};

// ---------------------------------------------------------------------------
// Status / result / error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TryOnStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl TryOnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TryOnStatus::Idle => "idle",
            TryOnStatus::Loading => "loading",
            TryOnStatus::Success => "success",
            TryOnStatus::Error => "error",
        }
    }
}

/// Outcome of a successful attempt.
///
/// Fields are optional because the response mapping is best-effort renaming:
/// a field the service omits stays `None` instead of failing the attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnResult {
    pub image_url: Option<String>,
    pub processing_ms: Option<u64>,
    pub color: Option<String>,
    pub request_id: Option<String>,
}

/// A failed attempt as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnError {
    /// Machine-readable category (e.g. `TRY_ON_ERROR`).
    pub code: String,
    /// Human-readable text.
    pub message: String,
    pub request_id: Option<String>,
}

// ---------------------------------------------------------------------------
// TryOnState
// ---------------------------------------------------------------------------

/// Client-visible state of the try-on flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnState {
    pub selected_color: PaletteColor,
    pub intensity: u8,
    pub before_after_blend: f64,
    pub status: TryOnStatus,
    /// Correlation id for the next (or in-flight) attempt.
    pub request_id: String,
    pub result: Option<TryOnResult>,
    pub error: Option<TryOnError>,
}

impl TryOnState {
    /// Construction-time defaults with a freshly minted request id.
    pub fn initial() -> Self {
        Self {
            selected_color: default_color(),
            intensity: DEFAULT_INTENSITY,
            before_after_blend: 1.0,
            status: TryOnStatus::Idle,
            request_id: create_request_id(),
            result: None,
            error: None,
        }
    }

    /// Status line for the current state; see [`describe_status`].
    pub fn status_message(&self) -> Option<String> {
        describe_status(
            self.status,
            self.result.as_ref(),
            self.selected_color.name,
            self.error.as_ref(),
        )
    }
}

// ---------------------------------------------------------------------------
// Events / TransitionError
// ---------------------------------------------------------------------------

/// Events that drive status transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum TryOnEvent {
    /// An attempt was submitted (→ `Loading`).
    Start,
    /// The attempt returned a result (→ `Success`).
    Succeed(TryOnResult),
    /// The attempt failed (→ `Error`).
    Fail(TryOnError),
    /// Explicit reset (→ `Idle`).
    Reset,
}

impl TryOnEvent {
    fn name(&self) -> &'static str {
        match self {
            TryOnEvent::Start => "Start",
            TryOnEvent::Succeed(_) => "Succeed",
            TryOnEvent::Fail(_) => "Fail",
            TryOnEvent::Reset => "Reset",
        }
    }
}

/// Returned when an event is not legal in the current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: TryOnStatus,
    pub event: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "illegal try-on transition: {} + {}",
            self.from.as_str(),
            self.event
        )
    }
}

impl std::error::Error for TransitionError {}

// ---------------------------------------------------------------------------
// TryOnStateMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TryOnStateMachine {
    state: TryOnState,
}

impl Default for TryOnStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TryOnStateMachine {
    pub fn new() -> Self {
        Self {
            state: TryOnState::initial(),
        }
    }

    pub fn state(&self) -> &TryOnState {
        &self.state
    }

    pub fn status(&self) -> TryOnStatus {
        self.state.status
    }

    pub fn request_id(&self) -> &str {
        &self.state.request_id
    }

    /// Apply a status event.
    ///
    /// # Errors
    /// [`TransitionError`] when the event is not legal from the current
    /// status. The state is left untouched in that case.
    pub fn apply(&mut self, event: TryOnEvent) -> Result<(), TransitionError> {
        use TryOnStatus::*;

        let from = self.state.status;
        match (from, event) {
            (Idle | Success | Error, TryOnEvent::Start) => {
                self.state.status = Loading;
                self.state.error = None;
            }
            (Loading, TryOnEvent::Succeed(result)) => {
                self.state.status = Success;
                self.state.result = Some(result);
                self.state.error = None;
                self.state.before_after_blend = 1.0;
            }
            (Loading, TryOnEvent::Fail(error)) => {
                self.state.status = Error;
                self.state.error = Some(error);
            }
            (_, TryOnEvent::Reset) => {
                self.state = TryOnState::initial();
            }
            (from, event) => {
                return Err(TransitionError {
                    from,
                    event: event.name(),
                })
            }
        }
        Ok(())
    }

    pub fn mark_loading(&mut self) -> Result<(), TransitionError> {
        self.apply(TryOnEvent::Start)
    }

    pub fn mark_success(&mut self, result: TryOnResult) -> Result<(), TransitionError> {
        self.apply(TryOnEvent::Succeed(result))
    }

    pub fn mark_error(&mut self, error: TryOnError) -> Result<(), TransitionError> {
        self.apply(TryOnEvent::Fail(error))
    }

    /// Discard everything attempt-scoped and start over with a new request id.
    pub fn reset_flow(&mut self) {
        self.state = TryOnState::initial();
    }

    /// Replace the request id only. Called once after every completed attempt.
    pub fn regenerate_request_id(&mut self) {
        self.state.request_id = create_request_id();
    }

    pub fn select_color(&mut self, color: PaletteColor) {
        self.state.selected_color = color;
    }

    /// Store a raw slider value, snapped to a step of 5 within `[0, 100]`.
    pub fn set_intensity(&mut self, value: f64) {
        self.state.intensity = snap_intensity(Some(value));
    }

    pub fn set_before_after_blend(&mut self, value: f64) {
        self.state.before_after_blend = clamp(value, 0.0, 1.0);
    }
}

// ---------------------------------------------------------------------------
// Derived UI values
// ---------------------------------------------------------------------------

/// Status line shown under the preview.
///
/// - loading: `Processing shade {color}…`
/// - error: the error message, or a generic fallback when it is empty
/// - success with a processing time: time and request id
/// - anything else: no message
pub fn describe_status(
    status: TryOnStatus,
    result: Option<&TryOnResult>,
    color: &str,
    error: Option<&TryOnError>,
) -> Option<String> {
    match status {
        TryOnStatus::Loading => Some(format!("Processing shade {color}…")),
        TryOnStatus::Error => Some(
            error
                .map(|e| e.message.as_str())
                .filter(|m| !m.is_empty())
                .unwrap_or("We couldn't process your color.")
                .to_string(),
        ),
        TryOnStatus::Success => result.and_then(|r| {
            r.processing_ms.map(|ms| {
                format!(
                    "Done in {ms} ms · ID {}",
                    r.request_id.as_deref().unwrap_or("unknown")
                )
            })
        }),
        TryOnStatus::Idle => None,
    }
}

/// The apply button is disabled without an image or while an attempt runs.
pub fn is_apply_disabled(has_image: bool, status: TryOnStatus) -> bool {
    !has_image || status == TryOnStatus::Loading
}

pub fn is_share_disabled(result: Option<&TryOnResult>) -> bool {
    result.is_none()
}

/// Label for the before/after slider, e.g. `"75% applied"`.
pub fn before_after_label(blend: f64) -> String {
    format!("{}% applied", (clamp(blend, 0.0, 1.0) * 100.0).round() as u32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
