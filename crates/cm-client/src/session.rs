//! Session container and the user-facing flows that drive it.
//!
//! [`TryOnSession`] owns the one selfie slot and the one try-on state
//! machine. It is passed explicitly (`&mut`) to [`select_selfie`] and
//! [`apply_color`]; there is no process-wide store. Because both flows take
//! the session mutably, two overlapping attempts on one session cannot be
//! expressed.
//!
//! Every mutation publishes a fresh [`TryOnState`] snapshot on a
//! `tokio::sync::watch` channel so a rendering layer can subscribe.

use cm_core::validation::check_size;
use cm_core::{
    build_payload, validate_for_submission, Alert, CapturedImage, PaletteColor, SubmissionError,
    TransitionError, TryOnError, TryOnResult, TryOnState, TryOnStateMachine, TryOnStatus,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::gateway::TryOnGateway;
use crate::media::{MediaError, MediaSource};

/// `code` stamped on every failed attempt surfaced to the user.
pub const TRY_ON_ERROR_CODE: &str = "TRY_ON_ERROR";
/// `code` for an attempt whose future was dropped before it settled.
pub const TRY_ON_CANCELLED_CODE: &str = "TRY_ON_CANCELLED";

const FALLBACK_ERROR_MESSAGE: &str = "We couldn't process your color. Please retry.";

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Where one-shot user alerts go. The UI layer provides the real one.
pub trait AlertSink: Send + Sync {
    fn alert(&self, alert: &Alert);
}

/// Sink that writes alerts to the log; used by headless callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn alert(&self, alert: &Alert) {
        warn!(title = %alert.title, message = %alert.message, "alert");
    }
}

// ---------------------------------------------------------------------------
// TryOnSession
// ---------------------------------------------------------------------------

pub struct TryOnSession {
    machine: TryOnStateMachine,
    selfie: Option<CapturedImage>,
    /// Last selection-flow error, cleared when a selfie is accepted.
    error: Option<String>,
    max_selfie_bytes: u64,
    tx: watch::Sender<TryOnState>,
}

impl TryOnSession {
    pub fn new(max_selfie_bytes: u64) -> Self {
        let machine = TryOnStateMachine::new();
        let (tx, _rx) = watch::channel(machine.state().clone());
        Self {
            machine,
            selfie: None,
            error: None,
            max_selfie_bytes,
            tx,
        }
    }

    /// Receiver that observes every published state snapshot.
    pub fn subscribe(&self) -> watch::Receiver<TryOnState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> &TryOnState {
        self.machine.state()
    }

    pub fn selfie(&self) -> Option<&CapturedImage> {
        self.selfie.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn max_selfie_bytes(&self) -> u64 {
        self.max_selfie_bytes
    }

    pub fn is_apply_disabled(&self) -> bool {
        cm_core::state::is_apply_disabled(self.selfie.is_some(), self.machine.status())
    }

    /// Store a selfie directly, bypassing the picker. Clears the session error.
    pub fn set_selfie(&mut self, image: CapturedImage) {
        self.selfie = Some(image);
        self.error = None;
    }

    /// Empty the selfie slot and start the try-on flow over.
    pub fn clear(&mut self) {
        self.selfie = None;
        self.error = None;
        self.machine.reset_flow();
        self.publish();
    }

    pub fn select_color(&mut self, color: PaletteColor) {
        self.machine.select_color(color);
        self.publish();
    }

    pub fn set_intensity(&mut self, value: f64) {
        self.machine.set_intensity(value);
        self.publish();
    }

    pub fn set_before_after_blend(&mut self, value: f64) {
        self.machine.set_before_after_blend(value);
        self.publish();
    }

    pub fn reset_flow(&mut self) {
        self.machine.reset_flow();
        self.publish();
    }

    fn publish(&self) {
        self.tx.send_replace(self.machine.state().clone());
    }
}

// ---------------------------------------------------------------------------
// Selfie selection
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SelectOutcome {
    /// The user backed out of the picker; nothing changed.
    Cancelled,
    Accepted,
    /// The image was rejected (too large).
    Rejected(SubmissionError),
    /// The picker itself failed.
    Failed(MediaError),
}

/// Acquire a selfie from `media` and store it if it fits the size limit.
///
/// Accepting a selfie resets the try-on flow.
pub async fn select_selfie(
    session: &mut TryOnSession,
    media: &dyn MediaSource,
    alerts: &dyn AlertSink,
) -> SelectOutcome {
    let image = match media.pick().await {
        Ok(Some(image)) => image,
        Ok(None) => {
            debug!("selfie selection cancelled");
            return SelectOutcome::Cancelled;
        }
        Err(e) => {
            let message = e.to_string();
            warn!(error = %message, "selfie selection failed");
            alerts.alert(&Alert::new("Error", message.as_str()));
            session.error = Some(message);
            return SelectOutcome::Failed(e);
        }
    };

    if let Err(reason) = check_size(&image, session.max_selfie_bytes) {
        info!(uri = %image.uri, %reason, "selfie rejected");
        if let Some(alert) = reason.alert() {
            alerts.alert(&alert);
        }
        session.error = Some(reason.to_string());
        return SelectOutcome::Rejected(reason);
    }

    info!(uri = %image.uri, size_bytes = ?image.file_size_bytes, "selfie accepted");
    session.set_selfie(image);
    session.reset_flow();
    SelectOutcome::Accepted
}

// ---------------------------------------------------------------------------
// Apply color
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApplyOutcome {
    /// Validation failed; no state changed and no request was sent.
    Rejected(SubmissionError),
    /// The state machine refused to start an attempt.
    Busy(TransitionError),
    Succeeded(TryOnResult),
    Failed(TryOnError),
}

/// Submit the session's selfie with the selected shade and intensity.
///
/// Sequence: validate → mark loading → build payload → call gateway →
/// mark success or error. The request id is regenerated exactly once after
/// the attempt, whatever its outcome, including when the returned future is
/// dropped mid-flight.
pub async fn apply_color(
    session: &mut TryOnSession,
    gateway: &dyn TryOnGateway,
    alerts: &dyn AlertSink,
) -> ApplyOutcome {
    if let Err(reason) = validate_for_submission(session.selfie.as_ref(), session.max_selfie_bytes)
    {
        debug!(%reason, "apply color refused");
        if let Some(alert) = reason.alert() {
            alerts.alert(&alert);
        }
        return ApplyOutcome::Rejected(reason);
    }

    if let Err(e) = session.machine.mark_loading() {
        warn!(error = %e, "apply color while an attempt is in flight");
        return ApplyOutcome::Busy(e);
    }

    let attempt = Attempt::begin(session);
    let payload = match attempt.build_payload() {
        Ok(p) => p,
        Err(message) => return attempt.fail(message, alerts),
    };

    info!(
        request_id = %payload.request_id,
        color = %payload.color,
        intensity = payload.intensity,
        gateway = gateway.name(),
        "try-on submitted"
    );

    match gateway.perform_try_on(&payload).await {
        Ok(result) => attempt.succeed(result),
        Err(e) => attempt.fail(e.to_string(), alerts),
    }
}

/// One in-flight attempt. Dropping it completes the attempt: a still-loading
/// state is closed as cancelled, and the request id is rotated.
struct Attempt<'a> {
    session: &'a mut TryOnSession,
    request_id: String,
}

impl<'a> Attempt<'a> {
    fn begin(session: &'a mut TryOnSession) -> Self {
        session.publish();
        let request_id = session.machine.request_id().to_string();
        Self {
            session,
            request_id,
        }
    }

    fn build_payload(&self) -> Result<cm_core::TryOnRequestPayload, String> {
        let state = self.session.machine.state();
        let image = self
            .session
            .selfie
            .as_ref()
            .ok_or_else(|| SubmissionError::NoImage.to_string())?;
        build_payload(
            image,
            state.selected_color.name,
            Some(f64::from(state.intensity)),
            Some(self.request_id.as_str()),
        )
        .map_err(|e| e.to_string())
    }

    fn succeed(self, result: TryOnResult) -> ApplyOutcome {
        info!(
            request_id = %self.request_id,
            processing_ms = ?result.processing_ms,
            "try-on succeeded"
        );
        if let Err(e) = self.session.machine.mark_success(result.clone()) {
            warn!(request_id = %self.request_id, error = %e, "success not recorded");
        }
        ApplyOutcome::Succeeded(result)
    }

    fn fail(self, message: String, alerts: &dyn AlertSink) -> ApplyOutcome {
        let message = if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        warn!(request_id = %self.request_id, error = %message, "try-on failed");

        let error = TryOnError {
            code: TRY_ON_ERROR_CODE.to_string(),
            message,
            request_id: Some(self.request_id.clone()),
        };
        if let Err(e) = self.session.machine.mark_error(error.clone()) {
            warn!(request_id = %self.request_id, error = %e, "failure not recorded");
        }
        alerts.alert(&Alert::new(
            "We couldn't process your color",
            error.message.as_str(),
        ));
        ApplyOutcome::Failed(error)
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        let machine = &mut self.session.machine;
        if machine.status() == TryOnStatus::Loading {
            warn!(request_id = %self.request_id, "try-on dropped before completion");
            let _ = machine.mark_error(TryOnError {
                code: TRY_ON_CANCELLED_CODE.to_string(),
                message: "The request was cancelled.".to_string(),
                request_id: Some(self.request_id.clone()),
            });
        }
        machine.regenerate_request_id();
        self.session.publish();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
