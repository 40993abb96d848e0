//! cm-core
//!
//! Synchronous core of the try-on client: numeric snapping, the shade
//! palette, payload construction, pre-submission validation and the try-on
//! state machine. Nothing here performs I/O; `cm-client` drives these types
//! across the network boundary.

pub mod numeric;
pub mod palette;
pub mod payload;
pub mod slider;
pub mod state;
pub mod validation;

pub use numeric::{clamp, round_to_step};
pub use palette::{default_color, find_palette_color, PaletteColor, PALETTE};
pub use payload::{
    build_payload, create_request_id, snap_intensity, CapturedImage, PayloadError,
    TryOnRequestPayload,
};
pub use state::{
    describe_status, TransitionError, TryOnError, TryOnEvent, TryOnResult, TryOnState,
    TryOnStateMachine, TryOnStatus,
};
pub use validation::{validate_for_submission, Alert, SubmissionError, MAX_SELFIE_BYTES};
