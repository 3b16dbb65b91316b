//! Viewer-side north calibration for 360° panoramas.
//!
//! A [`session::ViewerSession`] owns the camera orientation of one viewer and
//! talks to the outside world only through the [`session::PanoramaStore`],
//! [`session::Renderer`] and [`notify::NotificationSink`] traits.

pub mod api;
pub mod error;
pub mod notify;
pub mod session;

pub use error::CalibrationError;
pub use notify::{NotificationLevel, NotificationSink, TracingSink};
pub use session::{PanoramaStore, PendingCommit, PointerEvent, Renderer, ViewerSession};
