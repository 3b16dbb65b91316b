use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("invalid panorama id: '{0}'")]
    InvalidPanoramaId(String),
    #[error("panorama not found: {0}")]
    PanoramaNotFound(String),
    #[error("no panorama loaded")]
    NoPanoramaLoaded,
    #[error("a north calibration is already being saved")]
    CommitInProgress,
    /// The store rejected or failed the request; the message is the store's own.
    #[error("{0}")]
    Store(String),
    /// The image could not be (re)loaded. `north_offset` is the offset in
    /// effect, which may already be persisted.
    #[error("failed to display panorama (north offset {north_offset}°): {message}")]
    Render { north_offset: f64, message: String },
}

impl CalibrationError {
    /// Errors caused by what the caller asked for rather than a collaborator.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CalibrationError::InvalidPanoramaId(_)
                | CalibrationError::PanoramaNotFound(_)
                | CalibrationError::NoPanoramaLoaded
                | CalibrationError::CommitInProgress
        )
    }
}
