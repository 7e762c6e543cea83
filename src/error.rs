//! Error taxonomy shared by the capture and edit APIs.
//!
//! Every failure is returned as a value; nothing in this crate is fatal to the
//! process. Errors serialize as their display string so a host can forward
//! them over whatever transport it uses.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The permission gate refused screen access
    #[error("Screen capture permission denied")]
    PermissionDenied,

    /// Enumeration returned no screens or windows at all
    #[error("No capture sources available")]
    NoSourcesAvailable,

    #[error("Display not found: {}", describe_display(.0))]
    DisplayNotFound(Option<u32>),

    #[error("Invalid capture bounds: {0}")]
    InvalidBounds(String),

    #[error("Capture source not found: {0}")]
    SourceNotFound(String),

    #[error("Capture requested too frequently, retry in {retry_after_ms} ms")]
    TooFrequent { retry_after_ms: u64 },

    #[error("A capture is already in progress")]
    AlreadyInProgress,

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Editor has no image loaded")]
    EditorNotInitialized,
}

fn describe_display(id: &Option<u32>) -> String {
    match id {
        Some(id) => format!("id {}", id),
        None => "no primary display".to_string(),
    }
}

impl CaptureError {
    /// Whether the same request can succeed later without the caller changing
    /// anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CaptureError::TooFrequent { .. } | CaptureError::AlreadyInProgress
        )
    }
}

impl Serialize for CaptureError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::CaptureFailed(err.to_string())
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CaptureError::CaptureFailed("device lost".to_string());
        assert_eq!(err.to_string(), "Capture failed: device lost");

        assert_eq!(
            CaptureError::DisplayNotFound(Some(7)).to_string(),
            "Display not found: id 7"
        );
        assert_eq!(
            CaptureError::DisplayNotFound(None).to_string(),
            "Display not found: no primary display"
        );
    }

    #[test]
    fn test_error_serialization() {
        let err = CaptureError::TooFrequent { retry_after_ms: 120 };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Capture requested too frequently, retry in 120 ms\"");
    }

    #[test]
    fn test_retryable() {
        assert!(CaptureError::AlreadyInProgress.is_retryable());
        assert!(CaptureError::TooFrequent { retry_after_ms: 1 }.is_retryable());
        assert!(!CaptureError::PermissionDenied.is_retryable());
        assert!(!CaptureError::NothingToUndo.is_retryable());
    }

    #[test]
    fn test_from_image_error() {
        let err = image::load_from_memory(b"not an image").unwrap_err();
        let err: CaptureError = err.into();
        assert!(matches!(err, CaptureError::CaptureFailed(_)));
    }
}
