//! Media error types

use thiserror::Error;

/// Errors that can occur in the media subsystem
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("Media acquisition cancelled before it finished")]
    AcquisitionCancelled,
}
