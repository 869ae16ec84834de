// Error types shared by the library modules. The taxonomy is flat on
// purpose: callers only care which stage of a run failed.

use thiserror::Error;

/// The source image could not be obtained.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("no image available")]
    NoImage,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Drawing or encoding a striped variant failed.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid stripe color `{0}`")]
    InvalidColor(String),

    #[error("stripe count {0} is out of range")]
    InvalidCount(u32),

    #[error("stripe width {0}% is out of range")]
    InvalidWidth(u8),

    #[error("no stripe jobs configured")]
    NoJobs,

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// A call to the flashcard service failed, either because the service could
/// not be reached or because it answered with a non-null `error` field.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request `{action}` failed: {error}")]
    Request {
        action: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("`{action}` returned an error: {message}")]
    Remote { action: String, message: String },

    #[error("`{action}` returned an unexpected response: {message}")]
    Response { action: String, message: String },
}

/// Any failure that aborts a run before the first upload. Upload failures
/// are carried by the run report instead.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
