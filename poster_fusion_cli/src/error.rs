//! Error types for the poster workflow.

use thiserror::Error;

pub const BACKGROUND_REMOVAL_FAILED: &str =
    "AI failed to remove background. The product might be too complex or the image quality too low.";
pub const POSTER_GENERATION_FAILED: &str =
    "AI failed to generate a poster. Try a different prompt or product image.";

/// Every failure a session action can report.
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Error, Debug)]
pub enum FusionError {
    /// Upload whose declared media type is not `image/*`
    #[error("Please upload a valid image file (PNG, JPG, etc.).")]
    InvalidFileType,

    /// The service answered but returned no image for background removal
    #[error("{0}")]
    BackgroundRemoval(String),

    /// The service answered but returned no poster image
    #[error("{0}")]
    PosterGeneration(String),

    /// Any translation failure; details are only logged
    #[error("Translation failed.")]
    Translation,

    #[error("Please provide a product image and a creative prompt.")]
    MissingInput,

    #[error("Unknown aspect ratio: {0}")]
    UnknownRatio(String),

    #[error("There is no active poster to download.")]
    NothingToDownload,

    /// Another action of the same session is still in flight
    #[error("Another request is still in progress. Please wait for it to finish.")]
    Busy,

    /// Non-success answer from the remote API
    #[error("{message}")]
    Remote { status: Option<u16>, message: String },

    /// Transport failure; the request URL is stripped before wrapping
    #[error(transparent)]
    Http(reqwest::Error),

    #[error("Invalid image data: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FusionError {
    pub fn background_removal() -> Self {
        Self::BackgroundRemoval(BACKGROUND_REMOVAL_FAILED.to_string())
    }

    pub fn poster_generation() -> Self {
        Self::PosterGeneration(POSTER_GENERATION_FAILED.to_string())
    }

    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Message to surface to the user, or `fallback` when the error carries none.
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }

}

// reqwest puts the full URL in its `Display`, and these messages reach the
// browser and the logs.
impl From<reqwest::Error> for FusionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}
