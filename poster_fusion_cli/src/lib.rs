pub mod ai;
pub mod config;
pub mod error;
pub mod posters;
pub mod session;
pub mod utils;
pub mod workflow;

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};

pub use error::FusionError;
pub use posters::{GeneratedPoster, PosterCollection};
pub use session::{SessionController, SessionSnapshot, SessionState};
pub use workflow::{Workflow, WorkflowStep};

/// Raw image bytes plus the media type they were declared with.
///
/// Serializes as a `data:<mime>;base64,<data>` URI so snapshots can be
/// dropped straight into an `<img src>`.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Result<Self, FusionError> {
        let bytes = BASE64_STANDARD
            .decode(data.trim())
            .map_err(|e| FusionError::Decode(e.to_string()))?;
        Ok(Self::new(mime_type, bytes))
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Payloads can be megabytes; keep logs readable.
impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for ImagePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

/// Uploads are accepted on their declared media type alone.
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type.starts_with("image/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectRatio {
    pub name: &'static str,
    pub value: &'static str,
}

pub const ASPECT_RATIOS: [AspectRatio; 5] = [
    AspectRatio { name: "9:16", value: "9:16" },
    AspectRatio { name: "1:1", value: "1:1" },
    AspectRatio { name: "16:9", value: "16:9" },
    AspectRatio { name: "3:4", value: "3:4" },
    AspectRatio { name: "4:3", value: "4:3" },
];

impl AspectRatio {
    pub fn find(value: &str) -> Option<AspectRatio> {
        let value = value.trim();
        ASPECT_RATIOS
            .iter()
            .copied()
            .find(|r| r.value == value || r.name == value)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        ASPECT_RATIOS[0]
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value)
    }
}

/// Target language for prompt translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Language {
    #[serde(alias = "english", alias = "en")]
    English,
    #[serde(alias = "arabic", alias = "ar")]
    Arabic,
}

impl Language {
    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Arabic => "Arabic",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
