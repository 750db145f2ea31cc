use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::{AspectRatio, FusionError, ImagePayload, Language};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub const BACKGROUND_REMOVAL_INSTRUCTION: &str = "Flawlessly remove the background of this image, leaving only the main product subject. The output must have a transparent background.";

/// Result of a background removal: the untouched upload and the cut-out subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub original: ImagePayload,
    pub no_bg: ImagePayload,
}

/// The three remote operations the poster workflow needs.
///
/// Implementations are stateless: one request per call, no retry, no cache.
#[async_trait]
pub trait CreativeService: Send + Sync {
    async fn remove_background(&self, image: ImagePayload) -> Result<ProcessedImage, FusionError>;

    async fn generate_poster(
        &self,
        product: &ImagePayload,
        prompt: &str,
        ratio: &AspectRatio,
    ) -> Result<ImagePayload, FusionError>;

    async fn translate(&self, text: &str, language: Language) -> Result<String, FusionError>;
}

pub fn poster_instruction(prompt: &str, aspect_ratio: &str) -> String {
    format!(
        "Create a professional, catchy, and market-ready poster for the provided product image.
    The creative direction is: \"{prompt}\".
    The poster's aspect ratio must be exactly {aspect_ratio}.
    The product image already has a transparent background; place it dynamically and intelligently within the new scene.
    Generate a complete poster with a suitable background, typography, and graphic elements that match the creative direction. Add punchy headlines or stylish captions if appropriate.
    The final design should be a visually stunning, scroll-stopping advertisement.
    Do not add any logos or QR codes unless specifically asked.
    Output only the final image."
    )
}

pub fn translation_instruction(text: &str, language: Language) -> String {
    format!(
        "Translate the following text to {language}. Provide only the translation, without any additional comments or quotation marks: \"{text}\""
    )
}

/// `CreativeService` backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiCreative {
    client: Client,
    config: GeminiConfig,
}

impl GeminiCreative {
    pub fn new(config: GeminiConfig) -> Result<Self, FusionError> {
        Ok(Self {
            client: Client::builder().timeout(config.timeout).build()?,
            config,
        })
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, FusionError> {
        let url = self.config.endpoint(model);
        debug!(%url, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                FusionError::remote(
                    None,
                    format!("Failed to parse Gemini response: {}", e.without_url()),
                )
            })
    }
}

#[async_trait]
impl CreativeService for GeminiCreative {
    async fn remove_background(&self, image: ImagePayload) -> Result<ProcessedImage, FusionError> {
        let request = GenerateContentRequest::image_with_text(
            &image,
            BACKGROUND_REMOVAL_INSTRUCTION.to_string(),
            vec![Modality::Image, Modality::Text],
        );
        let response = self
            .generate_content(&self.config.image_model, &request)
            .await?;

        let no_bg = extract_image(response)?.ok_or_else(FusionError::background_removal)?;
        Ok(ProcessedImage {
            original: image,
            no_bg,
        })
    }

    async fn generate_poster(
        &self,
        product: &ImagePayload,
        prompt: &str,
        ratio: &AspectRatio,
    ) -> Result<ImagePayload, FusionError> {
        let request = GenerateContentRequest::image_with_text(
            product,
            poster_instruction(prompt, ratio.value),
            vec![Modality::Image],
        );
        let response = self
            .generate_content(&self.config.image_model, &request)
            .await?;

        extract_image(response)?.ok_or_else(FusionError::poster_generation)
    }

    async fn translate(&self, text: &str, language: Language) -> Result<String, FusionError> {
        let request = GenerateContentRequest::text(translation_instruction(text, language));
        let response = self
            .generate_content(&self.config.text_model, &request)
            .await
            .map_err(|e| {
                warn!(error = %e, "translation request failed");
                FusionError::Translation
            })?;

        extract_text(response)
            .map(|t| t.trim().to_string())
            .ok_or(FusionError::Translation)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn image_with_text(image: &ImagePayload, text: String, modalities: Vec<Modality>) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: image.to_base64(),
                        },
                    },
                    Part::Text { text },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: modalities,
            }),
        }
    }

    fn text(text: String) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part::Text { text }],
            }],
            generation_config: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<Modality>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
enum Modality {
    Image,
    Text,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn first_candidate_parts(response: GenerateContentResponse) -> Vec<ResponsePart> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default()
}

/// First inline image of the first candidate, if any.
fn extract_image(response: GenerateContentResponse) -> Result<Option<ImagePayload>, FusionError> {
    first_candidate_parts(response)
        .into_iter()
        .find_map(|part| part.inline_data)
        .map(|inline| ImagePayload::from_base64(inline.mime_type, &inline.data))
        .transpose()
}

/// All text parts of the first candidate, concatenated.
fn extract_text(response: GenerateContentResponse) -> Option<String> {
    let texts: Vec<String> = first_candidate_parts(response)
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

fn map_http_error(status: StatusCode, body: &str) -> FusionError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|| format!("Gemini API returned {status}: {body}"));

    FusionError::remote(Some(status.as_u16()), message)
}
