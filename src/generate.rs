//! The outbound image-editing call and the worker thread that runs it.

use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::data_url;
use crate::error::GenerateError;
use crate::model::GenerationConfig;

/// Anything that can turn an edit request into a new image (as a data URL).
pub trait ImageEditService: Send + Sync {
    fn generate(&self, request: &GenerationConfig) -> Result<String, GenerateError>;
}

// ── Wire format ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, data: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

// ── Request / response mapping ──────────────────────────────────────────────

/// Instruction text sent after the images.
pub fn build_prompt(prompt: &str, has_material: bool, has_mask: bool) -> String {
    let mut text = format!(
        "Task: Edit the first image based on the user instructions.\n\nUser Instruction: \"{}\"\n",
        prompt
    );
    if has_material {
        text.push_str(
            "\nReference Material: Use the texture/style from the second image provided above \
             as a material reference (e.g., for floor, wall, or furniture) if relevant to the \
             instruction.",
        );
    }
    if has_mask {
        text.push_str(
            "\nMasking: A mask image is provided (black background, white marked area). \
             STRICTLY limit your edits to the area marked in the mask image. Keep the rest of \
             the image exactly as it is.",
        );
    }
    text
}

/// Parts go in a fixed order: original, material, mask, instruction.
pub fn build_request(config: &GenerationConfig) -> Result<GenerateContentRequest, GenerateError> {
    let mut parts = Vec::with_capacity(4);

    let (mime, data) = data_url::split(&config.original_image)?;
    parts.push(Part::inline(mime, data));

    if let Some(material) = &config.material_image {
        let (mime, data) = data_url::split(material)?;
        parts.push(Part::inline(mime, data));
    }

    if let Some(mask) = &config.mask_image {
        let (_, data) = data_url::split(mask)?;
        parts.push(Part::inline("image/png", data));
    }

    parts.push(Part::text(build_prompt(
        &config.prompt,
        config.material_image.is_some(),
        config.mask_image.is_some(),
    )));

    Ok(GenerateContentRequest {
        contents: vec![Content { parts }],
    })
}

/// Pull the first inline image out of the first candidate.
pub fn extract_image(response: &GenerateContentResponse) -> Result<String, GenerateError> {
    let parts = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();

    let image = parts
        .iter()
        .filter_map(|p| p.inline_data.as_ref())
        .find(|d| !d.data.is_empty());
    if let Some(inline) = image {
        let mime = if inline.mime_type.is_empty() {
            "image/png"
        } else {
            inline.mime_type.as_str()
        };
        return Ok(format!("data:{};base64,{}", mime, inline.data));
    }

    // No image: the model usually explains why in its first text part.
    let reason = parts
        .first()
        .and_then(|p| p.text.as_deref())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("No image generated");
    Err(GenerateError::Refused(reason.to_string()))
}

// ── Gemini client ───────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        let api_key = api_key.ok_or(GenerateError::MissingApiKey)?;
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GenerateError> {
        Self::new(
            &config.endpoint,
            &config.model,
            config.resolved_api_key(),
            config.timeout(),
        )
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl ImageEditService for GeminiClient {
    fn generate(&self, request: &GenerationConfig) -> Result<String, GenerateError> {
        let body = build_request(request)?;
        log::info!(
            "requesting edit from {} ({} parts)",
            self.model,
            body.contents[0].parts.len()
        );

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            log::error!("generation failed with {}: {}", status, body);
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json()?;
        extract_image(&parsed)
    }
}

// ── Background job ──────────────────────────────────────────────────────────

/// One in-flight generation running on its own thread.
pub struct GenerationJob {
    request: GenerationConfig,
    rx: mpsc::Receiver<Result<String, GenerateError>>,
}

impl GenerationJob {
    /// `on_done` runs on the worker after the result is sent (e.g. to wake
    /// the UI up).
    pub fn spawn(
        service: Arc<dyn ImageEditService>,
        request: GenerationConfig,
        on_done: impl FnOnce() + Send + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker_request = request.clone();
        std::thread::spawn(move || {
            let result = service.generate(&worker_request);
            let _ = tx.send(result);
            on_done();
        });
        Self { request, rx }
    }

    pub fn request(&self) -> &GenerationConfig {
        &self.request
    }

    /// Non-blocking; `None` while the worker is still busy.
    pub fn poll(&self) -> Option<Result<String, GenerateError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(GenerateError::WorkerGone)),
        }
    }
}
