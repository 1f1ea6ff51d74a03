use std::path::PathBuf;

/// Failures inside the mask authoring surface. None of these reach the user;
/// the editor logs them and carries on without a mask.
#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error("failed to decode source image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to encode mask: {0}")]
    Encode(image::ImageError),

    #[error("drawing surface has not been sized yet")]
    Unsized,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed record in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("username must not be empty")]
    EmptyUsername,
}

#[derive(Debug, thiserror::Error)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingScheme,

    #[error("data URL has no payload separator")]
    MissingPayload,

    #[error("only base64 data URLs are supported")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("no API key configured (set GEMINI_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The model answered with text instead of an image.
    #[error("{0}")]
    Refused(String),

    #[error("bad image input: {0}")]
    DataUrl(#[from] DataUrlError),

    #[error("generation worker stopped unexpectedly")]
    WorkerGone,
}
