//! Client for the remote image edit service
//!
//! A removal is at most two HTTP calls: a `POST` describing the
//! `remove_background` operation, and, when the service answers with a
//! temporary URL, a `GET` for the resulting bytes. The first response is
//! turned into an [`EditOutcome`] so callers branch on a typed value instead
//! of probing JSON.

use crate::config::ClientConfig;
use crate::error::{BgRemovalError, Result};
use crate::types::{is_mime_type, ImageDataUri, DEFAULT_IMAGE_MIME};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Status value the service reports for a finished edit
const SUCCEEDED: &str = "succeeded";

/// Output format requested from the service; PNG keeps transparency
const OUTPUT_FORMAT: &str = "png";

/// Anything able to turn an image into its background-removed version
///
/// Implementations are stateless between calls, so one instance can serve
/// concurrent requests.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background from `image`
    ///
    /// # Errors
    /// - `MissingCredential` when the service is not configured
    /// - `Processing` when the service rejects the request or answers oddly
    /// - `Network` when the service cannot be reached
    async fn remove_background(&self, image: &ImageDataUri) -> Result<ImageDataUri>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Body of the edit request
#[derive(Debug, Serialize)]
pub struct EditRequest<'a> {
    input: EditInput<'a>,
    operations: Vec<Operation>,
    output: OutputSpec,
}

#[derive(Debug, Serialize)]
struct EditInput<'a> {
    image: &'a ImageDataUri,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Operation {
    RemoveBackground,
}

#[derive(Debug, Serialize)]
struct OutputSpec {
    format: &'static str,
}

impl<'a> EditRequest<'a> {
    /// Request a single background removal rendered as PNG
    #[must_use]
    pub fn remove_background(image: &'a ImageDataUri) -> Self {
        Self {
            input: EditInput { image },
            operations: vec![Operation::RemoveBackground],
            output: OutputSpec {
                format: OUTPUT_FORMAT,
            },
        }
    }
}

/// Response of the edit request, as far as we care about it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Option<EditOutput>,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditOutput {
    /// Short-lived location of the processed image
    #[serde(default)]
    pub tmp_url: Option<String>,
    /// Processed image embedded directly as a data URI
    #[serde(default)]
    pub url: Option<String>,
}

/// What a successful edit response tells us to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Result must be fetched from this temporary location
    TemporaryUrl(String),
    /// Result is already embedded in the response
    Inline(ImageDataUri),
}

impl EditOutcome {
    /// Interpret a raw response body
    ///
    /// # Errors
    /// `Processing` when the body is not JSON, does not match the expected
    /// shape, or reports anything other than a usable result.
    pub fn from_body(body: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(body).map_err(|e| {
            BgRemovalError::processing(None, format!("response is not JSON ({e}): {body}"))
        })?;
        let response: EditResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            BgRemovalError::processing(None, format!("unexpected response shape ({e}): {raw}"))
        })?;

        Self::from_response(&response, &raw)
    }

    /// Interpret an already-deserialized response; `raw` is quoted back in errors
    ///
    /// # Errors
    /// `Processing` carrying the reported status and the service's `errors`
    /// payload (or the whole response when there is none).
    pub fn from_response(response: &EditResponse, raw: &serde_json::Value) -> Result<Self> {
        let output = response.output.as_ref();

        if response.status.as_deref() == Some(SUCCEEDED) {
            if let Some(tmp_url) = output
                .and_then(|o| o.tmp_url.as_deref())
                .filter(|u| !u.trim().is_empty())
            {
                return Ok(Self::TemporaryUrl(tmp_url.to_string()));
            }
        }

        if let Some(inline) = output
            .and_then(|o| o.url.as_deref())
            .filter(|u| u.starts_with("data:"))
        {
            return inline.parse().map(Self::Inline).map_err(|e| {
                BgRemovalError::processing(response.status.clone(), format!("inline result: {e}"))
            });
        }

        let details = response.errors.as_ref().unwrap_or(raw).to_string();
        Err(BgRemovalError::processing(response.status.clone(), details))
    }
}

/// [`BackgroundRemover`] backed by the Claid image edit API
#[derive(Debug, Clone)]
pub struct ClaidClient {
    client: Client,
    config: ClientConfig,
}

impl ClaidClient {
    /// Create a client from explicit configuration
    ///
    /// The credential is checked per request, not here, so a client without
    /// a key can still be constructed and will fail each removal with a
    /// configuration error.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to create HTTP client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BgRemovalError::network_error("Failed to create HTTP client", e))?;

        Ok(Self { client, config })
    }

    /// Create a client configured from the process environment
    ///
    /// # Errors
    /// See [`ClientConfig::from_env`] and [`ClaidClient::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send the edit request and classify the answer
    ///
    /// # Errors
    /// - `MissingCredential` before any I/O when no key is configured
    /// - `Network` when the request cannot be sent or the body not read
    /// - `Processing` for non-2xx statuses and unusable bodies
    #[instrument(skip_all, fields(endpoint = %self.config.endpoint, mime = %image.mime_type()))]
    pub async fn submit_edit(&self, image: &ImageDataUri) -> Result<EditOutcome> {
        let api_key = self.config.require_api_key()?;

        debug!(bytes = image.decoded_len(), "Submitting remove_background request");
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key.expose())
            .json(&EditRequest::remove_background(image))
            .send()
            .await
            .map_err(|e| BgRemovalError::network_error("Failed to reach image edit service", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BgRemovalError::network_error("Failed to read image edit response", e))?;

        if !status.is_success() {
            warn!(status = %status, "Image edit service returned an error");
            return Err(BgRemovalError::processing(
                Some(status.as_u16().to_string()),
                body,
            ));
        }

        EditOutcome::from_body(&body)
    }

    /// Download a result from its temporary location and encode it
    ///
    /// The MIME type comes from the `content-type` header, without
    /// parameters, falling back to `image/png` when it is absent or malformed.
    ///
    /// # Errors
    /// - `Network` when the location cannot be reached
    /// - `Processing` for non-2xx statuses or an empty body
    #[instrument(skip(self))]
    pub async fn fetch_result(&self, url: &str) -> Result<ImageDataUri> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BgRemovalError::network_error("Failed to fetch processed image", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BgRemovalError::processing(
                Some(status.as_u16().to_string()),
                format!("could not download processed image from {url}"),
            ));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .filter(|value| is_mime_type(value))
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BgRemovalError::network_error("Failed to read processed image", e))?;
        debug!(bytes = bytes.len(), mime = %mime_type, "Fetched processed image");

        ImageDataUri::from_bytes(&mime_type, &bytes).map_err(|e| {
            BgRemovalError::processing(Some(status.as_u16().to_string()), e.to_string())
        })
    }
}

#[async_trait]
impl BackgroundRemover for ClaidClient {
    async fn remove_background(&self, image: &ImageDataUri) -> Result<ImageDataUri> {
        let result = match self.submit_edit(image).await {
            Ok(EditOutcome::TemporaryUrl(url)) => self.fetch_result(&url).await,
            Ok(EditOutcome::Inline(result)) => Ok(result),
            Err(e) => Err(e),
        };

        match &result {
            Ok(output) => info!(mime = %output.mime_type(), "Background removed"),
            Err(e) => warn!(error = %e, "Background removal failed"),
        }
        result
    }

    fn name(&self) -> &str {
        "claid"
    }
}
