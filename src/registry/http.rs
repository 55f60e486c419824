//! HTTP registry client
//!
//! Speaks a REST emoji collection:
//! `GET {base}/collections/{collection}/emojis`,
//! `POST` to the same path with a multipart `name` + `image` form, and
//! `DELETE {base}/collections/{collection}/emojis/{id}`.
//! Credentials are passed through as a bearer token; acquiring them is the caller's job.

use crate::emote::RemoteId;
use crate::error::RegistryError;
use crate::registry::{CreatedResource, RegistryClient, RemoteResource};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`HttpRegistryClient`]
#[derive(Debug, Clone)]
pub struct HttpRegistryConfig {
    pub base_url: String,
    pub collection: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl HttpRegistryConfig {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            collection: collection.into(),
            token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Registry client over HTTP
pub struct HttpRegistryClient {
    client: Client,
    config: HttpRegistryConfig,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    fn into_id(self) -> Result<RemoteId, RegistryError> {
        match self {
            WireId::Number(id) => Ok(id),
            WireId::Text(text) => text
                .parse()
                .map_err(|_| RegistryError::InvalidResponse(format!("Invalid emoji id: {}", text))),
        }
    }
}

#[derive(Deserialize)]
struct WireEmoji {
    id: WireId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    animated: bool,
}

impl HttpRegistryClient {
    pub fn new(config: HttpRegistryConfig) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RegistryError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/collections/{}/emojis",
            self.config.base_url.trim_end_matches('/'),
            self.config.collection
        )
    }

    fn resource_url(&self, id: RemoteId) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RegistryError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(map_http_error)?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(response.headers());
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(map_status(status, retry_after, body))
}

fn map_http_error(error: reqwest::Error) -> RegistryError {
    if error.is_timeout() {
        RegistryError::Request(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        RegistryError::Request(format!("Connection error: {}", error))
    } else {
        RegistryError::Request(format!("HTTP error: {}", error))
    }
}

/// A 404 here means the collection itself is missing. Only `delete_resource` maps 404 to
/// `NotFound`, since only there does it name a resource id.
fn map_status(status: StatusCode, retry_after: Option<Duration>, body: String) -> RegistryError {
    match status.as_u16() {
        401 | 403 => RegistryError::Unauthorized(body),
        429 => RegistryError::RateLimited { retry_after },
        _ => RegistryError::Request(format!("Request failed with status {}: {}", status, body)),
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds: f64 = value.trim().parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

/// Best-effort image MIME detection from magic bytes
fn sniff_mime(content: &[u8]) -> &'static str {
    if content.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        "image/gif"
    } else if content.len() >= 12 && &content[..4] == b"RIFF" && &content[8..12] == b"WEBP" {
        "image/webp"
    } else if content.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn list_resources(&self) -> Result<Vec<RemoteResource>, RegistryError> {
        let response = self.send(self.client.get(self.collection_url())).await?;
        let emojis: Vec<WireEmoji> = response.json().await.map_err(|e| {
            RegistryError::InvalidResponse(format!("Failed to parse emoji list: {}", e))
        })?;

        let mut resources = Vec::with_capacity(emojis.len());
        for emoji in emojis {
            let id = emoji.id.into_id()?;
            // Still part of the existence set; an empty name never matches a key.
            let name = emoji.name.unwrap_or_else(|| {
                warn!(id, "Unnamed emoji in registry listing");
                String::new()
            });
            resources.push(RemoteResource {
                id,
                name,
                animated: emoji.animated,
            });
        }
        debug!(count = resources.len(), "Fetched registry listing");
        Ok(resources)
    }

    async fn create_resource(
        &self,
        name: &str,
        content: Vec<u8>,
    ) -> Result<CreatedResource, RegistryError> {
        let mime = sniff_mime(&content);
        let size = content.len();
        let image = multipart::Part::bytes(content)
            .file_name(name.to_string())
            .mime_str(mime)
            .map_err(|e| RegistryError::Request(format!("Invalid image part: {}", e)))?;
        let form = multipart::Form::new()
            .text("name", name.to_string())
            .part("image", image);

        let response = self
            .send(self.client.post(self.collection_url()).multipart(form))
            .await?;
        let created: WireEmoji = response.json().await.map_err(|e| {
            RegistryError::InvalidResponse(format!("Failed to parse created emoji: {}", e))
        })?;

        let id = created.id.into_id()?;
        debug!(name, id, size, mime, "Created registry emoji");
        Ok(CreatedResource {
            id,
            animated: created.animated,
        })
    }

    async fn delete_resource(&self, id: RemoteId) -> Result<(), RegistryError> {
        let response = self
            .authorize(self.client.delete(self.resource_url(id)))
            .send()
            .await
            .map_err(map_http_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(id));
        }
        check_status(response).await?;
        debug!(id, "Deleted registry emoji");
        Ok(())
    }
}
