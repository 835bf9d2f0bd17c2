//! Device API plumbing: wire types, the `Deliver` seam, and the two
//! client implementations (real HTTP and demo save-to-disk).

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::view::{RenderResult, TextPayload};

const DEFAULT_BASE_URL: &str = "https://dot.mindreset.tech/api/open";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Dithering mode hint, forwarded opaquely; the device applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DitherType {
    Diffusion,
    Ordered,
    None,
}

/// Dithering kernel hint, also device-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DitherKernel {
    Threshold,
    Atkinson,
    Burkes,
    FloydSteinberg,
    Sierra2,
    Stucki,
    JarvisJudiceNinke,
    DiffusionRow,
    DiffusionColumn,
    Diffusion2D,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTextRequest {
    pub refresh_now: bool,
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Base64-encoded PNG icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayImageRequest {
    pub refresh_now: bool,
    pub device_id: String,
    /// Base64-encoded PNG image.
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dither_type: Option<DitherType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dither_kernel: Option<DitherKernel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Delivery seam: anything that can put a finished payload on a device.
pub trait Deliver {
    fn display_text(&self, request: &DisplayTextRequest) -> Result<ApiResponse, DeliveryError>;
    fn display_image(&self, request: &DisplayImageRequest) -> Result<ApiResponse, DeliveryError>;
}

/// Bearer-auth HTTP client for the device API.
pub struct DotClient {
    base_url: String,
    api_key: String,
    http: reqwest::blocking::Client,
}

impl DotClient {
    pub fn new(api_key: &str) -> Result<Self, DeliveryError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, DeliveryError> {
        let http = reqwest::blocking::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            http,
        })
    }

    fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse, DeliveryError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }
}

impl Deliver for DotClient {
    fn display_text(&self, request: &DisplayTextRequest) -> Result<ApiResponse, DeliveryError> {
        self.post("text", request)
    }

    fn display_image(&self, request: &DisplayImageRequest) -> Result<ApiResponse, DeliveryError> {
        self.post("image", request)
    }
}

/// Demo-mode client: saves images under an output directory and logs text
/// payloads instead of touching the network.
pub struct DemoClient {
    output_dir: PathBuf,
}

impl DemoClient {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }
}

impl Deliver for DemoClient {
    fn display_text(&self, request: &DisplayTextRequest) -> Result<ApiResponse, DeliveryError> {
        log::info!(
            "demo text for {}: title={:?} message={:?}",
            request.device_id,
            request.title,
            request.message
        );
        Ok(ApiResponse { message: "demo mode: text not sent".to_owned() })
    }

    fn display_image(&self, request: &DisplayImageRequest) -> Result<ApiResponse, DeliveryError> {
        let image_data = BASE64.decode(&request.image)?;
        std::fs::create_dir_all(&self.output_dir)?;
        let filename = format!("demo_{}.png", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.output_dir.join(filename);
        std::fs::write(&path, &image_data)?;
        log::info!("demo image saved to {} ({} bytes)", path.display(), image_data.len());
        Ok(ApiResponse { message: format!("demo mode: image saved to {}", path.display()) })
    }
}

/// Ship a finished render to a device through any delivery backend.
pub fn deliver(
    client: &dyn Deliver,
    device_id: &str,
    result: &RenderResult,
) -> Result<ApiResponse, DeliveryError> {
    match result {
        RenderResult::Text(TextPayload { title, message, signature }) => {
            client.display_text(&DisplayTextRequest {
                refresh_now: true,
                device_id: device_id.to_owned(),
                title: title.clone(),
                message: message.clone(),
                signature: signature.clone(),
                icon: None,
                link: None,
            })
        }
        RenderResult::Image(payload) => client.display_image(&DisplayImageRequest {
            refresh_now: true,
            device_id: device_id.to_owned(),
            image: BASE64.encode(&payload.png),
            link: payload.hints.link.clone(),
            border: payload.hints.border,
            dither_type: payload.hints.dither_type,
            dither_kernel: payload.hints.dither_kernel,
        }),
    }
}
