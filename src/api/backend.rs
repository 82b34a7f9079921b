use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use tracing::{debug, warn};

use crate::api::{ChatRequest, ErrorBody, StructuredResponse, UploadResponse};
use crate::utils::url::construct_api_url;

pub const USER_ID_HEADER: &str = "x-user-id";

pub const CHAT_ENDPOINT: &str = "chat";
pub const CHAT_STREAM_ENDPOINT: &str = "chat/stream";

/// Failures talking to the chat backend.
#[derive(Debug)]
pub enum BackendError {
    /// The request never produced an HTTP response.
    Connect(reqwest::Error),

    /// The backend answered with a non-2xx status.
    Status {
        status: StatusCode,
        /// Human-readable reason, usually the `detail` field of the body.
        detail: Option<String>,
    },

    /// A 2xx response whose body could not be understood.
    InvalidResponse(String),

    /// A local file (an image to upload) could not be read.
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl BackendError {
    /// True for transport failures (DNS, refused connection, reset).
    pub fn is_connect(&self) -> bool {
        matches!(self, BackendError::Connect(_))
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            BackendError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Connect(_) => write!(f, "could not connect to the server"),
            BackendError::Status { status, detail } => match detail {
                Some(detail) => write!(f, "{detail}"),
                None => write!(f, "{}", status.as_u16()),
            },
            BackendError::InvalidResponse(message) => write!(f, "invalid response: {message}"),
            BackendError::File { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            BackendError::Connect(err) => Some(err),
            BackendError::File { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Builds a [`BackendError::Status`] from a failed response, pulling the
/// `detail` field out of a JSON error body when there is one.
pub async fn status_error(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|body| body.detail_text());
    debug!(%status, ?detail, "backend returned an error status");
    BackendError::Status { status, detail }
}

fn connect_error(err: reqwest::Error) -> BackendError {
    warn!(error = %err, "backend request failed");
    BackendError::Connect(err)
}

/// `GET /auth/verify`. Any 2xx status means the user id is accepted.
pub async fn verify_user(
    client: &reqwest::Client,
    base_url: &str,
    user_id: &str,
) -> Result<(), BackendError> {
    let response = client
        .get(construct_api_url(base_url, "auth/verify"))
        .header(USER_ID_HEADER, user_id)
        .send()
        .await
        .map_err(connect_error)?;

    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    Ok(())
}

/// `POST /upload-image` with the file under the multipart field `file`.
///
/// A failed upload without a `detail` in its body reports
/// "image upload failed".
pub async fn upload_image(
    client: &reqwest::Client,
    base_url: &str,
    user_id: &str,
    path: &Path,
) -> Result<UploadResponse, BackendError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| BackendError::File {
            path: path.to_path_buf(),
            source,
        })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(guess_image_mime(path))
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;
    let form = Form::new().part("file", part);

    let response = client
        .post(construct_api_url(base_url, "upload-image"))
        .header(USER_ID_HEADER, user_id)
        .multipart(form)
        .send()
        .await
        .map_err(connect_error)?;

    if !response.status().is_success() {
        return Err(match status_error(response).await {
            BackendError::Status {
                status,
                detail: None,
            } => BackendError::Status {
                status,
                detail: Some("image upload failed".to_string()),
            },
            other => other,
        });
    }

    response
        .json::<UploadResponse>()
        .await
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))
}

/// `POST /chat`: the whole structured response in one JSON document.
pub async fn fetch_answer(
    client: &reqwest::Client,
    base_url: &str,
    user_id: &str,
    request: &ChatRequest,
) -> Result<StructuredResponse, BackendError> {
    let response = post_chat(client, base_url, CHAT_ENDPOINT, user_id, request).await?;
    response
        .json::<StructuredResponse>()
        .await
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))
}

/// `POST /chat/stream`. The returned response has a 2xx status; its body is
/// the NDJSON event stream.
pub async fn open_chat_stream(
    client: &reqwest::Client,
    base_url: &str,
    user_id: &str,
    request: &ChatRequest,
) -> Result<Response, BackendError> {
    post_chat(client, base_url, CHAT_STREAM_ENDPOINT, user_id, request).await
}

async fn post_chat(
    client: &reqwest::Client,
    base_url: &str,
    endpoint: &str,
    user_id: &str,
    request: &ChatRequest,
) -> Result<Response, BackendError> {
    debug!(
        endpoint,
        top_k = request.top_k,
        has_image = request.image_uri.is_some(),
        "submitting chat request"
    );
    let response = client
        .post(construct_api_url(base_url, endpoint))
        .header("Content-Type", "application/json")
        .header(USER_ID_HEADER, user_id)
        .json(request)
        .send()
        .await
        .map_err(connect_error)?;

    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    Ok(response)
}

fn guess_image_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
