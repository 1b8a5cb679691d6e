//! Blog post publishing.
//!
//! Posts are created with a single `multipart/form-data` request to
//! `{BASE_URL}/posts`:
//!
//! | Part | Kind | Notes |
//! |------|------|-------|
//! | `title` | text | `"{date} {title_suffix}"` |
//! | `content` | text | rendered HTML fragment |
//! | `category` | text | |
//! | `writer` | text | |
//! | `images` | file | zero or more |
//! | `thumbnail` | file | skipped when the file does not exist |
//!
//! Any failure comes back as an [`ApiError`] whose message is forwarded to
//! the notifier unchanged.

use crate::models::PostDraft;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Failure reported by the blog API or the transport in front of it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, when the server answered at all.
    pub status: Option<u16>,
    /// The body's `message` field, the raw body, or the transport error.
    pub message: String,
}

impl ApiError {
    fn transport(e: impl std::fmt::Display) -> Self {
        Self {
            status: None,
            message: e.to_string(),
        }
    }

    /// Build an error from a non-success response, preferring the body's
    /// `message` field when it is JSON.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }

        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| {
                let body = body.trim();
                if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.to_string()
                }
            });
        Self {
            status: Some(status),
            message,
        }
    }
}

/// Client for the remote blog's post-creation endpoint.
#[derive(Debug, Clone)]
pub struct BlogClient {
    http: Client,
    /// API root (`BASE_URL`); `/posts` is appended to it.
    base_url: String,
}

impl BlogClient {
    /// Create a client for the blog API rooted at `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, with or without a trailing slash
    ///
    /// # Example
    ///
    /// ```ignore
    /// let blog = BlogClient::new("https://blog.example/api");
    /// assert_eq!(blog.posts_url(), "https://blog.example/api/posts");
    /// blog.create_post(&draft).await?;
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// The post-creation endpoint.
    pub fn posts_url(&self) -> String {
        format!("{}/posts", self.base_url.trim_end_matches('/'))
    }

    /// Create a post from `draft`.
    ///
    /// # Returns
    ///
    /// `Ok(())` on any 2xx response. Otherwise an [`ApiError`] carrying the
    /// HTTP status (`None` for transport and local file errors) and the
    /// message to forward to the notifier.
    #[instrument(
        level = "info",
        skip_all,
        fields(title = %draft.title, category = %draft.category)
    )]
    pub async fn create_post(&self, draft: &PostDraft) -> Result<(), ApiError> {
        let t0 = Instant::now();
        let form = build_form(draft).await?;

        let resp = self
            .http
            .post(self.posts_url())
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = ApiError::from_response(status.as_u16(), &body);
            warn!(%status, error = %err, "Post creation rejected");
            return Err(err);
        }

        info!(
            %status,
            elapsed_ms = t0.elapsed().as_millis() as u128,
            "Post created"
        );
        Ok(())
    }
}

async fn build_form(draft: &PostDraft) -> Result<Form, ApiError> {
    let mut form = Form::new()
        .text("title", draft.title.clone())
        .text("content", draft.content.clone())
        .text("category", draft.category.clone())
        .text("writer", draft.writer.clone());

    for path in &draft.image_paths {
        form = form.part("images", file_part(path).await?);
    }

    if let Some(path) = &draft.thumbnail_path {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            form = form.part("thumbnail", file_part(path).await?);
        } else {
            warn!(path = %path.display(), "Thumbnail not found; posting without it");
        }
    }
    Ok(form)
}

async fn file_part(path: &Path) -> Result<Part, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| ApiError {
        status: None,
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(ApiError::transport)
}
