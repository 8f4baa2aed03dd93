//! Route handlers, one module per subsystem.
//!
//! Handlers resolve the caller, call one service operation and shape the
//! response. Authorization lives in the services.

pub mod agreements;
pub mod auth;
pub mod bills;
pub mod dashboard;
pub mod dfs;
pub mod notifications;
pub mod payments;
pub mod system;
pub mod users;

use crate::domain::error::{ApiError, ApiResult};
use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use shared_types::{FileRef, PageRequest};
use sl_02_record_store::Upload;
use std::collections::HashMap;

/// Offset paging parameters shared by listing endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        let default = PageRequest::default();
        PageRequest::new(
            q.offset.unwrap_or(default.offset),
            q.limit.unwrap_or(default.limit),
        )
    }
}

/// Run CPU-heavy work (password hashing) off the async workers.
pub(crate) async fn blocking<T, E, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {e}")))?
        .map_err(Into::into)
}

/// A multipart form: text fields plus at most one file part.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<Upload>,
}

#[async_trait]
impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let mut multipart = Multipart::from_request(req, state).await?;
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    if form.file.is_some() {
                        return Err(ApiError::invalid("only one file per request"));
                    }
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    form.file = Some(Upload::new(file_name, content_type, bytes.to_vec()));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }
}

impl UploadForm {
    /// A trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn require_text(&self, name: &str) -> ApiResult<String> {
        self.text(name)
            .ok_or_else(|| ApiError::invalid(format!("{name} is required")))
    }

    pub fn take_file(&mut self) -> ApiResult<Upload> {
        self.file
            .take()
            .ok_or_else(|| ApiError::invalid("a file part is required"))
    }
}

/// Serve stored bytes as an attachment.
pub(crate) fn file_response(file: FileRef, bytes: Vec<u8>) -> Response {
    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let safe_name: String = file
        .file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{safe_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    if let Ok(digest) = HeaderValue::from_str(&file.sha256) {
        headers.insert("x-content-sha256", digest);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let page: PageRequest = PageQuery::default().into();
        assert_eq!(page, PageRequest::default());

        let page: PageRequest = PageQuery {
            offset: Some(20),
            limit: None,
        }
        .into();
        assert_eq!(page.offset, 20);
        assert_eq!(page.limit, PageRequest::default().limit);
    }

    #[test]
    fn test_file_response_headers() {
        let file = FileRef {
            key: "documents/x/plan.pdf".into(),
            file_name: "site \"plan\".pdf".into(),
            content_type: "application/pdf".into(),
            size: 3,
            sha256: "abc".into(),
        };
        let response = file_response(file, vec![1, 2, 3]);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"site plan.pdf\""
        );
        assert_eq!(response.headers()["x-content-sha256"], "abc");
    }
}
