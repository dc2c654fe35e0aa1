//! HTTP request/response types and error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::generate::GeneratedFileType;
use crate::listing::{ListingQuery, MAX_PAGE_SIZE, MIN_PAGE_SIZE};

// ============ Requests ============

/// Query string of `GET /files`
///
/// Everything arrives as a string so that a bad `page_size` is reported
/// in the same 422 shape as every other listing validation failure.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilesParams {
    pub directory: Option<String>,
    pub page_token: Option<String>,
    pub page_size: Option<String>,
}

impl ListFilesParams {
    pub fn into_query(self) -> Result<ListingQuery> {
        let mut query = ListingQuery {
            directory_prefix: self.directory,
            continuation_token: self.page_token,
            ..ListingQuery::default()
        }
        .normalized();

        if let Some(raw) = self.page_size {
            query.page_size = raw.trim().parse::<u32>().map_err(|_| {
                Error::invalid_query(
                    format!(
                        "page_size must be an integer between {} and {}",
                        MIN_PAGE_SIZE, MAX_PAGE_SIZE
                    ),
                    raw.clone(),
                )
            })?;
        }

        Ok(query)
    }
}

/// Query string of `POST /generated/*path`
#[derive(Debug, Default, Deserialize)]
pub struct GenerateParams {
    pub prompt: Option<String>,
    pub file_type: Option<String>,
}

impl GenerateParams {
    pub fn into_parts(self) -> Result<(String, GeneratedFileType)> {
        let prompt = self
            .prompt
            .ok_or_else(|| Error::InvalidRequest("missing query parameter 'prompt'".into()))?;
        let file_type = self
            .file_type
            .ok_or_else(|| Error::InvalidRequest("missing query parameter 'file_type'".into()))?
            .parse()?;
        Ok((prompt, file_type))
    }
}

// ============ Responses ============

/// Upload / generation acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct FileWriteResponse {
    pub file_path: String,
    pub message: String,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub bucket: String,
    pub generation_enabled: bool,
}

/// One validation failure
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationDetail {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// 422 body
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub detail: Vec<ValidationDetail>,
}

/// 404 / 503 body
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

/// 500 body
#[derive(Debug, Serialize, Deserialize)]
pub struct InternalErrorResponse {
    pub message: String,
    pub detail: String,
}

impl InternalErrorResponse {
    pub fn generic() -> Self {
        Self {
            message: "An unexpected error occurred.".into(),
            detail: "Internal Server Error".into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidQuery { reason, input } => {
                tracing::debug!("Rejected query: {} (input: {})", reason, input);
                validation_error(reason, Some(input))
            }
            Error::InvalidRequest(msg) => {
                tracing::debug!("Rejected request: {}", msg);
                validation_error(msg, None)
            }
            Error::FileNotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(DetailResponse { detail: self.to_string() }),
            )
                .into_response(),
            Error::GenerationDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(DetailResponse { detail: self.to_string() }),
            )
                .into_response(),
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(InternalErrorResponse::generic()),
                )
                    .into_response()
            }
        }
    }
}

fn validation_error(msg: String, input: Option<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ValidationErrorResponse {
            detail: vec![ValidationDetail { msg, input }],
        }),
    )
        .into_response()
}
