//! Multipart file extractor that returns errors as JSON

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::error::{ApiErrorDetail, ApiErrorResponse, ApiErrorType};

/// Multipart field the file must be sent in
pub const UPLOAD_FIELD: &str = "file";

/// The `file` part of a multipart request
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct UploadRejection {
    status: StatusCode,
    message: String,
    code: &'static str,
}

impl UploadRejection {
    fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }
}

impl IntoResponse for UploadRejection {
    fn into_response(self) -> Response {
        let response = ApiErrorResponse {
            error: ApiErrorDetail {
                message: self.message,
                error_type: ApiErrorType::InvalidRequestError,
                param: Some(UPLOAD_FIELD.to_string()),
                code: Some(self.code.to_string()),
            },
        };

        (self.status, Json(response)).into_response()
    }
}

impl<S> FromRequest<S> for Upload
where
    S: Send + Sync,
{
    type Rejection = UploadRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await.map_err(|rejection| {
            UploadRejection::new(
                StatusCode::BAD_REQUEST,
                format!("Expected a multipart/form-data upload: {}", rejection.body_text()),
                "invalid_multipart",
            )
        })?;

        loop {
            let field = multipart.next_field().await.map_err(|e| {
                UploadRejection::new(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read multipart body: {}", e.body_text()),
                    "invalid_multipart",
                )
            })?;

            let Some(field) = field else {
                return Err(UploadRejection::new(
                    StatusCode::BAD_REQUEST,
                    format!("Missing multipart field '{}'", UPLOAD_FIELD),
                    "missing_file",
                ));
            };

            if field.name() != Some(UPLOAD_FIELD) {
                continue;
            }

            let filename = field.file_name().unwrap_or(UPLOAD_FIELD).to_string();
            let bytes = field.bytes().await.map_err(|e| {
                UploadRejection::new(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read uploaded file: {}", e.body_text()),
                    "invalid_multipart",
                )
            })?;

            if bytes.is_empty() {
                return Err(UploadRejection::new(
                    StatusCode::BAD_REQUEST,
                    "Uploaded file is empty",
                    "empty_file",
                ));
            }

            return Ok(Upload {
                filename,
                bytes: bytes.to_vec(),
            });
        }
    }
}
