//! Request and response types shared by the handlers

pub mod error;
pub mod upload;

pub use error::{ApiError, ApiErrorResponse};
pub use upload::{Upload, UPLOAD_FIELD};
