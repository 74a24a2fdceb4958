use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::views;

/// Every way a lookup request can end without a result page. All of them are
/// reported back on the upload form.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Please select a file.")]
    MissingUpload,
    #[error("Invalid file type.")]
    InvalidFileType,
    #[error("Invalid file name.")]
    InvalidFileName,
    #[error("Filename \"{0}\" not in records.")]
    UnknownFilename(String),
    #[error("Mask not found for {0}.")]
    MaskNotFound(String),
    #[error("Could not store files, please try again.")]
    Storage(#[from] std::io::Error),
    #[error("File is too large.")]
    TooLarge,
    #[error("Please select a file.")]
    Multipart(MultipartError),
}

impl From<MultipartError> for LookupError {
    fn from(err: MultipartError) -> Self {
        // the body limit only shows up once the stream is read
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            LookupError::TooLarge
        } else {
            LookupError::Multipart(err)
        }
    }
}

impl From<MultipartRejection> for LookupError {
    fn from(rejection: MultipartRejection) -> Self {
        warn!("not a multipart request: {}", rejection.body_text());
        LookupError::MissingUpload
    }
}

impl LookupError {
    pub fn status(&self) -> StatusCode {
        match self {
            LookupError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LookupError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::OK,
        }
    }
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        match &self {
            LookupError::Storage(err) => error!("storage failure: {}", err),
            LookupError::Multipart(err) => warn!("malformed multipart body: {}", err),
            other => warn!("lookup rejected: {}", other),
        }
        (self.status(), Html(views::upload_page(Some(&self.to_string())))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_form_copy() {
        assert_eq!(LookupError::MissingUpload.to_string(), "Please select a file.");
        assert_eq!(LookupError::InvalidFileType.to_string(), "Invalid file type.");
        assert_eq!(
            LookupError::UnknownFilename("leaf9.png".into()).to_string(),
            "Filename \"leaf9.png\" not in records."
        );
        assert_eq!(
            LookupError::MaskNotFound("leaf9.png".into()).to_string(),
            "Mask not found for leaf9.png."
        );
    }

    #[test]
    fn only_storage_failures_are_server_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(LookupError::from(io).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(LookupError::InvalidFileType.status(), StatusCode::OK);
        assert_eq!(LookupError::TooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(LookupError::TooLarge.to_string(), "File is too large.");
        assert_eq!(
            LookupError::UnknownFilename("x.png".into()).status(),
            StatusCode::OK
        );
    }
}
