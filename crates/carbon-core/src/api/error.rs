use thiserror::Error;

use super::response::{FailureCode, Response};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn invalid_response(body: &str) -> Self {
        ApiError::InvalidResponse(Self::truncate_body(body))
    }

    pub fn failure_code(&self) -> FailureCode {
        match self {
            ApiError::InvalidBody(_) => FailureCode::BadRequest,
            ApiError::NetworkError(_) | ApiError::InvalidResponse(_) => FailureCode::ServerError,
        }
    }

    /// Turn a local problem into the tagged failure callers branch on.
    pub fn into_response<T>(self) -> Response<T> {
        Response::failure(self.failure_code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        let short = ApiError::invalid_response("oops");
        assert_eq!(short.to_string(), "Invalid response: oops");

        let long = "x".repeat(600);
        let truncated = ApiError::invalid_response(&long).to_string();
        assert!(truncated.contains("truncated, 600 total bytes"));
        assert!(truncated.len() < 600);
    }

    #[test]
    fn test_into_response() {
        let r: Response<()> = ApiError::invalid_response("garbage").into_response();
        assert_eq!(r.code(), 500);
        assert!(!r.is_success());
    }
}
