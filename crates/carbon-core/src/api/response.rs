//! Tagged result of every request made against the carbon service.
//!
//! The server wraps each reply in a JSON envelope
//! `{ "success": bool, "body": ..., "msg": "..." }`. The tag is taken from the
//! envelope and the code from the HTTP status.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuccessCode {
    Ok,
}

impl SuccessCode {
    pub fn as_u16(self) -> u16 {
        match self {
            SuccessCode::Ok => 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    ServerError,
}

impl FailureCode {
    pub fn as_u16(self) -> u16 {
        match self {
            FailureCode::BadRequest => 400,
            FailureCode::Forbidden => 403,
            FailureCode::NotFound => 404,
            FailureCode::MethodNotAllowed => 405,
            FailureCode::ServerError => 500,
        }
    }

    /// Map an HTTP status onto the closed set of failure codes.
    /// Unlisted 4xx statuses become `BadRequest`, everything else `ServerError`.
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => FailureCode::Forbidden,
            404 => FailureCode::NotFound,
            405 => FailureCode::MethodNotAllowed,
            400..=499 => FailureCode::BadRequest,
            _ => FailureCode::ServerError,
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response<T> {
    Success { code: SuccessCode, body: T },
    Failure { code: FailureCode, msg: String },
}

impl<T> Response<T> {
    pub fn success(body: T) -> Self {
        Response::Success {
            code: SuccessCode::Ok,
            body,
        }
    }

    pub fn failure(code: FailureCode, msg: impl Into<String>) -> Self {
        Response::Failure {
            code,
            msg: msg.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    /// Numeric status code of the response.
    pub fn code(&self) -> u16 {
        match self {
            Response::Success { code, .. } => code.as_u16(),
            Response::Failure { code, .. } => code.as_u16(),
        }
    }

    pub fn body(&self) -> Option<&T> {
        match self {
            Response::Success { body, .. } => Some(body),
            Response::Failure { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        match self {
            Response::Success { code, body } => Response::Success {
                code,
                body: f(body),
            },
            Response::Failure { code, msg } => Response::Failure { code, msg },
        }
    }

    pub fn into_result(self) -> Result<T, (FailureCode, String)> {
        match self {
            Response::Success { body, .. } => Ok(body),
            Response::Failure { code, msg } => Err((code, msg)),
        }
    }
}

impl Response<Value> {
    /// Decode the body into `T`. A body of the wrong shape is a server
    /// failure.
    pub fn decode<T: DeserializeOwned>(self) -> Response<T> {
        match self {
            Response::Success { code, body } => match serde_json::from_value(body) {
                Ok(body) => Response::Success { code, body },
                Err(e) => Response::failure(
                    FailureCode::ServerError,
                    format!("Invalid response body: {}", e),
                ),
            },
            Response::Failure { code, msg } => Response::Failure { code, msg },
        }
    }

    /// Build a response from an HTTP status and the raw envelope text.
    pub fn from_envelope(status: u16, text: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            success: bool,
            #[serde(default)]
            body: Value,
            #[serde(default)]
            msg: Option<String>,
        }

        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) if envelope.success => Response::success(envelope.body),
            Ok(envelope) => Response::failure(
                FailureCode::from_status(status),
                envelope.msg.unwrap_or_default(),
            ),
            Err(_) => ApiError::invalid_response(text).into_response(),
        }
    }
}
