//! REST API access for the carbon service.
//!
//! This module provides:
//! - `Transport`: the raw request functions, one per HTTP verb
//! - `HttpTransport`: the `reqwest` implementation
//! - `ApiClient`: base URL resolution and session headers on top of a transport
//! - `Response`: the tagged success/failure result every call returns

pub mod client;
pub mod error;
pub mod response;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use response::{FailureCode, Response, SuccessCode};
pub use transport::{Headers, HttpTransport, Method, Transport};
