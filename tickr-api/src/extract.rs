//! Request extractors
//!
//! `ApiJson` is `axum::Json` with rejections rendered as `ApiError`, so a body
//! that does not deserialize answers 400 with the usual error envelope.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON body extractor answering malformed input with `ApiError`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
