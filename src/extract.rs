use crate::errors::AppError;
use axum::extract::FromRequest;

/// `Json` whose rejections render as the usual `{"error": {...}}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
