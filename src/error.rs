use log::{error, warn};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json, Value};
use rocket::Request;

use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("DATABASE_URL not set")]
    NotConfigured,
    #[error("{0}")]
    BadRequest(String),
    /// A value in an accepted body that no column can hold.
    #[error("{0}")]
    Unstorable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("store task failed: {0}")]
    Join(#[from] rocket::tokio::task::JoinError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::NotConfigured
            | ApiError::Unstorable(_)
            | ApiError::Store(_)
            | ApiError::Join(_) => Status::InternalServerError,
        }
    }
}

/// Body shape shared by handler errors and catchers.
pub fn error_body(detail: &str) -> Json<Value> {
    Json(json!({ "detail": detail }))
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let detail = self.to_string();
        if status.code >= 500 {
            error!("{} {} failed: {}", req.method(), req.uri(), detail);
        } else {
            warn!("{} {} rejected: {}", req.method(), req.uri(), detail);
        }
        (status, error_body(&detail)).respond_to(req)
    }
}
