//! HTTP handlers and the JSON error envelope shared by them.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::execution::PredictionError;

pub mod health;
pub mod predict;

/// Body of every error response: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

impl ResponseError for PredictionError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::InvalidInput => StatusCode::BAD_REQUEST,
            PredictionError::Execution(_) | PredictionError::Output(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorBody::new("Not found"))
}
