use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::validation::ValidationError;

/// JSON body of every non-2xx response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  /// The `host:port` the request was about, when there is one
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  /// The requested server is not in the configured server list
  ServerNotTracked { hostname: String, port: u16 },
  /// The hostname in the path failed validation
  InvalidHostname(ValidationError),
}

impl AppError {
  fn status(&self) -> StatusCode {
    match self {
      AppError::ServerNotTracked { .. } => StatusCode::NOT_FOUND,
      AppError::InvalidHostname(_) => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match self {
      AppError::ServerNotTracked { hostname, port } => {
        let server = format!("{hostname}:{port}");
        tracing::debug!(%server, "status requested for untracked server");
        ErrorResponse {
          error: "Server not tracked".to_string(),
          details: Some(server),
        }
      }
      AppError::InvalidHostname(err) => {
        tracing::warn!(%err, "rejected hostname");
        ErrorResponse {
          error: err.to_string(),
          details: None,
        }
      }
    };
    (status, Json(body)).into_response()
  }
}

impl From<ValidationError> for AppError {
  fn from(err: ValidationError) -> Self {
    AppError::InvalidHostname(err)
  }
}
