use std::collections::BTreeMap;

use axum::{
	extract::rejection::{JsonRejection, PathRejection, QueryRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use serde_json::json;

use crate::mail::MailError;

pub type ApiResult<T> = Result<T, ApiError>;

pub const REQUIRED: &str = "This field is required.";
pub const NON_FIELD: &str = "non_field_errors";

/// Validation messages keyed by field name, rendered as
/// `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, field: &str, message: impl Into<String>) {
		self.0.entry(field.to_string()).or_default().push(message.into());
	}

	/// Records the outcome of a field validator.
	pub fn check(&mut self, field: &str, res: Result<(), String>) {
		if let Err(msg) = res {
			self.add(field, msg);
		}
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn get(&self, field: &str) -> Option<&[String]> {
		self.0.get(field).map(Vec::as_slice)
	}

	pub fn into_result(self) -> ApiResult<()> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(ApiError::Validation(self))
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
	#[error("validation failed: {0:?}")]
	Validation(FieldErrors),

	#[error("{0}")]
	BadRequest(String),

	#[error("Authentication credentials were not provided.")]
	NotAuthenticated,

	#[error("Given token not valid for any token type.")]
	InvalidToken,

	#[error("You do not have permission to perform this action.")]
	PermissionDenied,

	#[error("Not found.")]
	NotFound,

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("mail delivery failed: {0}")]
	Mail(#[from] MailError),

	#[error("token signing failed: {0}")]
	Token(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
	pub fn field(field: &str, message: impl Into<String>) -> Self {
		let mut errors = FieldErrors::new();
		errors.add(field, message);
		Self::Validation(errors)
	}

	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
			Self::NotAuthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,
			Self::PermissionDenied => StatusCode::FORBIDDEN,
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::Database(_) | Self::Mail(_) | Self::Token(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		match self {
			Self::Validation(errors) => (status, Json(errors)).into_response(),
			Self::Database(_) | Self::Mail(_) | Self::Token(_) => {
				tracing::error!(error = %self, "request failed");
				(status, Json(json!({ "detail": "Internal server error." }))).into_response()
			}
			other => (status, Json(json!({ "detail": other.to_string() }))).into_response(),
		}
	}
}

impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::BadRequest(rejection.body_text())
	}
}

impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		Self::BadRequest(rejection.body_text())
	}
}

impl From<PathRejection> for ApiError {
	fn from(_: PathRejection) -> Self {
		Self::NotFound
	}
}

/// True when `err` is a UNIQUE constraint violation reported by the database.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
	err.as_database_error()
		.is_some_and(|db_err| db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn field_errors_serialize_as_map_of_lists() {
		let mut errors = FieldErrors::new();
		errors.add("score", "too high");
		errors.add("score", "not even");
		errors.check("text", Ok(()));
		errors.check("year", Err("future".to_string()));

		let value = serde_json::to_value(&errors).unwrap();
		assert_eq!(value, json!({ "score": ["too high", "not even"], "year": ["future"] }));
	}

	#[test]
	fn statuses() {
		assert_eq!(ApiError::field("x", "y").status(), StatusCode::BAD_REQUEST);
		assert_eq!(ApiError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(ApiError::PermissionDenied.status(), StatusCode::FORBIDDEN);
		assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
	}
}
