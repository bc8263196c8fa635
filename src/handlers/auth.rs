use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use super::ApiJson;
use crate::auth::TOKEN_COOKIE;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::forms::{SignupForm, TokenForm};
use crate::mail::Email;
use crate::repo::users::{self, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::AppState;

pub const WRONG_CODE: &str = "Invalid confirmation code.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResponse {
	pub username: String,
	pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	pub token: String,
}

/// Registers (or re-registers) an account and mails it a fresh
/// confirmation code.
pub async fn signup(
	State(state): State<AppState>,
	ApiJson(form): ApiJson<SignupForm>,
) -> ApiResult<Json<SignupResponse>> {
	let (username, email) = form.validate()?;

	// the pair must name one account, or none
	let by_email = users::by_email(&state.db, &email).await?;
	let by_username = users::by_username(&state.db, &username).await?;
	if by_email.as_ref().map(|u| u.id) != by_username.as_ref().map(|u| u.id) {
		let mut errors = FieldErrors::new();
		if by_email.is_some() {
			errors.add("email", EMAIL_TAKEN);
		}
		if by_username.is_some() {
			errors.add("username", USERNAME_TAKEN);
		}
		return Err(ApiError::Validation(errors));
	}

	let user = users::get_or_create(&state.db, &username, &email).await?;
	let code = Uuid::new_v4().simple().to_string();
	users::set_confirmation_code(&state.db, user.id, &code).await?;

	state.mailer.send(&Email {
		from: state.settings.from_email.clone(),
		to: user.email.clone(),
		subject: "Confirmation code".to_string(),
		body: format!("Your confirmation code: {code}"),
	})
	.await?;
	tracing::info!(user = user.id, username = %user.username, "confirmation code sent");

	Ok(Json(SignupResponse { username: user.username, email: user.email }))
}

/// Exchanges a confirmation code for an access token. The code is spent on
/// success.
pub async fn token(
	State(state): State<AppState>,
	cookies: Cookies,
	ApiJson(form): ApiJson<TokenForm>,
) -> ApiResult<Json<TokenResponse>> {
	let (username, code) = form.validate()?;
	let user = users::by_username(&state.db, &username)
		.await?
		.ok_or(ApiError::NotFound)?;

	if !users::consume_confirmation_code(&state.db, user.id, &code).await? {
		tracing::debug!(user = user.id, "wrong confirmation code");
		return Err(ApiError::field("confirmation_code", WRONG_CODE));
	}

	let token = state.keys.issue(&user)?;
	cookies.add(
		Cookie::build((TOKEN_COOKIE, token.clone()))
			.path("/")
			.http_only(true)
			.build(),
	);
	tracing::info!(user = user.id, "access token issued");
	Ok(Json(TokenResponse { token }))
}
