use std::time::Duration;

use axum::{
	async_trait,
	extract::FromRequestParts,
	http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::error::ApiError;
use crate::repo::users;
use crate::types::{Uid, User};
use crate::AppState;

pub const TOKEN_COOKIE: &str = "access_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// User id.
	pub sub: String,
	pub exp: i64,
	pub iat: i64,
	pub jti: String,
}

/// HS256 signing material and token lifetime.
#[derive(Clone)]
pub struct TokenKeys {
	encoding: EncodingKey,
	decoding: DecodingKey,
	ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenKeys").field("ttl", &self.ttl).finish_non_exhaustive()
	}
}

impl TokenKeys {
	pub fn new(secret: &str, ttl: Duration) -> Self {
		TokenKeys {
			encoding: EncodingKey::from_secret(secret.as_bytes()),
			decoding: DecodingKey::from_secret(secret.as_bytes()),
			ttl,
		}
	}

	pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
		let now = Utc::now().timestamp();
		let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
		let claims = Claims {
			sub: user.id.to_string(),
			exp: now.saturating_add(ttl),
			iat: now,
			jti: Uuid::new_v4().simple().to_string(),
		};
		encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
	}

	pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
		let validation = Validation::new(Algorithm::HS256);
		decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
	}
}

/// The requesting account, if the request carried a valid access token.
///
/// A token that is present but invalid, expired, or names a deleted user is
/// rejected with 401 rather than downgraded to an anonymous request.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<User>);

impl Identity {
	pub fn user(&self) -> Option<&User> {
		self.0.as_ref()
	}

	/// The user, or 401 for anonymous requests.
	pub fn require(&self) -> Result<&User, ApiError> {
		self.user().ok_or(ApiError::NotAuthenticated)
	}
}

fn bearer(parts: &Parts) -> Option<String> {
	let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.split_once(' ')?;
	scheme
		.eq_ignore_ascii_case("bearer")
		.then(|| token.trim().to_string())
}

async fn cookie(parts: &mut Parts, state: &AppState) -> Option<String> {
	let cookies = Cookies::from_request_parts(parts, state).await.ok()?;
	cookies.get(TOKEN_COOKIE).map(|c| c.value().to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		if let Some(identity) = parts.extensions.get::<Identity>() {
			return Ok(identity.clone());
		}

		let token = match bearer(parts) {
			Some(token) => Some(token),
			None => cookie(parts, state).await,
		};
		let Some(token) = token else {
			return Ok(Identity(None));
		};

		let claims = state.keys.verify(&token).map_err(|err| {
			tracing::debug!(error = %err, "rejected access token");
			ApiError::InvalidToken
		})?;
		let id: Uid = claims.sub.parse().map_err(|_| ApiError::InvalidToken)?;
		let user = users::by_id(&state.db, id)
			.await?
			.ok_or(ApiError::InvalidToken)?;

		let identity = Identity(Some(user));
		parts.extensions.insert(identity.clone());
		Ok(identity)
	}
}
