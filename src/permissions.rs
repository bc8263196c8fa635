//! Access policies per endpoint group.
//!
//! A policy answers two questions: may this request reach the endpoint at
//! all, and may it act on this particular object. Both are pure functions
//! of the method, the caller, and (for the second) the object's owner.

use axum::{
	extract::{FromRequestParts, Request, State},
	http::Method,
	middleware::Next,
	response::Response,
};

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::types::{Uid, User};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
	/// Anyone may read; only admins write.
	AdminOrReadOnly,
	/// Anyone may read; signed-in users create; the author or staff edit.
	AuthorOrStaffOrReadOnly,
	/// Admins only, whatever the method.
	AdminOnly,
	/// Signed-in users, and only on their own account.
	SelfOnly,
}

pub fn is_safe(method: &Method) -> bool {
	matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn is_admin(user: Option<&User>) -> bool {
	user.is_some_and(User::is_admin)
}

impl Policy {
	pub fn has_permission(self, method: &Method, user: Option<&User>) -> bool {
		match self {
			Policy::AdminOrReadOnly => is_safe(method) || is_admin(user),
			Policy::AuthorOrStaffOrReadOnly => is_safe(method) || user.is_some(),
			Policy::AdminOnly => is_admin(user),
			Policy::SelfOnly => user.is_some(),
		}
	}

	pub fn has_object_permission(self, method: &Method, user: Option<&User>, owner: Uid) -> bool {
		match self {
			Policy::AdminOrReadOnly | Policy::AdminOnly => true,
			Policy::AuthorOrStaffOrReadOnly => {
				is_safe(method)
					|| user.is_some_and(|user| {
						user.id == owner || user.is_moderator() || user.is_admin()
					})
			}
			Policy::SelfOnly => user.is_some_and(|user| user.id == owner),
		}
	}

	pub fn check(self, method: &Method, user: Option<&User>) -> ApiResult<()> {
		if self.has_permission(method, user) {
			Ok(())
		} else {
			Err(denied(user))
		}
	}

	pub fn check_object(self, method: &Method, user: Option<&User>, owner: Uid) -> ApiResult<()> {
		if self.has_object_permission(method, user, owner) {
			Ok(())
		} else {
			Err(denied(user))
		}
	}
}

/// 401 when nobody is signed in, 403 otherwise.
fn denied(user: Option<&User>) -> ApiError {
	match user {
		None => ApiError::NotAuthenticated,
		Some(_) => ApiError::PermissionDenied,
	}
}

/// Route layer: resolves the caller, applies the endpoint-level check, and
/// leaves the [`Identity`] in the request extensions for the handler.
pub async fn enforce(
	State((state, policy)): State<(AppState, Policy)>,
	request: Request,
	next: Next,
) -> Result<Response, ApiError> {
	let (mut parts, body) = request.into_parts();
	let identity = Identity::from_request_parts(&mut parts, &state).await?;
	if let Err(err) = policy.check(&parts.method, identity.user()) {
		tracing::debug!(
			?policy,
			method = %parts.method,
			path = %parts.uri.path(),
			user = identity.user().map(|u| u.username.as_str()),
			"access denied"
		);
		return Err(err);
	}
	Ok(next.run(Request::from_parts(parts, body)).await)
}
