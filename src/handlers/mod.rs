pub mod auth;
pub mod catalog;
pub mod feedback;
pub mod users;

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::{ApiError, ApiResult};
use crate::repo::Window;
use crate::types::{Page, PageParams};
use crate::AppState;

/// `axum::Json` with rejections rendered as [`ApiError`].
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters; a malformed id is a 404, as for an unknown one.
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Resolves the requested page. Page 0 and non-numbers do not exist.
fn window(state: &AppState, params: PageParams) -> ApiResult<(u32, Window)> {
	let page = params.number().ok_or(ApiError::NotFound)?;
	Ok((page, Window::page(page, state.settings.page_size)))
}

/// Wraps one page of results. Pages past the end are 404, except page 1
/// which is always valid, even when empty.
fn paginate<T>(state: &AppState, results: Vec<T>, count: i64, page: u32) -> ApiResult<Page<T>> {
	if page > 1 && results.is_empty() {
		return Err(ApiError::NotFound);
	}
	Ok(Page::new(results, count, page, state.settings.page_size))
}
