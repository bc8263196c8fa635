use axum::{
	extract::State,
	http::{Method, StatusCode},
	Json,
};

use super::{paginate, window, ApiJson, ApiPath, ApiQuery};
use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::forms::UserForm;
use crate::permissions::Policy;
use crate::repo::catalog::SearchParams;
use crate::repo::users;
use crate::types::{Page, PageParams, User, UserView};
use crate::AppState;

async fn require_user(state: &AppState, username: &str) -> ApiResult<User> {
	users::by_username(&state.db, username)
		.await?
		.ok_or(ApiError::NotFound)
}

pub async fn list_users(
	State(state): State<AppState>,
	ApiQuery(search): ApiQuery<SearchParams>,
	ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<UserView>>> {
	let (page, win) = window(&state, page)?;
	let (rows, count) = users::list(&state.db, search.search.as_deref(), win).await?;
	let views = rows.iter().map(UserView::from).collect();
	Ok(Json(paginate(&state, views, count, page)?))
}

pub async fn create_user(
	State(state): State<AppState>,
	ApiJson(form): ApiJson<UserForm>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
	let changes = form.validate_create()?;
	let user = users::create(&state.db, changes).await?;
	Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

pub async fn get_user(
	State(state): State<AppState>,
	ApiPath(username): ApiPath<String>,
) -> ApiResult<Json<UserView>> {
	let user = require_user(&state, &username).await?;
	Ok(Json(UserView::from(&user)))
}

pub async fn update_user(
	State(state): State<AppState>,
	ApiPath(username): ApiPath<String>,
	ApiJson(form): ApiJson<UserForm>,
) -> ApiResult<Json<UserView>> {
	let user = require_user(&state, &username).await?;
	let changes = form.validate_update()?;
	let user = users::update(&state.db, user.id, changes).await?;
	Ok(Json(UserView::from(&user)))
}

pub async fn delete_user(
	State(state): State<AppState>,
	ApiPath(username): ApiPath<String>,
) -> ApiResult<StatusCode> {
	if !users::delete(&state.db, &username).await? {
		return Err(ApiError::NotFound);
	}
	tracing::info!(%username, "account deleted");
	Ok(StatusCode::NO_CONTENT)
}

pub async fn me(method: Method, identity: Identity) -> ApiResult<Json<UserView>> {
	let user = identity.require()?;
	Policy::SelfOnly.check_object(&method, Some(user), user.id)?;
	Ok(Json(UserView::from(user)))
}

pub async fn update_me(
	State(state): State<AppState>,
	method: Method,
	identity: Identity,
	ApiJson(form): ApiJson<UserForm>,
) -> ApiResult<Json<UserView>> {
	let user = identity.require()?;
	Policy::SelfOnly.check_object(&method, Some(user), user.id)?;
	let changes = form.validate_self_update()?;
	let user = users::update(&state.db, user.id, changes).await?;
	Ok(Json(UserView::from(&user)))
}
