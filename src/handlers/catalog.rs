use axum::{extract::State, http::StatusCode, Json};
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

use super::{paginate, window, ApiJson, ApiPath, ApiQuery};
use crate::error::{ApiError, ApiResult};
use crate::forms::{SlugForm, TitleForm};
use crate::repo::catalog::{self, SearchParams, Slugged, TitleFilter};
use crate::types::{Category, Genre, Page, PageParams, Tid, Title};
use crate::AppState;

async fn list_slugged<T>(
	state: &AppState,
	kind: Slugged,
	search: SearchParams,
	page: PageParams,
) -> ApiResult<Json<Page<T>>>
where
	T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
	let (page, win) = window(state, page)?;
	let (rows, count) = catalog::list_slugged(&state.db, kind, search.search.as_deref(), win).await?;
	Ok(Json(paginate(state, rows, count, page)?))
}

async fn create_slugged<T>(state: &AppState, kind: Slugged, form: SlugForm) -> ApiResult<(StatusCode, Json<T>)>
where
	T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
	let new = form.validate()?;
	let row = catalog::create_slugged(&state.db, kind, new).await?;
	Ok((StatusCode::CREATED, Json(row)))
}

async fn delete_slugged(state: &AppState, kind: Slugged, slug: &str) -> ApiResult<StatusCode> {
	if !catalog::delete_slugged(&state.db, kind, slug).await? {
		return Err(ApiError::NotFound);
	}
	tracing::info!(?kind, slug, "deleted");
	Ok(StatusCode::NO_CONTENT)
}

pub async fn list_categories(
	State(state): State<AppState>,
	ApiQuery(search): ApiQuery<SearchParams>,
	ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Category>>> {
	list_slugged(&state, Slugged::Category, search, page).await
}

pub async fn create_category(
	State(state): State<AppState>,
	ApiJson(form): ApiJson<SlugForm>,
) -> ApiResult<(StatusCode, Json<Category>)> {
	create_slugged(&state, Slugged::Category, form).await
}

pub async fn delete_category(
	State(state): State<AppState>,
	ApiPath(slug): ApiPath<String>,
) -> ApiResult<StatusCode> {
	delete_slugged(&state, Slugged::Category, &slug).await
}

pub async fn list_genres(
	State(state): State<AppState>,
	ApiQuery(search): ApiQuery<SearchParams>,
	ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Genre>>> {
	list_slugged(&state, Slugged::Genre, search, page).await
}

pub async fn create_genre(
	State(state): State<AppState>,
	ApiJson(form): ApiJson<SlugForm>,
) -> ApiResult<(StatusCode, Json<Genre>)> {
	create_slugged(&state, Slugged::Genre, form).await
}

pub async fn delete_genre(
	State(state): State<AppState>,
	ApiPath(slug): ApiPath<String>,
) -> ApiResult<StatusCode> {
	delete_slugged(&state, Slugged::Genre, &slug).await
}

pub async fn list_titles(
	State(state): State<AppState>,
	ApiQuery(filter): ApiQuery<TitleFilter>,
	ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Title>>> {
	let (page, win) = window(&state, page)?;
	let (titles, count) = catalog::list_titles(&state.db, &filter, win).await?;
	Ok(Json(paginate(&state, titles, count, page)?))
}

pub async fn get_title(
	State(state): State<AppState>,
	ApiPath(id): ApiPath<Tid>,
) -> ApiResult<Json<Title>> {
	let title = catalog::get_title(&state.db, id).await?.ok_or(ApiError::NotFound)?;
	Ok(Json(title))
}

pub async fn create_title(
	State(state): State<AppState>,
	ApiJson(form): ApiJson<TitleForm>,
) -> ApiResult<(StatusCode, Json<Title>)> {
	let changes = form.validate_create()?;
	let id = catalog::create_title(&state.db, changes).await?;
	let title = catalog::get_title(&state.db, id).await?.ok_or(ApiError::NotFound)?;
	Ok((StatusCode::CREATED, Json(title)))
}

pub async fn update_title(
	State(state): State<AppState>,
	ApiPath(id): ApiPath<Tid>,
	ApiJson(form): ApiJson<TitleForm>,
) -> ApiResult<Json<Title>> {
	if catalog::get_title(&state.db, id).await?.is_none() {
		return Err(ApiError::NotFound);
	}
	let changes = form.validate_update()?;
	catalog::update_title(&state.db, id, changes).await?;
	let title = catalog::get_title(&state.db, id).await?.ok_or(ApiError::NotFound)?;
	Ok(Json(title))
}

pub async fn delete_title(
	State(state): State<AppState>,
	ApiPath(id): ApiPath<Tid>,
) -> ApiResult<StatusCode> {
	if !catalog::delete_title(&state.db, id).await? {
		return Err(ApiError::NotFound);
	}
	tracing::info!(title = id, "title deleted");
	Ok(StatusCode::NO_CONTENT)
}
