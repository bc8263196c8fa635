use axum::{
	extract::State,
	http::{Method, StatusCode},
	Json,
};

use super::{paginate, window, ApiJson, ApiPath, ApiQuery};
use crate::auth::Identity;
use crate::error::{ApiError, ApiResult, NON_FIELD};
use crate::forms::{CommentForm, ReviewForm};
use crate::permissions::Policy;
use crate::repo::feedback::{self, DUPLICATE_REVIEW};
use crate::types::{Authored, Cid, Comment, Page, PageParams, Review, Rid, Tid};
use crate::AppState;

const POLICY: Policy = Policy::AuthorOrStaffOrReadOnly;

fn check_owner(method: &Method, identity: &Identity, object: &impl Authored) -> ApiResult<()> {
	POLICY.check_object(method, identity.user(), object.author_id())
}

async fn require_title(state: &AppState, title: Tid) -> ApiResult<()> {
	if feedback::title_exists(&state.db, title).await? {
		Ok(())
	} else {
		Err(ApiError::NotFound)
	}
}

async fn require_review(state: &AppState, title: Tid, review: Rid) -> ApiResult<Review> {
	feedback::get_review(&state.db, title, review)
		.await?
		.ok_or(ApiError::NotFound)
}

async fn require_comment(state: &AppState, title: Tid, review: Rid, comment: Cid) -> ApiResult<Comment> {
	require_review(state, title, review).await?;
	feedback::get_comment(&state.db, review, comment)
		.await?
		.ok_or(ApiError::NotFound)
}

pub async fn list_reviews(
	State(state): State<AppState>,
	ApiPath(title): ApiPath<Tid>,
	ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Review>>> {
	require_title(&state, title).await?;
	let (page, win) = window(&state, page)?;
	let (reviews, count) = feedback::list_reviews(&state.db, title, win).await?;
	Ok(Json(paginate(&state, reviews, count, page)?))
}

pub async fn create_review(
	State(state): State<AppState>,
	identity: Identity,
	ApiPath(title): ApiPath<Tid>,
	ApiJson(form): ApiJson<ReviewForm>,
) -> ApiResult<(StatusCode, Json<Review>)> {
	let author = identity.require()?;
	require_title(&state, title).await?;
	let (text, score) = form.validate_create()?;

	if feedback::has_review(&state.db, author.id, title).await? {
		return Err(ApiError::field(NON_FIELD, DUPLICATE_REVIEW));
	}
	let review = feedback::insert_review(&state.db, title, author.id, &text, score).await?;
	Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review(
	State(state): State<AppState>,
	ApiPath((title, id)): ApiPath<(Tid, Rid)>,
) -> ApiResult<Json<Review>> {
	Ok(Json(require_review(&state, title, id).await?))
}

pub async fn update_review(
	State(state): State<AppState>,
	method: Method,
	identity: Identity,
	ApiPath((title, id)): ApiPath<(Tid, Rid)>,
	ApiJson(form): ApiJson<ReviewForm>,
) -> ApiResult<Json<Review>> {
	let review = require_review(&state, title, id).await?;
	check_owner(&method, &identity, &review)?;
	let changes = form.validate_update()?;
	feedback::update_review(&state.db, review.id, changes).await?;
	Ok(Json(require_review(&state, title, id).await?))
}

pub async fn delete_review(
	State(state): State<AppState>,
	method: Method,
	identity: Identity,
	ApiPath((title, id)): ApiPath<(Tid, Rid)>,
) -> ApiResult<StatusCode> {
	let review = require_review(&state, title, id).await?;
	check_owner(&method, &identity, &review)?;
	feedback::delete_review(&state.db, review.id).await?;
	tracing::info!(review = id, title, "review deleted");
	Ok(StatusCode::NO_CONTENT)
}

pub async fn list_comments(
	State(state): State<AppState>,
	ApiPath((title, review)): ApiPath<(Tid, Rid)>,
	ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Comment>>> {
	require_review(&state, title, review).await?;
	let (page, win) = window(&state, page)?;
	let (comments, count) = feedback::list_comments(&state.db, review, win).await?;
	Ok(Json(paginate(&state, comments, count, page)?))
}

pub async fn create_comment(
	State(state): State<AppState>,
	identity: Identity,
	ApiPath((title, review)): ApiPath<(Tid, Rid)>,
	ApiJson(form): ApiJson<CommentForm>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
	let author = identity.require()?;
	require_review(&state, title, review).await?;
	let text = form.validate()?;
	let comment = feedback::insert_comment(&state.db, review, author.id, &text).await?;
	Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
	State(state): State<AppState>,
	ApiPath((title, review, id)): ApiPath<(Tid, Rid, Cid)>,
) -> ApiResult<Json<Comment>> {
	Ok(Json(require_comment(&state, title, review, id).await?))
}

pub async fn update_comment(
	State(state): State<AppState>,
	method: Method,
	identity: Identity,
	ApiPath((title, review, id)): ApiPath<(Tid, Rid, Cid)>,
	ApiJson(form): ApiJson<CommentForm>,
) -> ApiResult<Json<Comment>> {
	let comment = require_comment(&state, title, review, id).await?;
	check_owner(&method, &identity, &comment)?;
	let text = form.validate()?;
	feedback::update_comment(&state.db, comment.id, &text).await?;
	Ok(Json(require_comment(&state, title, review, id).await?))
}

pub async fn delete_comment(
	State(state): State<AppState>,
	method: Method,
	identity: Identity,
	ApiPath((title, review, id)): ApiPath<(Tid, Rid, Cid)>,
) -> ApiResult<StatusCode> {
	let comment = require_comment(&state, title, review, id).await?;
	check_owner(&method, &identity, &comment)?;
	feedback::delete_comment(&state.db, comment.id).await?;
	Ok(StatusCode::NO_CONTENT)
}
