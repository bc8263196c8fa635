use axum::{
	middleware,
	routing::{delete, get, post},
	Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, catalog, feedback, users};
use crate::permissions::{enforce, Policy};
use crate::AppState;

pub const API_PREFIX: &str = "/v1";

/// Full application router: every endpoint under [`API_PREFIX`], each
/// group behind its access policy.
pub fn router(state: AppState) -> Router {
	let guard = |policy: Policy| middleware::from_fn_with_state((state.clone(), policy), enforce);

	let catalog = Router::new()
		.route("/categories", get(catalog::list_categories).post(catalog::create_category))
		.route("/categories/:slug", delete(catalog::delete_category))
		.route("/genres", get(catalog::list_genres).post(catalog::create_genre))
		.route("/genres/:slug", delete(catalog::delete_genre))
		.route("/titles", get(catalog::list_titles).post(catalog::create_title))
		.route(
			"/titles/:title_id",
			get(catalog::get_title)
				.patch(catalog::update_title)
				.delete(catalog::delete_title),
		)
		.route_layer(guard(Policy::AdminOrReadOnly));

	let feedback = Router::new()
		.route(
			"/titles/:title_id/reviews",
			get(feedback::list_reviews).post(feedback::create_review),
		)
		.route(
			"/titles/:title_id/reviews/:review_id",
			get(feedback::get_review)
				.patch(feedback::update_review)
				.delete(feedback::delete_review),
		)
		.route(
			"/titles/:title_id/reviews/:review_id/comments",
			get(feedback::list_comments).post(feedback::create_comment),
		)
		.route(
			"/titles/:title_id/reviews/:review_id/comments/:comment_id",
			get(feedback::get_comment)
				.patch(feedback::update_comment)
				.delete(feedback::delete_comment),
		)
		.route_layer(guard(Policy::AuthorOrStaffOrReadOnly));

	let account = Router::new()
		.route("/users/me", get(users::me).patch(users::update_me))
		.route_layer(guard(Policy::SelfOnly));

	let admin = Router::new()
		.route("/users", get(users::list_users).post(users::create_user))
		.route(
			"/users/:username",
			get(users::get_user)
				.patch(users::update_user)
				.delete(users::delete_user),
		)
		.route_layer(guard(Policy::AdminOnly));

	let public = Router::new()
		.route("/auth/signup", post(auth::signup))
		.route("/auth/token", post(auth::token));

	let v1 = Router::new()
		.merge(catalog)
		.merge(feedback)
		.merge(account)
		.merge(admin)
		.merge(public);

	Router::new()
		.nest(API_PREFIX, v1)
		.layer(CookieManagerLayer::new())
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
