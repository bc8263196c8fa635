mod support;

use axum::{
	body::Body,
	http::{header, Request, StatusCode},
};
use serde_json::json;

use yamdb::types::Role;

#[tokio::test]
async fn signup_and_token_exchange() {
	let app = support::app().await;

	let res = app
		.post("/v1/auth/signup", None, json!({ "username": "alice", "email": "alice@example.com" }))
		.await;
	assert_eq!(res.status, StatusCode::OK, "{}", res.body);
	assert_eq!(res.body, json!({ "username": "alice", "email": "alice@example.com" }));

	let sent = app.mailer.sent();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].to, "alice@example.com");
	assert_eq!(sent[0].from, app.state.settings.from_email);
	let code = app.mailer.last_code_for("alice@example.com");

	let res = app
		.post("/v1/auth/token", None, json!({ "username": "alice", "confirmation_code": code }))
		.await;
	assert_eq!(res.status, StatusCode::OK);
	let token = res.body["token"].as_str().unwrap().to_string();
	let cookie = res.headers[header::SET_COOKIE].to_str().unwrap();
	assert!(cookie.starts_with("access_token="));
	assert!(cookie.contains("HttpOnly"));

	let res = app.get("/v1/users/me", Some(&token)).await;
	assert_eq!(res.status, StatusCode::OK);
	assert_eq!(res.body["username"], "alice");
	assert_eq!(res.body["role"], "user");
}

#[tokio::test]
async fn confirmation_code_is_single_use() {
	let app = support::app().await;
	app.post("/v1/auth/signup", None, json!({ "username": "alice", "email": "alice@example.com" }))
		.await;
	let code = app.mailer.last_code_for("alice@example.com");
	let body = json!({ "username": "alice", "confirmation_code": code });

	assert_eq!(app.post("/v1/auth/token", None, body.clone()).await.status, StatusCode::OK);

	let res = app.post("/v1/auth/token", None, body).await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["confirmation_code"].is_array());
}

#[tokio::test]
async fn token_rejects_wrong_code_and_unknown_user() {
	let app = support::app().await;
	app.post("/v1/auth/signup", None, json!({ "username": "alice", "email": "alice@example.com" }))
		.await;

	let res = app
		.post("/v1/auth/token", None, json!({ "username": "alice", "confirmation_code": "nope" }))
		.await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["confirmation_code"].is_array());

	let res = app
		.post("/v1/auth/token", None, json!({ "username": "ghost", "confirmation_code": "nope" }))
		.await;
	assert_eq!(res.status, StatusCode::NOT_FOUND);

	let res = app.post("/v1/auth/token", None, json!({ "username": "alice" })).await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert_eq!(res.body["confirmation_code"][0], "This field is required.");
}

#[tokio::test]
async fn signup_validation() {
	let app = support::app().await;

	let res = app.post("/v1/auth/signup", None, json!({ "username": "me", "email": "me@example.com" })).await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["username"].is_array());

	let res = app.post("/v1/auth/signup", None, json!({ "username": "bad name!", "email": "x@example.com" })).await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["username"].is_array());

	let res = app.post("/v1/auth/signup", None, json!({ "username": "alice", "email": "not-an-email" })).await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["email"].is_array());

	let res = app.post("/v1/auth/signup", None, json!({})).await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["username"].is_array());
	assert!(res.body["email"].is_array());

	assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
	let app = support::app().await;
	let request = Request::post("/v1/auth/signup")
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from("{ not json"))
		.unwrap();
	let res = app.send(request).await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["detail"].is_string());
}

#[tokio::test]
async fn signup_pair_must_match_one_account() {
	let app = support::app().await;
	app.post("/v1/auth/signup", None, json!({ "username": "alice", "email": "alice@example.com" }))
		.await;

	let res = app
		.post("/v1/auth/signup", None, json!({ "username": "alice2", "email": "alice@example.com" }))
		.await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["email"].is_array());

	let res = app
		.post("/v1/auth/signup", None, json!({ "username": "alice", "email": "other@example.com" }))
		.await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["username"].is_array());

	assert_eq!(app.mailer.sent().len(), 1);
}

#[tokio::test]
async fn repeated_signup_sends_a_fresh_code() {
	let app = support::app().await;
	let body = json!({ "username": "alice", "email": "alice@example.com" });

	app.post("/v1/auth/signup", None, body.clone()).await;
	let first = app.mailer.last_code_for("alice@example.com");
	let res = app.post("/v1/auth/signup", None, body).await;
	assert_eq!(res.status, StatusCode::OK);
	let second = app.mailer.last_code_for("alice@example.com");
	assert_ne!(first, second);

	let res = app
		.post("/v1/auth/token", None, json!({ "username": "alice", "confirmation_code": first }))
		.await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);

	let res = app
		.post("/v1/auth/token", None, json!({ "username": "alice", "confirmation_code": second }))
		.await;
	assert_eq!(res.status, StatusCode::OK);

	let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
		.fetch_one(&app.state.db)
		.await
		.unwrap();
	assert_eq!(count, 1);
}

#[tokio::test]
async fn signup_for_admin_created_account() {
	let app = support::app().await;
	let admin = app.admin().await;
	let res = app
		.post("/v1/users", Some(&admin), json!({ "username": "bob", "email": "bob@example.com" }))
		.await;
	assert_eq!(res.status, StatusCode::CREATED);

	let res = app
		.post("/v1/auth/signup", None, json!({ "username": "bob", "email": "bob@example.com" }))
		.await;
	assert_eq!(res.status, StatusCode::OK);
	assert_eq!(app.mailer.sent().len(), 1);
}

#[tokio::test]
async fn update_me_ignores_role() {
	let app = support::app().await;
	let (_, token) = app.user("alice", Role::User).await;

	let res = app
		.patch("/v1/users/me", Some(&token), json!({ "bio": "reader", "role": "admin", "first_name": "Alice" }))
		.await;
	assert_eq!(res.status, StatusCode::OK);
	assert_eq!(res.body["bio"], "reader");
	assert_eq!(res.body["first_name"], "Alice");
	assert_eq!(res.body["role"], "user");

	let res = app.post("/v1/genres", Some(&token), json!({ "name": "Drama", "slug": "drama" })).await;
	assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn me_requires_authentication() {
	let app = support::app().await;
	assert_eq!(app.get("/v1/users/me", None).await.status, StatusCode::UNAUTHORIZED);
	let res = app.patch("/v1/users/me", None, json!({ "bio": "x" })).await;
	assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_manages_users() {
	let app = support::app().await;
	let admin = app.admin().await;

	let res = app
		.post(
			"/v1/users",
			Some(&admin),
			json!({ "username": "bob", "email": "bob@example.com", "role": "moderator", "bio": "mod" }),
		)
		.await;
	assert_eq!(res.status, StatusCode::CREATED);
	assert_eq!(
		res.body,
		json!({
			"username": "bob",
			"email": "bob@example.com",
			"first_name": "",
			"last_name": "",
			"bio": "mod",
			"role": "moderator",
		})
	);

	let res = app
		.post("/v1/users", Some(&admin), json!({ "username": "bob", "email": "bob2@example.com" }))
		.await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["username"].is_array());

	let res = app
		.post("/v1/users", Some(&admin), json!({ "username": "carol", "email": "carol@example.com", "role": "god" }))
		.await;
	assert_eq!(res.status, StatusCode::BAD_REQUEST);
	assert!(res.body["role"].is_array());

	let res = app.get("/v1/users?search=bo", Some(&admin)).await;
	assert_eq!(res.status, StatusCode::OK);
	assert_eq!(res.body["count"], 1);
	assert_eq!(res.body["results"][0]["username"], "bob");

	let res = app.patch("/v1/users/bob", Some(&admin), json!({ "role": "admin" })).await;
	assert_eq!(res.status, StatusCode::OK);
	assert_eq!(res.body["role"], "admin");

	let res = app.get("/v1/users/bob", Some(&admin)).await;
	assert_eq!(res.body["role"], "admin");

	let res = app.delete("/v1/users/bob", Some(&admin)).await;
	assert_eq!(res.status, StatusCode::NO_CONTENT);

	let res = app.get("/v1/users/bob", Some(&admin)).await;
	assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_admin_is_admin_only() {
	let app = support::app().await;
	let (_, alice) = app.user("alice", Role::User).await;
	let (_, moderator) = app.user("mod", Role::Moderator).await;

	for token in [&alice, &moderator] {
		assert_eq!(app.get("/v1/users", Some(token)).await.status, StatusCode::FORBIDDEN);
		assert_eq!(app.get("/v1/users/alice", Some(token)).await.status, StatusCode::FORBIDDEN);
		assert_eq!(app.delete("/v1/users/alice", Some(token)).await.status, StatusCode::FORBIDDEN);
	}
	assert_eq!(app.get("/v1/users", None).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_user_removes_their_reviews() {
	let app = support::app().await;
	let admin = app.admin().await;
	let title = app.seed_title(&admin, "Dune", 1965).await;
	let (_, alice) = app.user("alice", Role::User).await;
	app.post(&format!("/v1/titles/{title}/reviews"), Some(&alice), json!({ "text": "ok", "score": 4 }))
		.await;

	app.delete("/v1/users/alice", Some(&admin)).await;

	let res = app.get(&format!("/v1/titles/{title}/reviews"), None).await;
	assert_eq!(res.body["count"], 0);

	// the token outlives the account but no longer resolves
	let res = app.get("/v1/users/me", Some(&alice)).await;
	assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_rejected_everywhere() {
	let app = support::app().await;
	let res = app.get("/v1/titles", Some("garbage")).await;
	assert_eq!(res.status, StatusCode::UNAUTHORIZED);
	assert!(res.body["detail"].is_string());

	let other = yamdb::auth::TokenKeys::new("another-secret", std::time::Duration::from_secs(60));
	let (user, _) = app.user("alice", Role::User).await;
	let forged = other.issue(&user).unwrap();
	let res = app.get("/v1/genres", Some(&forged)).await;
	assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cookie_authenticates_requests() {
	let app = support::app().await;
	let (_, token) = app.user("alice", Role::User).await;

	let request = Request::get("/v1/users/me")
		.header(header::COOKIE, format!("access_token={token}"))
		.body(Body::empty())
		.unwrap();
	let res = app.send(request).await;
	assert_eq!(res.status, StatusCode::OK);
	assert_eq!(res.body["username"], "alice");
}

#[tokio::test]
async fn superuser_command_validates_input() {
	let app = support::app().await;
	let db = &app.state.db;

	let err = yamdb::repo::users::create_superuser(db, "me", "not-an-email")
		.await
		.unwrap_err();
	match err {
		yamdb::error::ApiError::Validation(errors) => {
			assert!(errors.get("username").is_some());
			assert!(errors.get("email").is_some());
		}
		other => panic!("unexpected error {other:?}"),
	}

	let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
		.fetch_one(db)
		.await
		.unwrap();
	assert_eq!(count, 0);

	let root = yamdb::repo::users::create_superuser(db, "root", "root@example.com")
		.await
		.unwrap();
	assert!(root.is_superuser);
	assert_eq!(root.role, Role::Admin);
}
