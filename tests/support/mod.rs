#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
	body::Body,
	http::{header, Method, Request, StatusCode},
	Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use yamdb::config::Settings;
use yamdb::forms::UserChanges;
use yamdb::mail::{Email, MailError, Mailer};
use yamdb::repo::users;
use yamdb::types::{Role, User};
use yamdb::{routes, sql, AppState};

/// Keeps every message in memory so tests can read confirmation codes.
#[derive(Debug, Default)]
pub struct MemoryMailer {
	sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
	pub fn sent(&self) -> Vec<Email> {
		self.sent.lock().unwrap().clone()
	}

	/// The code from the most recent message to `to`.
	pub fn last_code_for(&self, to: &str) -> String {
		let sent = self.sent();
		let email = sent
			.iter()
			.rev()
			.find(|email| email.to == to)
			.unwrap_or_else(|| panic!("no mail sent to {to}"));
		email
			.body
			.rsplit(' ')
			.next()
			.expect("code at the end of the body")
			.to_string()
	}
}

#[axum::async_trait]
impl Mailer for MemoryMailer {
	async fn send(&self, email: &Email) -> Result<(), MailError> {
		self.sent.lock().unwrap().push(email.clone());
		Ok(())
	}
}

pub struct TestApp {
	pub state: AppState,
	pub router: Router,
	pub mailer: Arc<MemoryMailer>,
}

pub async fn app() -> TestApp {
	app_with(Settings::in_memory("test-secret")).await
}

pub async fn app_with(settings: Settings) -> TestApp {
	let pool = sql::open(&settings).await.expect("open in-memory database");
	let mailer = Arc::new(MemoryMailer::default());
	let state = AppState::new(pool, settings, mailer.clone());
	let router = routes::router(state.clone());
	TestApp { state, router, mailer }
}

pub struct Reply {
	pub status: StatusCode,
	pub headers: axum::http::HeaderMap,
	pub body: Value,
}

impl TestApp {
	pub async fn send(&self, request: Request<Body>) -> Reply {
		let response = self.router.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let headers = response.headers().clone();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let body = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap_or_else(|_| {
				Value::String(String::from_utf8_lossy(&bytes).into_owned())
			})
		};
		Reply { status, headers, body }
	}

	pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
		let mut builder = Request::builder().method(method).uri(uri);
		if let Some(token) = token {
			builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
		}
		let body = match body {
			Some(value) => {
				builder = builder.header(header::CONTENT_TYPE, "application/json");
				Body::from(value.to_string())
			}
			None => Body::empty(),
		};
		self.send(builder.body(body).unwrap()).await
	}

	pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
		self.call(Method::GET, uri, token, None).await
	}

	pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
		self.call(Method::POST, uri, token, Some(body)).await
	}

	pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
		self.call(Method::PATCH, uri, token, Some(body)).await
	}

	pub async fn delete(&self, uri: &str, token: Option<&str>) -> Reply {
		self.call(Method::DELETE, uri, token, None).await
	}

	/// Creates an account directly and returns it with a valid access token.
	pub async fn user(&self, username: &str, role: Role) -> (User, String) {
		let user = users::create(
			&self.state.db,
			UserChanges {
				username: Some(username.to_string()),
				email: Some(format!("{username}@example.com")),
				role: Some(role),
				..UserChanges::default()
			},
		)
		.await
		.expect("create user");
		let token = self.state.keys.issue(&user).expect("issue token");
		(user, token)
	}

	pub async fn admin(&self) -> String {
		self.user("admin", Role::Admin).await.1
	}

	/// Seeds a category, a genre and a title; returns the title id.
	pub async fn seed_title(&self, admin: &str, name: &str, year: i32) -> i64 {
		let slug = name.to_lowercase().replace(' ', "-");
		for (uri, kind) in [("/v1/categories", "cat"), ("/v1/genres", "gen")] {
			let res = self
				.post(uri, Some(admin), json!({ "name": format!("{name} {kind}"), "slug": format!("{slug}-{kind}") }))
				.await;
			assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
		}
		let res = self
			.post(
				"/v1/titles",
				Some(admin),
				json!({
					"name": name,
					"year": year,
					"genre": [format!("{slug}-gen")],
					"category": format!("{slug}-cat"),
				}),
			)
			.await;
		assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
		res.body["id"].as_i64().unwrap()
	}
}
