//! Review aggregation service: titles, categories, genres, reviews,
//! comments and role-based accounts behind a JSON API.

pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod mail;
pub mod permissions;
pub mod repo;
pub mod routes;
pub mod sql;
pub mod types;
pub mod validate;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::TokenKeys;
use crate::config::Settings;
use crate::mail::{ConsoleMailer, FileMailer, Mailer};

#[derive(Clone)]
pub struct AppState {
	pub db: SqlitePool,
	pub settings: Arc<Settings>,
	pub keys: TokenKeys,
	pub mailer: Arc<dyn Mailer>,
}

impl AppState {
	pub fn new(db: SqlitePool, settings: Settings, mailer: Arc<dyn Mailer>) -> Self {
		let keys = TokenKeys::new(&settings.jwt_secret, settings.access_token_ttl);
		AppState {
			db,
			settings: Arc::new(settings),
			keys,
			mailer,
		}
	}

	/// Picks the mailer the settings ask for.
	pub fn mailer_for(settings: &Settings) -> Arc<dyn Mailer> {
		match &settings.mail_dir {
			Some(dir) => Arc::new(FileMailer::new(dir)),
			None => Arc::new(ConsoleMailer),
		}
	}
}

impl std::fmt::Debug for AppState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AppState")
			.field("database_url", &self.settings.database_url)
			.field("keys", &self.keys)
			.finish_non_exhaustive()
	}
}
