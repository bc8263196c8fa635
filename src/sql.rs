use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Executor;

use crate::config::Settings;

pub const TABLE_SCHEMA: &str = r#"

CREATE TABLE IF NOT EXISTS users (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	username TEXT NOT NULL UNIQUE,
	email TEXT NOT NULL UNIQUE,
	first_name TEXT NOT NULL DEFAULT '',
	last_name TEXT NOT NULL DEFAULT '',
	bio TEXT NOT NULL DEFAULT '',
	role TEXT NOT NULL DEFAULT 'user',
	is_superuser BOOL NOT NULL DEFAULT false,
	confirmation_code TEXT DEFAULT NULL,
	date_joined TEXT NOT NULL,
	CHECK(role IN ('user', 'moderator', 'admin'))
);

CREATE TABLE IF NOT EXISTS categories (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL,
	slug TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS genres (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL,
	slug TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS titles (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL,
	year INTEGER NOT NULL,
	description TEXT NOT NULL DEFAULT '',
	category_id INTEGER DEFAULT NULL,
	FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
);
CREATE INDEX IF NOT EXISTS titles_name ON titles(name);

CREATE TABLE IF NOT EXISTS title_genres (
	title_id INTEGER NOT NULL,
	genre_id INTEGER NOT NULL,
	UNIQUE(title_id, genre_id),
	FOREIGN KEY(title_id) REFERENCES titles(id) ON DELETE CASCADE,
	FOREIGN KEY(genre_id) REFERENCES genres(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS reviews (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	text TEXT NOT NULL,
	score INTEGER NOT NULL,
	pub_date TEXT NOT NULL,
	author_id INTEGER NOT NULL,
	title_id INTEGER NOT NULL,
	CHECK(score BETWEEN 1 AND 10),
	UNIQUE(author_id, title_id),
	FOREIGN KEY(author_id) REFERENCES users(id) ON DELETE CASCADE,
	FOREIGN KEY(title_id) REFERENCES titles(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS reviews_pub_date ON reviews(pub_date);

CREATE TABLE IF NOT EXISTS comments (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	text TEXT NOT NULL,
	pub_date TEXT NOT NULL,
	author_id INTEGER NOT NULL,
	review_id INTEGER NOT NULL,
	FOREIGN KEY(author_id) REFERENCES users(id) ON DELETE CASCADE,
	FOREIGN KEY(review_id) REFERENCES reviews(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS comments_pub_date ON comments(pub_date);

"#;

/// Opens the pool and applies [`TABLE_SCHEMA`]. Foreign keys are enforced
/// on every connection so that deletes cascade or null out as declared.
pub async fn open(settings: &Settings) -> Result<SqlitePool, sqlx::Error> {
	let options = SqliteConnectOptions::from_str(&settings.database_url)?
		.create_if_missing(true)
		.foreign_keys(true);

	// an in-memory database lives and dies with its single connection
	let in_memory = settings.database_url.contains(":memory:");
	let mut pool = SqlitePoolOptions::new()
		.max_connections(if in_memory { 1 } else { settings.max_connections })
		.acquire_timeout(Duration::from_secs(3));
	if in_memory {
		pool = pool.idle_timeout(None).max_lifetime(None);
	}
	let pool = pool.connect_with(options).await?;

	pool.execute(TABLE_SCHEMA).await?;
	tracing::debug!(url = %settings.database_url, "database schema ready");
	Ok(pool)
}
