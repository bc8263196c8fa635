use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{contains_pattern, Window};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::forms::UserChanges;
use crate::types::{Role, Uid, User};
use crate::validate;

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "A user with that email already exists.";

const USER_SELECT: &str = r#"
SELECT
	id, username, email, first_name, last_name, bio, role, is_superuser,
	confirmation_code, date_joined
FROM users"#;

/// Maps a UNIQUE violation on `users` to the field it covers.
fn unique_field(err: &sqlx::Error) -> Option<&'static str> {
	let db_err = err.as_database_error()?;
	if !db_err.is_unique_violation() {
		return None;
	}
	if db_err.message().contains("users.email") {
		Some("email")
	} else {
		Some("username")
	}
}

fn map_unique(err: sqlx::Error) -> ApiError {
	match unique_field(&err) {
		Some("email") => ApiError::field("email", EMAIL_TAKEN),
		Some(field) => ApiError::field(field, USERNAME_TAKEN),
		None => err.into(),
	}
}

pub async fn by_id(db: &SqlitePool, id: Uid) -> Result<Option<User>, sqlx::Error> {
	let select = format!("{USER_SELECT} WHERE id = ?");
	sqlx::query_as::<_, User>(&select).bind(id).fetch_optional(db).await
}

pub async fn by_username(db: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
	let select = format!("{USER_SELECT} WHERE username = ?");
	sqlx::query_as::<_, User>(&select).bind(username).fetch_optional(db).await
}

pub async fn by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
	let select = format!("{USER_SELECT} WHERE email = ?");
	sqlx::query_as::<_, User>(&select).bind(email).fetch_optional(db).await
}

pub async fn list(
	db: &SqlitePool,
	search: Option<&str>,
	window: Window,
) -> Result<(Vec<User>, i64), sqlx::Error> {
	let search = search.filter(|term| !term.is_empty()).map(contains_pattern);

	let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
	let mut q = QueryBuilder::<Sqlite>::new(USER_SELECT);
	if let Some(pattern) = &search {
		count.push(" WHERE username LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'");
		q.push(" WHERE username LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'");
	}
	let total: i64 = count.build_query_scalar().fetch_one(db).await?;

	q.push(" ORDER BY username");
	window.push(&mut q);
	let users = q.build_query_as::<User>().fetch_all(db).await?;

	Ok((users, total))
}

/// Friendly pre-check for username/email collisions with accounts other
/// than `exclude`. The UNIQUE constraints still back it up.
pub async fn check_unique(
	db: &SqlitePool,
	username: Option<&str>,
	email: Option<&str>,
	exclude: Option<Uid>,
) -> ApiResult<()> {
	let mut errors = FieldErrors::new();
	let is_other = |user: &Option<User>| user.as_ref().is_some_and(|user| Some(user.id) != exclude);

	if let Some(username) = username {
		if is_other(&by_username(db, username).await?) {
			errors.add("username", USERNAME_TAKEN);
		}
	}
	if let Some(email) = email {
		if is_other(&by_email(db, email).await?) {
			errors.add("email", EMAIL_TAKEN);
		}
	}
	errors.into_result()
}

pub async fn create(db: &SqlitePool, changes: UserChanges) -> ApiResult<User> {
	check_unique(db, changes.username.as_deref(), changes.email.as_deref(), None).await?;

	let id = sqlx::query(
		"INSERT INTO users (username, email, first_name, last_name, bio, role, date_joined) \
		VALUES (?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(changes.username.unwrap_or_default())
	.bind(changes.email.unwrap_or_default())
	.bind(changes.first_name.unwrap_or_default())
	.bind(changes.last_name.unwrap_or_default())
	.bind(changes.bio.unwrap_or_default())
	.bind(changes.role.unwrap_or_default())
	.bind(Utc::now())
	.execute(db)
	.await
	.map_err(map_unique)?
	.last_insert_rowid();

	tracing::info!(user = id, "account created");
	by_id(db, id).await?.ok_or(ApiError::NotFound)
}

pub async fn update(db: &SqlitePool, id: Uid, changes: UserChanges) -> ApiResult<User> {
	check_unique(db, changes.username.as_deref(), changes.email.as_deref(), Some(id)).await?;

	sqlx::query(
		"UPDATE users SET \
			username = COALESCE(?, username), \
			email = COALESCE(?, email), \
			first_name = COALESCE(?, first_name), \
			last_name = COALESCE(?, last_name), \
			bio = COALESCE(?, bio), \
			role = COALESCE(?, role) \
		WHERE id = ?",
	)
	.bind(changes.username)
	.bind(changes.email)
	.bind(changes.first_name)
	.bind(changes.last_name)
	.bind(changes.bio)
	.bind(changes.role)
	.bind(id)
	.execute(db)
	.await
	.map_err(map_unique)?;

	by_id(db, id).await?.ok_or(ApiError::NotFound)
}

pub async fn delete(db: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
	let res = sqlx::query("DELETE FROM users WHERE username = ?")
		.bind(username)
		.execute(db)
		.await?;
	Ok(res.rows_affected() > 0)
}

/// Signup's get-or-create. The caller has already checked that `username`
/// and `email` are either both free or both owned by the same account.
pub async fn get_or_create(db: &SqlitePool, username: &str, email: &str) -> ApiResult<User> {
	if let Some(user) = by_username(db, username).await? {
		return Ok(user);
	}
	create(
		db,
		UserChanges {
			username: Some(username.to_string()),
			email: Some(email.to_string()),
			..UserChanges::default()
		},
	)
	.await
}

pub async fn set_confirmation_code(db: &SqlitePool, id: Uid, code: &str) -> Result<(), sqlx::Error> {
	sqlx::query("UPDATE users SET confirmation_code = ? WHERE id = ?")
		.bind(code)
		.bind(id)
		.execute(db)
		.await?;
	Ok(())
}

/// Clears the stored code if it equals `code`. Returns whether it did, so a
/// code can be exchanged at most once.
pub async fn consume_confirmation_code(db: &SqlitePool, id: Uid, code: &str) -> Result<bool, sqlx::Error> {
	let res = sqlx::query(
		"UPDATE users SET confirmation_code = NULL WHERE id = ? AND confirmation_code = ?",
	)
	.bind(id)
	.bind(code)
	.execute(db)
	.await?;
	Ok(res.rows_affected() == 1)
}

/// Creates an admin superuser, or promotes the account that already owns
/// both `username` and `email`.
pub async fn create_superuser(db: &SqlitePool, username: &str, email: &str) -> ApiResult<User> {
	let mut errors = FieldErrors::new();
	errors.check("username", validate::username(username));
	errors.check("email", validate::email(email));
	errors.into_result()?;

	let user = match by_username(db, username).await? {
		Some(user) if user.email == email => user,
		Some(_) => return Err(ApiError::field("email", "Email does not match the existing account.")),
		None => {
			create(
				db,
				UserChanges {
					username: Some(username.to_string()),
					email: Some(email.to_string()),
					..UserChanges::default()
				},
			)
			.await?
		}
	};

	sqlx::query("UPDATE users SET role = ?, is_superuser = true WHERE id = ?")
		.bind(Role::Admin)
		.bind(user.id)
		.execute(db)
		.await?;
	tracing::info!(user = user.id, username, "superuser ready");
	by_id(db, user.id).await?.ok_or(ApiError::NotFound)
}
