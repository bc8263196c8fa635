use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::Window;
use crate::error::{is_unique_violation, ApiError, ApiResult, NON_FIELD};
use crate::forms::ReviewChanges;
use crate::types::{Cid, Comment, Review, Rid, Tid, Uid};

pub const DUPLICATE_REVIEW: &str = "You have already reviewed this title.";

const REVIEW_SELECT: &str = r#"
SELECT
	r.id, r.text, u.username AS author, r.score, r.pub_date, r.author_id, r.title_id
FROM
	reviews r
	JOIN users u ON u.id = r.author_id"#;

const COMMENT_SELECT: &str = r#"
SELECT
	c.id, c.text, u.username AS author, c.pub_date, c.author_id, c.review_id
FROM
	comments c
	JOIN users u ON u.id = c.author_id"#;

pub async fn title_exists(db: &SqlitePool, title: Tid) -> Result<bool, sqlx::Error> {
	sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = ?)")
		.bind(title)
		.fetch_one(db)
		.await
}

pub async fn list_reviews(
	db: &SqlitePool,
	title: Tid,
	window: Window,
) -> Result<(Vec<Review>, i64), sqlx::Error> {
	let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = ?")
		.bind(title)
		.fetch_one(db)
		.await?;

	let mut q = QueryBuilder::<Sqlite>::new(REVIEW_SELECT);
	q.push(" WHERE r.title_id = ").push_bind(title);
	q.push(" ORDER BY r.pub_date, r.id");
	window.push(&mut q);
	let reviews = q.build_query_as::<Review>().fetch_all(db).await?;

	Ok((reviews, total))
}

/// A review is only found through the title it belongs to.
pub async fn get_review(db: &SqlitePool, title: Tid, id: Rid) -> Result<Option<Review>, sqlx::Error> {
	let select = format!("{REVIEW_SELECT} WHERE r.id = ? AND r.title_id = ?");
	sqlx::query_as::<_, Review>(&select)
		.bind(id)
		.bind(title)
		.fetch_optional(db)
		.await
}

pub async fn has_review(db: &SqlitePool, author: Uid, title: Tid) -> Result<bool, sqlx::Error> {
	sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reviews WHERE author_id = ? AND title_id = ?)")
		.bind(author)
		.bind(title)
		.fetch_one(db)
		.await
}

/// Inserts a review. A second review by the same author for the same title
/// trips `UNIQUE(author_id, title_id)` and comes back as a validation error.
pub async fn insert_review(
	db: &SqlitePool,
	title: Tid,
	author: Uid,
	text: &str,
	score: i64,
) -> ApiResult<Review> {
	let id = sqlx::query(
		"INSERT INTO reviews (text, score, pub_date, author_id, title_id) VALUES (?, ?, ?, ?, ?)",
	)
	.bind(text)
	.bind(score)
	.bind(Utc::now())
	.bind(author)
	.bind(title)
	.execute(db)
	.await
	.map_err(|err| {
		if is_unique_violation(&err) {
			ApiError::field(NON_FIELD, DUPLICATE_REVIEW)
		} else {
			err.into()
		}
	})?
	.last_insert_rowid();

	tracing::info!(review = id, title, author, score, "review created");
	get_review(db, title, id).await?.ok_or(ApiError::NotFound)
}

pub async fn update_review(db: &SqlitePool, id: Rid, changes: ReviewChanges) -> Result<(), sqlx::Error> {
	sqlx::query("UPDATE reviews SET text = COALESCE(?, text), score = COALESCE(?, score) WHERE id = ?")
		.bind(changes.text)
		.bind(changes.score)
		.bind(id)
		.execute(db)
		.await?;
	Ok(())
}

pub async fn delete_review(db: &SqlitePool, id: Rid) -> Result<bool, sqlx::Error> {
	let res = sqlx::query("DELETE FROM reviews WHERE id = ?")
		.bind(id)
		.execute(db)
		.await?;
	Ok(res.rows_affected() > 0)
}

pub async fn list_comments(
	db: &SqlitePool,
	review: Rid,
	window: Window,
) -> Result<(Vec<Comment>, i64), sqlx::Error> {
	let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = ?")
		.bind(review)
		.fetch_one(db)
		.await?;

	let mut q = QueryBuilder::<Sqlite>::new(COMMENT_SELECT);
	q.push(" WHERE c.review_id = ").push_bind(review);
	q.push(" ORDER BY c.pub_date, c.id");
	window.push(&mut q);
	let comments = q.build_query_as::<Comment>().fetch_all(db).await?;

	Ok((comments, total))
}

pub async fn get_comment(db: &SqlitePool, review: Rid, id: Cid) -> Result<Option<Comment>, sqlx::Error> {
	let select = format!("{COMMENT_SELECT} WHERE c.id = ? AND c.review_id = ?");
	sqlx::query_as::<_, Comment>(&select)
		.bind(id)
		.bind(review)
		.fetch_optional(db)
		.await
}

pub async fn insert_comment(db: &SqlitePool, review: Rid, author: Uid, text: &str) -> ApiResult<Comment> {
	let id = sqlx::query("INSERT INTO comments (text, pub_date, author_id, review_id) VALUES (?, ?, ?, ?)")
		.bind(text)
		.bind(Utc::now())
		.bind(author)
		.bind(review)
		.execute(db)
		.await?
		.last_insert_rowid();

	tracing::debug!(comment = id, review, author, "comment created");
	get_comment(db, review, id).await?.ok_or(ApiError::NotFound)
}

pub async fn update_comment(db: &SqlitePool, id: Cid, text: &str) -> Result<(), sqlx::Error> {
	sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
		.bind(text)
		.bind(id)
		.execute(db)
		.await?;
	Ok(())
}

pub async fn delete_comment(db: &SqlitePool, id: Cid) -> Result<bool, sqlx::Error> {
	let res = sqlx::query("DELETE FROM comments WHERE id = ?")
		.bind(id)
		.execute(db)
		.await?;
	Ok(res.rows_affected() > 0)
}
