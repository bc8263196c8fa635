use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::{contains_pattern, Conditions, Window};
use crate::error::{is_unique_violation, ApiError, ApiResult, FieldErrors};
use crate::forms::{NewSlugged, TitleChanges};
use crate::types::{Genre, Tid, Title, TitleGenreQuery, TitleQuery};

/// Categories and genres are stored alike and differ only by table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slugged {
	Category,
	Genre,
}

impl Slugged {
	fn table(self) -> &'static str {
		match self {
			Slugged::Category => "categories",
			Slugged::Genre => "genres",
		}
	}

	fn noun(self) -> &'static str {
		match self {
			Slugged::Category => "category",
			Slugged::Genre => "genre",
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
	pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
	pub name: Option<String>,
	pub category: Option<String>,
	pub genre: Option<String>,
	#[serde(default, deserialize_with = "blank_as_none")]
	pub year: Option<i32>,
}

/// `?year=` means no year filter, as with the text filters.
fn blank_as_none<'de, D>(de: D) -> Result<Option<i32>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<String>::deserialize(de)? {
		Some(raw) if !raw.trim().is_empty() => raw
			.trim()
			.parse::<i32>()
			.map(Some)
			.map_err(serde::de::Error::custom),
		_ => Ok(None),
	}
}

fn push_name_search<'a>(q: &mut QueryBuilder<'a, Sqlite>, column: &str, search: Option<&str>) {
	if let Some(term) = search.filter(|term| !term.is_empty()) {
		q.push(format!(" WHERE {column} LIKE "))
			.push_bind(contains_pattern(term))
			.push(" ESCAPE '\\'");
	}
}

pub async fn list_slugged<T>(
	db: &SqlitePool,
	kind: Slugged,
	search: Option<&str>,
	window: Window,
) -> Result<(Vec<T>, i64), sqlx::Error>
where
	T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
	let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", kind.table()));
	push_name_search(&mut count, "name", search);
	let total: i64 = count.build_query_scalar().fetch_one(db).await?;

	let mut q = QueryBuilder::new(format!("SELECT id, name, slug FROM {}", kind.table()));
	push_name_search(&mut q, "name", search);
	q.push(" ORDER BY name, id");
	window.push(&mut q);
	let rows = q.build_query_as::<T>().fetch_all(db).await?;

	Ok((rows, total))
}

pub async fn create_slugged<T>(db: &SqlitePool, kind: Slugged, new: NewSlugged) -> ApiResult<T>
where
	T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
	let insert = format!("INSERT INTO {} (name, slug) VALUES (?, ?)", kind.table());
	let id = sqlx::query(&insert)
		.bind(&new.name)
		.bind(&new.slug)
		.execute(db)
		.await
		.map_err(|err| {
			if is_unique_violation(&err) {
				ApiError::field("slug", format!("{} with this slug already exists.", kind.noun()))
			} else {
				err.into()
			}
		})?
		.last_insert_rowid();

	let select = format!("SELECT id, name, slug FROM {} WHERE id = ?", kind.table());
	Ok(sqlx::query_as::<_, T>(&select).bind(id).fetch_one(db).await?)
}

/// Returns false when no row had that slug.
pub async fn delete_slugged(db: &SqlitePool, kind: Slugged, slug: &str) -> Result<bool, sqlx::Error> {
	let delete = format!("DELETE FROM {} WHERE slug = ?", kind.table());
	let res = sqlx::query(&delete).bind(slug).execute(db).await?;
	Ok(res.rows_affected() > 0)
}

const TITLE_SELECT: &str = r#"
SELECT
	t.id, t.name, t.year, t.description,
	c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
	(SELECT CAST(AVG(r.score) AS INTEGER) FROM reviews r WHERE r.title_id = t.id) AS rating
FROM
	titles t
	LEFT JOIN categories c ON c.id = t.category_id"#;

const TITLE_COUNT: &str = r#"
SELECT COUNT(*)
FROM
	titles t
	LEFT JOIN categories c ON c.id = t.category_id"#;

fn push_title_filters<'a>(q: &mut QueryBuilder<'a, Sqlite>, filter: &TitleFilter) {
	let mut cond = Conditions::new();
	if let Some(name) = filter.name.as_deref().filter(|name| !name.is_empty()) {
		cond.next(q)
			.push("t.name LIKE ")
			.push_bind(contains_pattern(name))
			.push(" ESCAPE '\\'");
	}
	if let Some(category) = filter.category.as_ref().filter(|slug| !slug.is_empty()) {
		cond.next(q).push("c.slug = ").push_bind(category.clone());
	}
	if let Some(genre) = filter.genre.as_ref().filter(|slug| !slug.is_empty()) {
		cond.next(q)
			.push(
				"EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
				WHERE tg.title_id = t.id AND g.slug = ",
			)
			.push_bind(genre.clone())
			.push(")");
	}
	if let Some(year) = filter.year {
		cond.next(q).push("t.year = ").push_bind(year);
	}
}

async fn genres_for(db: &SqlitePool, ids: &[Tid]) -> Result<HashMap<Tid, Vec<Genre>>, sqlx::Error> {
	let mut by_title: HashMap<Tid, Vec<Genre>> = HashMap::new();
	if ids.is_empty() {
		return Ok(by_title);
	}

	let mut q = QueryBuilder::<Sqlite>::new(
		"SELECT tg.title_id, g.id, g.name, g.slug FROM title_genres tg \
		JOIN genres g ON g.id = tg.genre_id WHERE tg.title_id IN (",
	);
	let mut list = q.separated(", ");
	for id in ids {
		list.push_bind(*id);
	}
	list.push_unseparated(") ORDER BY g.name, g.id");

	let rows = q.build_query_as::<TitleGenreQuery>().fetch_all(db).await?;
	for row in rows {
		by_title.entry(row.title_id).or_default().push(Genre {
			id: row.id,
			name: row.name,
			slug: row.slug,
		});
	}
	Ok(by_title)
}

pub async fn list_titles(
	db: &SqlitePool,
	filter: &TitleFilter,
	window: Window,
) -> Result<(Vec<Title>, i64), sqlx::Error> {
	let mut count = QueryBuilder::new(TITLE_COUNT);
	push_title_filters(&mut count, filter);
	let total: i64 = count.build_query_scalar().fetch_one(db).await?;

	let mut q = QueryBuilder::new(TITLE_SELECT);
	push_title_filters(&mut q, filter);
	q.push(" ORDER BY t.name, t.id");
	window.push(&mut q);
	let rows = q.build_query_as::<TitleQuery>().fetch_all(db).await?;

	let ids: Vec<Tid> = rows.iter().map(|row| row.id).collect();
	let mut genres = genres_for(db, &ids).await?;
	let titles = rows
		.into_iter()
		.map(|row| {
			let genre = genres.remove(&row.id).unwrap_or_default();
			Title::from_query(row, genre)
		})
		.collect();

	Ok((titles, total))
}

pub async fn get_title(db: &SqlitePool, id: Tid) -> Result<Option<Title>, sqlx::Error> {
	let select = format!("{TITLE_SELECT} WHERE t.id = ?");
	let Some(row) = sqlx::query_as::<_, TitleQuery>(&select)
		.bind(id)
		.fetch_optional(db)
		.await?
	else {
		return Ok(None);
	};
	let genre = genres_for(db, &[id]).await?.remove(&id).unwrap_or_default();
	Ok(Some(Title::from_query(row, genre)))
}

fn missing_slug(slug: &str) -> String {
	format!("Object with slug={slug} does not exist.")
}

/// Resolves category and genre slugs to ids, collecting every unknown slug.
async fn resolve_relations(
	conn: &mut SqliteConnection,
	changes: &TitleChanges,
) -> ApiResult<(Option<i64>, Option<Vec<i64>>)> {
	let mut errors = FieldErrors::new();

	let mut category_id = None;
	if let Some(slug) = &changes.category {
		category_id = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE slug = ?")
			.bind(slug)
			.fetch_optional(&mut *conn)
			.await?;
		if category_id.is_none() {
			errors.add("category", missing_slug(slug));
		}
	}

	let mut genre_ids = None;
	if let Some(slugs) = &changes.genre {
		let mut ids = Vec::with_capacity(slugs.len());
		for slug in slugs {
			let id = sqlx::query_scalar::<_, i64>("SELECT id FROM genres WHERE slug = ?")
				.bind(slug)
				.fetch_optional(&mut *conn)
				.await?;
			match id {
				Some(id) if !ids.contains(&id) => ids.push(id),
				Some(_) => {}
				None => errors.add("genre", missing_slug(slug)),
			}
		}
		genre_ids = Some(ids);
	}

	errors.into_result()?;
	Ok((category_id, genre_ids))
}

async fn link_genres(conn: &mut SqliteConnection, title: Tid, genres: &[i64]) -> Result<(), sqlx::Error> {
	sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
		.bind(title)
		.execute(&mut *conn)
		.await?;
	for genre in genres {
		sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES (?, ?)")
			.bind(title)
			.bind(genre)
			.execute(&mut *conn)
			.await?;
	}
	Ok(())
}

/// Inserts a title and its genre links in one transaction.
pub async fn create_title(db: &SqlitePool, changes: TitleChanges) -> ApiResult<Tid> {
	let mut tx = db.begin().await?;
	let (category_id, genre_ids) = resolve_relations(&mut tx, &changes).await?;

	let id = sqlx::query(
		"INSERT INTO titles (name, year, description, category_id) VALUES (?, ?, ?, ?)",
	)
	.bind(changes.name.unwrap_or_default())
	.bind(changes.year.unwrap_or_default())
	.bind(changes.description.unwrap_or_default())
	.bind(category_id)
	.execute(&mut *tx)
	.await?
	.last_insert_rowid();

	link_genres(&mut tx, id, &genre_ids.unwrap_or_default()).await?;
	tx.commit().await?;

	tracing::info!(title = id, "title created");
	Ok(id)
}

/// Applies the present fields of `changes`; genres are replaced wholesale.
pub async fn update_title(db: &SqlitePool, id: Tid, changes: TitleChanges) -> ApiResult<()> {
	let mut tx = db.begin().await?;
	let (category_id, genre_ids) = resolve_relations(&mut tx, &changes).await?;

	let res = sqlx::query(
		"UPDATE titles SET \
			name = COALESCE(?, name), \
			year = COALESCE(?, year), \
			description = COALESCE(?, description), \
			category_id = COALESCE(?, category_id) \
		WHERE id = ?",
	)
	.bind(changes.name)
	.bind(changes.year)
	.bind(changes.description)
	.bind(category_id)
	.bind(id)
	.execute(&mut *tx)
	.await?;
	if res.rows_affected() == 0 {
		return Err(ApiError::NotFound);
	}

	if let Some(genres) = genre_ids {
		link_genres(&mut tx, id, &genres).await?;
	}
	tx.commit().await?;
	Ok(())
}

pub async fn delete_title(db: &SqlitePool, id: Tid) -> Result<bool, sqlx::Error> {
	let res = sqlx::query("DELETE FROM titles WHERE id = ?")
		.bind(id)
		.execute(db)
		.await?;
	Ok(res.rows_affected() > 0)
}
