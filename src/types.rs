use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Uid = i64;
pub type Tid = i64;
pub type Rid = i64;
pub type Cid = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
	#[default]
	User,
	Moderator,
	Admin,
}

impl Role {
	pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

	pub const fn as_str(self) -> &'static str {
		match self {
			Role::User => "user",
			Role::Moderator => "moderator",
			Role::Admin => "admin",
		}
	}

	pub const fn is_moderator(self) -> bool {
		matches!(self, Role::Moderator)
	}

	pub const fn is_admin(self) -> bool {
		matches!(self, Role::Admin)
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Role::ALL
			.into_iter()
			.find(|role| role.as_str() == s)
			.ok_or_else(|| format!("\"{s}\" is not a valid choice."))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
	pub id: Uid,
	pub username: String,
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	pub bio: String,
	pub role: Role,
	pub is_superuser: bool,
	pub confirmation_code: Option<String>,
	pub date_joined: DateTime<Utc>,
}

impl User {
	/// Admins are users with the admin role, and every superuser.
	pub fn is_admin(&self) -> bool {
		self.is_superuser || self.role.is_admin()
	}

	pub fn is_moderator(&self) -> bool {
		self.role.is_moderator()
	}
}

/// Public account representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
	pub username: String,
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	pub bio: String,
	pub role: Role,
}

impl From<&User> for UserView {
	fn from(user: &User) -> Self {
		Self {
			username: user.username.clone(),
			email: user.email.clone(),
			first_name: user.first_name.clone(),
			last_name: user.last_name.clone(),
			bio: user.bio.clone(),
			role: user.role,
		}
	}
}

/// Categories and genres share a shape: a display name and a unique slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
	#[serde(skip)]
	pub id: i64,
	pub name: String,
	pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Genre {
	#[serde(skip)]
	pub id: i64,
	pub name: String,
	pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Title {
	pub id: Tid,
	pub name: String,
	pub year: i32,
	pub description: String,
	pub genre: Vec<Genre>,
	pub category: Option<Category>,
	pub rating: Option<i64>,
}

/// One row of the annotated title query; genres are fetched separately.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TitleQuery {
	pub id: Tid,
	pub name: String,
	pub year: i32,
	pub description: String,
	pub category_id: Option<i64>,
	pub category_name: Option<String>,
	pub category_slug: Option<String>,
	pub rating: Option<i64>,
}

impl Title {
	pub fn from_query(info: TitleQuery, genre: Vec<Genre>) -> Self {
		// the LEFT JOIN yields all three category columns or none of them
		let category = match (info.category_id, info.category_name, info.category_slug) {
			(Some(id), Some(name), Some(slug)) => Some(Category { id, name, slug }),
			_ => None,
		};
		Title {
			id: info.id,
			name: info.name,
			year: info.year,
			description: info.description,
			genre,
			category,
			rating: info.rating,
		}
	}
}

/// Genre row tagged with the title it is linked to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TitleGenreQuery {
	pub title_id: Tid,
	pub id: i64,
	pub name: String,
	pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
	pub id: Rid,
	pub text: String,
	/// Author's username.
	pub author: String,
	pub score: i64,
	pub pub_date: DateTime<Utc>,
	#[serde(skip)]
	pub author_id: Uid,
	#[serde(skip)]
	pub title_id: Tid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
	pub id: Cid,
	pub text: String,
	pub author: String,
	pub pub_date: DateTime<Utc>,
	#[serde(skip)]
	pub author_id: Uid,
	#[serde(skip)]
	pub review_id: Rid,
}

/// Anything with an author, for object-level permission checks.
pub trait Authored {
	fn author_id(&self) -> Uid;
}

impl Authored for Review {
	fn author_id(&self) -> Uid {
		self.author_id
	}
}

impl Authored for Comment {
	fn author_id(&self) -> Uid {
		self.author_id
	}
}

/// `?page=N`, kept raw so a malformed number reads as a missing page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
	pub page: Option<String>,
}

impl PageParams {
	/// The requested page, 1 when absent. `None` for anything that is not
	/// a page number.
	pub fn number(&self) -> Option<u32> {
		match self.page.as_deref().map(str::trim) {
			None | Some("") => Some(1),
			Some(raw) => raw.parse().ok().filter(|&page| page > 0),
		}
	}
}

/// One page of a list endpoint. `next` and `previous` are page numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
	pub count: i64,
	pub next: Option<u32>,
	pub previous: Option<u32>,
	pub results: Vec<T>,
}

impl<T> Page<T> {
	pub fn new(results: Vec<T>, count: i64, page: u32, size: u32) -> Self {
		let last = (count.max(1) as u64).div_ceil(u64::from(size));
		let next = (u64::from(page) < last).then_some(page + 1);
		let previous = (page > 1).then(|| page - 1);
		Page { count, next, previous, results }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn role_predicates() {
		assert!(Role::Admin.is_admin());
		assert!(!Role::Moderator.is_admin());
		assert!(Role::Moderator.is_moderator());
		assert!(!Role::User.is_moderator());
		assert_eq!("moderator".parse::<Role>(), Ok(Role::Moderator));
		assert!("root".parse::<Role>().is_err());
	}

	#[test]
	fn page_links() {
		let page: Page<()> = Page::new(vec![], 25, 1, 10);
		assert_eq!((page.previous, page.next), (None, Some(2)));

		let page: Page<()> = Page::new(vec![], 25, 3, 10);
		assert_eq!((page.previous, page.next), (Some(2), None));

		let page: Page<()> = Page::new(vec![], 0, 1, 10);
		assert_eq!((page.previous, page.next), (None, None));
	}

	#[test]
	fn page_numbers() {
		let page = |raw: Option<&str>| PageParams { page: raw.map(String::from) }.number();
		assert_eq!(page(None), Some(1));
		assert_eq!(page(Some("")), Some(1));
		assert_eq!(page(Some("3")), Some(3));
		assert_eq!(page(Some("0")), None);
		assert_eq!(page(Some("-1")), None);
		assert_eq!(page(Some("abc")), None);
	}

	#[test]
	fn title_without_category() {
		let row = TitleQuery {
			id: 1,
			name: "Dune".into(),
			year: 1965,
			description: String::new(),
			category_id: None,
			category_name: None,
			category_slug: None,
			rating: None,
		};
		let title = Title::from_query(row, vec![]);
		let json = serde_json::to_value(&title).unwrap();
		assert!(json["category"].is_null());
		assert!(json["rating"].is_null());
	}
}
