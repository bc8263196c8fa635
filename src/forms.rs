//! Request bodies and their validation.
//!
//! Every field arrives as an `Option` so that a missing field becomes a
//! field-keyed "required" message instead of a body rejection.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ApiResult, FieldErrors, REQUIRED};
use crate::types::Role;
use crate::validate;

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::<T>::deserialize(de).map(Some)
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it can be reported.
fn present<'de, D>(de: D) -> Result<Option<Value>, D::Error>
where
	D: Deserializer<'de>,
{
	Value::deserialize(de).map(Some)
}

pub const NOT_AN_INTEGER: &str = "A valid integer is required.";

/// Integers arrive as JSON numbers or numeric strings.
fn integer<T: TryFrom<i64>>(value: &Value) -> Result<T, String> {
	let parsed = match value {
		Value::Null => return Err("This field may not be null.".to_string()),
		Value::Number(n) => n.as_i64(),
		Value::String(s) => s.trim().parse::<i64>().ok(),
		_ => None,
	};
	parsed
		.and_then(|n| T::try_from(n).ok())
		.ok_or_else(|| NOT_AN_INTEGER.to_string())
}

/// Parses an integer field, recording a field error on failure.
fn integer_field<T: TryFrom<i64>>(
	errors: &mut FieldErrors,
	field: &str,
	value: Option<&Value>,
) -> Option<T> {
	match integer(value?) {
		Ok(n) => Some(n),
		Err(msg) => {
			errors.add(field, msg);
			None
		}
	}
}

fn required<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
	if value.is_none() {
		errors.add(field, REQUIRED);
	}
	value
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlugForm {
	pub name: Option<String>,
	pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSlugged {
	pub name: String,
	pub slug: String,
}

impl SlugForm {
	pub fn validate(self) -> ApiResult<NewSlugged> {
		let mut errors = FieldErrors::new();
		let name = required(&mut errors, "name", self.name);
		let slug = required(&mut errors, "slug", self.slug);
		if let Some(name) = &name {
			errors.check("name", validate::name(name));
		}
		if let Some(slug) = &slug {
			errors.check("slug", validate::slug(slug));
		}
		errors.into_result()?;
		Ok(NewSlugged {
			name: name.unwrap_or_default(),
			slug: slug.unwrap_or_default(),
		})
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleForm {
	pub name: Option<String>,
	#[serde(default, deserialize_with = "present")]
	pub year: Option<Value>,
	pub description: Option<String>,
	pub genre: Option<Vec<String>>,
	#[serde(default, deserialize_with = "nullable")]
	pub category: Option<Option<String>>,
}

/// Validated title fields; on update, `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleChanges {
	pub name: Option<String>,
	pub year: Option<i32>,
	pub description: Option<String>,
	pub genre: Option<Vec<String>>,
	pub category: Option<String>,
}

impl TitleForm {
	pub fn validate_create(self) -> ApiResult<TitleChanges> {
		let mut errors = FieldErrors::new();
		if self.name.is_none() {
			errors.add("name", REQUIRED);
		}
		if self.year.is_none() {
			errors.add("year", REQUIRED);
		}
		if self.genre.is_none() {
			errors.add("genre", REQUIRED);
		}
		if self.category.is_none() {
			errors.add("category", REQUIRED);
		}
		let changes = self.validate_fields(errors)?;
		Ok(TitleChanges {
			description: Some(changes.description.unwrap_or_default()),
			..changes
		})
	}

	pub fn validate_update(self) -> ApiResult<TitleChanges> {
		self.validate_fields(FieldErrors::new())
	}

	fn validate_fields(self, mut errors: FieldErrors) -> ApiResult<TitleChanges> {
		if let Some(name) = &self.name {
			errors.check("name", validate::name(name));
		}
		let year = integer_field::<i32>(&mut errors, "year", self.year.as_ref());
		if let Some(year) = year {
			errors.check("year", validate::year(year));
		}
		if let Some(genre) = &self.genre {
			if genre.is_empty() {
				errors.add("genre", "This list may not be empty.");
			}
		}
		let category = match self.category {
			Some(None) => {
				errors.add("category", "This field may not be null.");
				None
			}
			Some(Some(slug)) => Some(slug),
			None => None,
		};
		errors.into_result()?;
		Ok(TitleChanges {
			name: self.name,
			year,
			description: self.description,
			genre: self.genre,
			category,
		})
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewForm {
	pub text: Option<String>,
	#[serde(default, deserialize_with = "present")]
	pub score: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewChanges {
	pub text: Option<String>,
	pub score: Option<i64>,
}

impl ReviewForm {
	pub fn validate_create(self) -> ApiResult<(String, i64)> {
		let mut errors = FieldErrors::new();
		if self.text.is_none() {
			errors.add("text", REQUIRED);
		}
		if self.score.is_none() {
			errors.add("score", REQUIRED);
		}
		let changes = self.validate_update_into(errors)?;
		Ok((changes.text.unwrap_or_default(), changes.score.unwrap_or_default()))
	}

	pub fn validate_update(self) -> ApiResult<ReviewChanges> {
		self.validate_update_into(FieldErrors::new())
	}

	fn validate_update_into(self, mut errors: FieldErrors) -> ApiResult<ReviewChanges> {
		if let Some(text) = &self.text {
			errors.check("text", validate::text(text));
		}
		let score = integer_field::<i64>(&mut errors, "score", self.score.as_ref());
		if let Some(score) = score {
			errors.check("score", validate::score(score));
		}
		errors.into_result()?;
		Ok(ReviewChanges { text: self.text, score })
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
	pub text: Option<String>,
}

impl CommentForm {
	/// Comments have a single field, so create and update validate alike.
	pub fn validate(self) -> ApiResult<String> {
		let mut errors = FieldErrors::new();
		let text = required(&mut errors, "text", self.text);
		if let Some(text) = &text {
			errors.check("text", validate::text(text));
		}
		errors.into_result()?;
		Ok(text.unwrap_or_default())
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
	pub username: Option<String>,
	pub email: Option<String>,
}

impl SignupForm {
	pub fn validate(self) -> ApiResult<(String, String)> {
		let mut errors = FieldErrors::new();
		let username = required(&mut errors, "username", self.username);
		let email = required(&mut errors, "email", self.email);
		if let Some(username) = &username {
			errors.check("username", validate::username(username));
		}
		if let Some(email) = &email {
			errors.check("email", validate::email(email));
		}
		errors.into_result()?;
		Ok((username.unwrap_or_default(), email.unwrap_or_default()))
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenForm {
	pub username: Option<String>,
	pub confirmation_code: Option<String>,
}

impl TokenForm {
	pub fn validate(self) -> ApiResult<(String, String)> {
		let mut errors = FieldErrors::new();
		let username = required(&mut errors, "username", self.username);
		let code = required(&mut errors, "confirmation_code", self.confirmation_code);
		if let Some(username) = &username {
			errors.check("username", validate::username(username));
		}
		if let Some(code) = &code {
			errors.check("confirmation_code", validate::text(code));
		}
		errors.into_result()?;
		Ok((username.unwrap_or_default(), code.unwrap_or_default()))
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserForm {
	pub username: Option<String>,
	pub email: Option<String>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub bio: Option<String>,
	pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
	pub username: Option<String>,
	pub email: Option<String>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub bio: Option<String>,
	pub role: Option<Role>,
}

impl UserForm {
	pub fn validate_create(self) -> ApiResult<UserChanges> {
		let mut errors = FieldErrors::new();
		if self.username.is_none() {
			errors.add("username", REQUIRED);
		}
		if self.email.is_none() {
			errors.add("email", REQUIRED);
		}
		self.validate_fields(errors)
	}

	pub fn validate_update(self) -> ApiResult<UserChanges> {
		self.validate_fields(FieldErrors::new())
	}

	/// Profile edits by the account owner; the role is read-only there.
	pub fn validate_self_update(self) -> ApiResult<UserChanges> {
		let changes = self.validate_fields(FieldErrors::new())?;
		Ok(UserChanges { role: None, ..changes })
	}

	fn validate_fields(self, mut errors: FieldErrors) -> ApiResult<UserChanges> {
		if let Some(username) = &self.username {
			errors.check("username", validate::username(username));
		}
		if let Some(email) = &self.email {
			errors.check("email", validate::email(email));
		}
		for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
			if let Some(value) = value {
				errors.check(field, validate::person_name(value));
			}
		}
		let role = match self.role.as_deref().map(str::parse::<Role>) {
			Some(Ok(role)) => Some(role),
			Some(Err(msg)) => {
				errors.add("role", msg);
				None
			}
			None => None,
		};
		errors.into_result()?;
		Ok(UserChanges {
			username: self.username,
			email: self.email,
			first_name: self.first_name,
			last_name: self.last_name,
			bio: self.bio,
			role,
		})
	}
}
