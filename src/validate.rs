//! Field validators shared by the request forms.
//!
//! Each validator returns the user-facing message on failure; forms collect
//! them into [`FieldErrors`](crate::error::FieldErrors).

use chrono::{Datelike, Utc};

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_PERSON_NAME_LEN: usize = 150;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_SLUG_LEN: usize = 50;
pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;

/// Usernames that would collide with fixed routes.
pub const FORBIDDEN_USERNAMES: &[&str] = &["me"];

fn max_len(value: &str, max: usize) -> Result<(), String> {
	if value.chars().count() > max {
		return Err(format!("Ensure this field has no more than {max} characters."));
	}
	Ok(())
}

fn not_blank(value: &str) -> Result<(), String> {
	if value.trim().is_empty() {
		return Err("This field may not be blank.".to_string());
	}
	Ok(())
}

pub fn username(value: &str) -> Result<(), String> {
	not_blank(value)?;
	max_len(value, MAX_USERNAME_LEN)?;
	let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-');
	if !value.chars().all(allowed) {
		return Err(
			"Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
				.to_string(),
		);
	}
	if FORBIDDEN_USERNAMES.contains(&value.to_lowercase().as_str()) {
		return Err(format!("Username \"{value}\" is not allowed."));
	}
	Ok(())
}

pub fn email(value: &str) -> Result<(), String> {
	not_blank(value)?;
	max_len(value, MAX_EMAIL_LEN)?;
	let invalid = || "Enter a valid email address.".to_string();
	let (local, domain) = value.rsplit_once('@').ok_or_else(invalid)?;
	if local.is_empty() || local.contains(char::is_whitespace) {
		return Err(invalid());
	}
	let labels_ok = domain
		.split('.')
		.all(|label| !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '-'));
	if !domain.contains('.') || !labels_ok {
		return Err(invalid());
	}
	Ok(())
}

pub fn person_name(value: &str) -> Result<(), String> {
	max_len(value, MAX_PERSON_NAME_LEN)
}

pub fn name(value: &str) -> Result<(), String> {
	not_blank(value)?;
	max_len(value, MAX_NAME_LEN)
}

pub fn slug(value: &str) -> Result<(), String> {
	not_blank(value)?;
	max_len(value, MAX_SLUG_LEN)?;
	if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
		return Err(
			"Enter a valid \"slug\" consisting of letters, numbers, underscores or hyphens."
				.to_string(),
		);
	}
	Ok(())
}

pub fn text(value: &str) -> Result<(), String> {
	not_blank(value)
}

/// Titles may not be dated after the current year.
pub fn year(value: i32) -> Result<(), String> {
	let current = Utc::now().year();
	if value > current {
		return Err(format!("Year {value} is later than the current year {current}."));
	}
	Ok(())
}

pub fn score(value: i64) -> Result<(), String> {
	if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
		return Err(format!("\"{value}\" is not a valid choice."));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn username_rules() {
		assert!(username("alice").is_ok());
		assert!(username("a.l+i-c_e@x").is_ok());
		assert!(username("me").is_err());
		assert!(username("ME").is_err());
		assert!(username("bad name").is_err());
		assert!(username("").is_err());
		assert!(username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
	}

	#[test]
	fn email_rules() {
		assert!(email("alice@example.com").is_ok());
		assert!(email("alice@localhost").is_err());
		assert!(email("alice.example.com").is_err());
		assert!(email("@example.com").is_err());
		assert!(email("alice@example..com").is_err());
	}

	#[test]
	fn slug_rules() {
		assert!(slug("sci-fi_2").is_ok());
		assert!(slug("sci fi").is_err());
		assert!(slug("научка").is_err());
	}

	#[test]
	fn year_is_not_in_the_future() {
		let now = Utc::now().year();
		assert!(year(now).is_ok());
		assert!(year(1887).is_ok());
		assert!(year(now + 1).is_err());
	}

	#[test]
	fn score_bounds() {
		assert!(score(1).is_ok());
		assert!(score(10).is_ok());
		assert!(score(0).is_err());
		assert!(score(11).is_err());
	}
}
