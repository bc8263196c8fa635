//! SQL lives here; handlers only see typed rows.

pub mod catalog;
pub mod feedback;
pub mod users;

use sqlx::{QueryBuilder, Sqlite};

/// LIMIT/OFFSET pair for one page of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
	pub limit: u32,
	pub offset: u32,
}

impl Window {
	/// `page` is 1-based; callers reject page 0 before getting here.
	pub fn page(page: u32, size: u32) -> Self {
		Window {
			limit: size,
			offset: page.saturating_sub(1).saturating_mul(size),
		}
	}

	pub(crate) fn push<'a>(self, q: &mut QueryBuilder<'a, Sqlite>) {
		q.push(" LIMIT ")
			.push_bind(i64::from(self.limit))
			.push(" OFFSET ")
			.push_bind(i64::from(self.offset));
	}
}

/// Case-insensitive substring pattern for `LIKE ... ESCAPE '\'`.
pub(crate) fn contains_pattern(term: &str) -> String {
	let mut pattern = String::with_capacity(term.len() + 2);
	pattern.push('%');
	for c in term.chars() {
		if matches!(c, '%' | '_' | '\\') {
			pattern.push('\\');
		}
		pattern.push(c);
	}
	pattern.push('%');
	pattern
}

/// Appends ` WHERE ` before the first condition and ` AND ` before the rest.
pub(crate) struct Conditions {
	first: bool,
}

impl Conditions {
	pub(crate) fn new() -> Self {
		Conditions { first: true }
	}

	pub(crate) fn next<'q, 'a>(
		&mut self,
		q: &'q mut QueryBuilder<'a, Sqlite>,
	) -> &'q mut QueryBuilder<'a, Sqlite> {
		q.push(if self.first { " WHERE " } else { " AND " });
		self.first = false;
		q
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn window_offsets() {
		assert_eq!(Window::page(1, 10), Window { limit: 10, offset: 0 });
		assert_eq!(Window::page(3, 10), Window { limit: 10, offset: 20 });
	}

	#[test]
	fn like_escapes_wildcards() {
		assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
	}
}
