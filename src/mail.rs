//! Outbound mail. Signup hands a message to a [`Mailer`] and fails the
//! request if delivery fails.

use std::path::PathBuf;

use axum::async_trait;
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
	pub from: String,
	pub to: String,
	pub subject: String,
	pub body: String,
}

impl Email {
	/// RFC 5322 text of the message.
	pub fn render(&self) -> String {
		format!(
			"From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
			self.from,
			self.to,
			self.subject,
			Utc::now().to_rfc2822(),
			self.body,
		)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
	#[error("could not write message to {path}: {source}")]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

#[async_trait]
pub trait Mailer: Send + Sync {
	async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Logs every message instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
	async fn send(&self, email: &Email) -> Result<(), MailError> {
		tracing::info!(
			from = %email.from,
			to = %email.to,
			subject = %email.subject,
			body = %email.body,
			"outgoing mail"
		);
		Ok(())
	}
}

/// Drops each message as an `.eml` file into a directory.
#[derive(Debug, Clone)]
pub struct FileMailer {
	dir: PathBuf,
}

impl FileMailer {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		FileMailer { dir: dir.into() }
	}
}

#[async_trait]
impl Mailer for FileMailer {
	async fn send(&self, email: &Email) -> Result<(), MailError> {
		fs::create_dir_all(&self.dir).await.map_err(|source| MailError::Write {
			path: self.dir.clone(),
			source,
		})?;
		let path = self.dir.join(format!(
			"{}-{}.eml",
			Utc::now().format("%Y%m%d-%H%M%S"),
			Uuid::new_v4().simple()
		));
		fs::write(&path, email.render()).await.map_err(|source| MailError::Write {
			path: path.clone(),
			source,
		})?;
		tracing::debug!(path = %path.display(), to = %email.to, "mail written");
		Ok(())
	}
}
