use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "yamdb", version, about = "Review aggregation REST API")]
pub struct Cli {
	#[command(flatten)]
	pub settings: Settings,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
	/// Run the HTTP server (default)
	Serve,
	/// Create an admin superuser, or promote an existing account
	CreateSuperuser {
		#[arg(long)]
		username: String,
		#[arg(long)]
		email: String,
	},
}

/// Runtime settings. Every flag falls back to an environment variable,
/// and `.env` is loaded before parsing.
#[derive(Debug, Clone, Args)]
pub struct Settings {
	#[arg(long, env = "DATABASE_URL", default_value = "sqlite://yamdb.db")]
	pub database_url: String,

	#[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
	pub max_connections: u32,

	#[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
	pub bind: SocketAddr,

	#[arg(long, env = "JWT_SECRET", hide_env_values = true)]
	pub jwt_secret: String,

	#[arg(
		long,
		env = "ACCESS_TOKEN_TTL",
		default_value = "1day",
		value_parser = humantime::parse_duration
	)]
	pub access_token_ttl: Duration,

	#[arg(long, env = "DEFAULT_FROM_EMAIL", default_value = "noreply@yamdb.local")]
	pub from_email: String,

	/// Write outgoing mail as .eml files here instead of logging it
	#[arg(long, env = "EMAIL_FILE_PATH")]
	pub mail_dir: Option<PathBuf>,

	#[arg(long, env = "PAGE_SIZE", default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
	pub page_size: u32,
}

impl Settings {
	/// Settings for an in-memory database, used by tests.
	pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
		Self {
			database_url: "sqlite::memory:".to_string(),
			max_connections: 1,
			bind: SocketAddr::from(([127, 0, 0, 1], 0)),
			jwt_secret: jwt_secret.into(),
			access_token_ttl: Duration::from_secs(60 * 60),
			from_email: "noreply@yamdb.local".to_string(),
			mail_dir: None,
			page_size: 10,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_defaults_and_subcommand() {
		let cli = Cli::try_parse_from([
			"yamdb",
			"--jwt-secret",
			"s3cret",
			"create-superuser",
			"--username",
			"root",
			"--email",
			"root@example.com",
		])
		.unwrap();

		assert_eq!(cli.settings.page_size, 10);
		assert_eq!(cli.settings.access_token_ttl, Duration::from_secs(86_400));
		assert!(matches!(
			cli.command,
			Some(Command::CreateSuperuser { ref username, .. }) if username == "root"
		));
	}

	#[test]
	fn rejects_zero_page_size() {
		let res = Cli::try_parse_from(["yamdb", "--jwt-secret", "x", "--page-size", "0"]);
		assert!(res.is_err());
	}
}
