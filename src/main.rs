// review aggregation service

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yamdb::config::{Cli, Command};
use yamdb::{repo, routes, sql, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	// a missing .env is fine; the environment and flags still apply
	let _ = dotenvy::dotenv();

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new("yamdb=info,tower_http=info")),
		)
		.init();

	let cli = Cli::parse();
	let settings = cli.settings;

	// set up connection pool
	let pool = sql::open(&settings)
		.await
		.with_context(|| format!("can't open database {}", settings.database_url))?;

	match cli.command.unwrap_or(Command::Serve) {
		Command::CreateSuperuser { username, email } => {
			let user = repo::users::create_superuser(&pool, &username, &email)
				.await
				.map_err(|err| anyhow::anyhow!("can't create superuser: {err}"))?;
			println!("superuser {} <{}> ready", user.username, user.email);
		}
		Command::Serve => {
			let bind = settings.bind;
			let mailer = AppState::mailer_for(&settings);
			let app = routes::router(AppState::new(pool, settings, mailer));

			let listener = tokio::net::TcpListener::bind(bind)
				.await
				.with_context(|| format!("can't bind {bind}"))?;
			tracing::info!(addr = %bind, "listening");
			axum::serve(listener, app)
				.with_graceful_shutdown(shutdown_signal())
				.await?;
		}
	}
	Ok(())
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "can't listen for shutdown signal");
		std::future::pending::<()>().await;
	}
	tracing::info!("shutting down");
}
