mod api;
mod batch;
mod cli;
mod config;
pub mod db;
mod llm;
mod mailbox;
mod mapping;
mod matching;
mod models;
pub mod normalize;
mod parsing;
mod pipeline;
mod proposal;
mod storage;
mod templates;
mod util;
mod validation;

use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::{ConfigError, Settings};
use db::{Database, DatabaseError};
use llm::OpenRouterClient;
use pipeline::{Pipeline, PipelineError};
use proposal::ProposalGenerator;
use storage::Storage;
use templates::{TemplateError, TemplateRegistry};

pub async fn run() -> Result<(), RunError> {
	let cli = Cli::parse();

	let mut settings = Settings::load(&cli.config)?;
	settings.apply_cli_overrides(&cli);
	settings.validate()?;

	init_logging(&settings);

	match cli.command {
		Commands::Serve => serve(settings).await?,
		Commands::PollMailbox(args) => poll_mailbox_once(&settings, &args.folder)?,
		Commands::ProcessBatch => process_batch_once(&settings).await?,
		Commands::Migrate => {
			let db = Database::open(&database_path(&settings))?;
			info!(path = ?db.path, "database opened and migrated");
		}
		Commands::SeedTemplates(args) => {
			let db = Database::open(&database_path(&settings))?;
			let registry = TemplateRegistry::new(args.dir.clone());
			let loaded = registry.load_all_from_json(&db)?;
			info!(loaded, dir = ?args.dir, "templates seeded from directory");
		}
	}

	Ok(())
}

fn init_logging(settings: &Settings) {
	let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

	if settings.log_file.is_some() {
		subscriber.json().init();
	} else {
		subscriber.init();
	}
}

fn database_path(settings: &Settings) -> std::path::PathBuf {
	settings.database_url.trim_start_matches("sqlite:///").into()
}

fn build_pipeline(settings: &Settings) -> Pipeline {
	let templates = TemplateRegistry::new(settings.templates_dir.clone());
	let proposals = ProposalGenerator::new(settings.templates_dir.join("proposals"), Some(settings.min_confidence));
	let rules = settings
		.rules_file
		.as_ref()
		.and_then(|path| std::fs::read_to_string(path).ok())
		.and_then(|contents| serde_json::from_str(&contents).ok())
		.unwrap_or_default();
	let llm_client = settings
		.use_ai_suggestions
		.then(|| settings.openrouter_api_key.clone())
		.flatten()
		.map(|key| OpenRouterClient::new(key, settings.openrouter_model.clone()));
	Pipeline::new(templates, proposals, rules, llm_client)
}

async fn serve(settings: Settings) -> Result<(), RunError> {
	let db = Arc::new(Database::open(&database_path(&settings))?);
	let storage = Arc::new(Storage::new(settings.storage_base_path.clone()));
	let pipeline = Arc::new(build_pipeline(&settings));
	let templates = Arc::new(TemplateRegistry::new(settings.templates_dir.clone()));
	let proposals = Arc::new(ProposalGenerator::new(settings.templates_dir.join("proposals"), Some(settings.min_confidence)));

	templates.load_all_from_json(&db)?;
	pipeline.reload_templates(&db).await?;

	if settings.mailbox_enabled {
		spawn_mailbox_poller(settings.clone(), db.clone(), storage.clone());
	}

	let state = api::AppState {
		db,
		storage,
		pipeline,
		templates,
		proposals,
	};
	let router = api::create_api_router(state);

	let addr = format!("{}:{}", settings.host, settings.port);
	let listener = tokio::net::TcpListener::bind(&addr).await.map_err(RunError::Io)?;
	info!(%addr, "bordereaux API listening");

	axum::serve(listener, router)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(RunError::Io)?;

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler") };

	#[cfg(unix)]
	let terminate = async {
		tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	info!("shutdown signal received");
}

fn spawn_mailbox_poller(settings: Settings, db: Arc<Database>, storage: Arc<Storage>) {
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(std::time::Duration::from_secs(settings.polling_interval));
		loop {
			interval.tick().await;
			let Some(config) = mailbox_config(&settings, "INBOX") else {
				warn!("scheduled mailbox poll skipped, credentials incomplete");
				continue;
			};
			let db = db.clone();
			let storage = storage.clone();
			match tokio::task::spawn_blocking(move || mailbox::poll_once(&config, &db, &storage)).await {
				Ok(Ok(result)) => info!(
					processed = result.processed_count,
					duplicate = result.duplicate_count,
					failed = result.failed_count,
					"scheduled mailbox poll completed"
				),
				Ok(Err(err)) => error!(%err, "scheduled mailbox poll failed"),
				Err(err) => error!(%err, "mailbox poll task panicked"),
			}
		}
	});
}

fn mailbox_config(settings: &Settings, folder: &str) -> Option<mailbox::MailboxConfig> {
	Some(mailbox::MailboxConfig {
		host: settings.imap_host.clone()?,
		port: settings.imap_port,
		username: settings.imap_username.clone()?,
		password: settings.imap_password.clone().or_else(|| settings.imap_oauth_token.clone())?,
		folder: folder.to_string(),
	})
}

fn poll_mailbox_once(settings: &Settings, folder: &str) -> Result<(), RunError> {
	let db = Database::open(&database_path(settings))?;
	let storage = Storage::new(settings.storage_base_path.clone());
	let config = mailbox_config(settings, folder).ok_or(ConfigError::MissingImapHost)?;
	let result = mailbox::poll_once(&config, &db, &storage)?;
	println!("{:#?}", result);
	Ok(())
}

async fn process_batch_once(settings: &Settings) -> Result<(), RunError> {
	let db = Database::open(&database_path(settings))?;
	let pipeline = build_pipeline(settings);
	pipeline.reload_templates(&db).await?;
	let result = batch::process_new_files(&db, &pipeline).await?;
	println!("{:#?}", result);
	Ok(())
}

#[derive(Debug, Error)]
pub enum RunError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
	#[error("database error: {0}")]
	Database(#[from] DatabaseError),
	#[error("pipeline error: {0}")]
	Pipeline(#[from] PipelineError),
	#[error("template error: {0}")]
	Template(#[from] TemplateError),
	#[error("mailbox error: {0}")]
	Mailbox(#[from] mailbox::MailboxError),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}
