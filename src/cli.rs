use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bordereaux", version, about = "Insurance bordereaux file ingestion and processing")]
pub struct Cli {
	/// Path to a configuration file; when given it is the only file source read.
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	#[arg(long, global = true)]
	pub host: Option<String>,

	#[arg(long, global = true)]
	pub port: Option<u16>,

	#[arg(long, global = true)]
	pub database_url: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
	/// Start the HTTP API together with the scheduled mailbox poller and batch processor.
	Serve,
	/// Poll the configured mailbox once and print the result.
	PollMailbox(PollMailboxArgs),
	/// Run the batch processor once against every file sitting in `received`.
	ProcessBatch,
	/// Open the database, applying migrations, and exit.
	Migrate,
	/// Load template JSON sidecars from a directory into the database.
	SeedTemplates(SeedTemplatesArgs),
}

#[derive(Debug, Parser)]
pub struct PollMailboxArgs {
	#[arg(long, default_value = "INBOX")]
	pub folder: String,
}

#[derive(Debug, Parser)]
pub struct SeedTemplatesArgs {
	pub dir: PathBuf,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_serve_with_global_overrides() {
		let cli = Cli::try_parse_from(["bordereaux", "--port", "9000", "serve"]).unwrap();
		assert_eq!(cli.port, Some(9000));
		assert!(matches!(cli.command, Commands::Serve));
	}

	#[test]
	fn parses_poll_mailbox_with_default_folder() {
		let cli = Cli::try_parse_from(["bordereaux", "poll-mailbox"]).unwrap();
		match cli.command {
			Commands::PollMailbox(args) => assert_eq!(args.folder, "INBOX"),
			_ => panic!("expected PollMailbox"),
		}
	}

	#[test]
	fn parses_seed_templates_with_directory() {
		let cli = Cli::try_parse_from(["bordereaux", "seed-templates", "./templates"]).unwrap();
		match cli.command {
			Commands::SeedTemplates(args) => assert_eq!(args.dir, PathBuf::from("./templates")),
			_ => panic!("expected SeedTemplates"),
		}
	}
}
