use std::path::PathBuf;

use config::File;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cli::Cli;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub database_url: String,
	pub host: String,
	pub port: u16,
	pub storage_base_path: PathBuf,
	pub allowed_file_types: Vec<String>,
	pub imap_host: Option<String>,
	pub imap_port: u16,
	pub imap_username: Option<String>,
	pub imap_password: Option<String>,
	pub imap_oauth_token: Option<String>,
	pub polling_interval: u64,
	pub log_level: String,
	pub log_file: Option<PathBuf>,
	pub openrouter_api_key: Option<String>,
	pub openrouter_model: String,
	pub use_ai_suggestions: bool,
	pub templates_dir: PathBuf,
	pub min_confidence: f64,
	pub rules_file: Option<PathBuf>,
	pub mailbox_enabled: bool,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			database_url: "sqlite:///./bordereaux.db".to_string(),
			host: "0.0.0.0".to_string(),
			port: 8000,
			storage_base_path: PathBuf::from("./storage"),
			allowed_file_types: vec!["xlsx".to_string(), "xls".to_string(), "csv".to_string()],
			imap_host: None,
			imap_port: 993,
			imap_username: None,
			imap_password: None,
			imap_oauth_token: None,
			polling_interval: 300,
			log_level: "INFO".to_string(),
			log_file: None,
			openrouter_api_key: None,
			openrouter_model: "openai/gpt-3.5-turbo".to_string(),
			use_ai_suggestions: true,
			templates_dir: PathBuf::from("./templates"),
			min_confidence: 0.30,
			rules_file: None,
			mailbox_enabled: false,
		}
	}
}

impl Settings {
	/// Load settings in layers: compiled-in defaults, an explicit `path`
	/// (required when given), a system-wide file, a per-user file, then
	/// environment variables prefixed `BORDEREAUX_` (`__` separates nested
	/// keys, though this config is currently flat).
	pub fn load(path: &Option<PathBuf>) -> Result<Self, ConfigError> {
		let defaults = config::Config::try_from(&Settings::default())?;
		let mut builder = config::Config::builder().add_source(defaults);

		if let Some(config_path) = path {
			debug!(?config_path, "loading configuration from user specified path");
			builder = builder.add_source(File::with_name(path_str(config_path)?).required(true));
		} else {
			let system_path = PathBuf::from("/etc/bordereaux/config.toml");
			builder = builder.add_source(File::with_name(path_str(&system_path)?).required(false));

			match dirs::config_local_dir() {
				Some(dir) => {
					let user_path = dir.join("bordereaux").join("config.toml");
					builder = builder.add_source(File::with_name(path_str(&user_path)?).required(false));
				}
				None => warn!("could not determine user config directory"),
			}
		}

		builder = builder.add_source(config::Environment::with_prefix("BORDEREAUX").separator("__"));

		let settings: Settings = builder.build()?.try_deserialize()?;
		Ok(settings)
	}

	pub fn apply_cli_overrides(&mut self, cli: &Cli) {
		if let Some(host) = &cli.host {
			self.host = host.clone();
		}
		if let Some(port) = cli.port {
			self.port = port;
		}
		if let Some(db) = &cli.database_url {
			self.database_url = db.clone();
		}
	}

	/// Enforce the invariants the loaded file/env layers can't: exactly one
	/// mailbox credential must be present whenever the poller is enabled.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.mailbox_enabled {
			if self.imap_host.is_none() {
				return Err(ConfigError::MissingImapHost);
			}
			let has_password = self.imap_password.is_some();
			let has_token = self.imap_oauth_token.is_some();
			if has_password == has_token {
				return Err(ConfigError::AmbiguousImapCredential);
			}
		}
		Ok(())
	}
}

fn path_str(path: &std::path::Path) -> Result<&str, ConfigError> {
	path.to_str().ok_or_else(|| ConfigError::InvalidPath(path.to_path_buf()))
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("configuration path is not valid UTF-8: {0:?}")]
	InvalidPath(PathBuf),
	#[error("configuration source error: {0}")]
	Source(#[from] config::ConfigError),
	#[error("mailbox polling is enabled but imap_host is not set")]
	MissingImapHost,
	#[error("mailbox polling requires exactly one of imap_password or imap_oauth_token")]
	AmbiguousImapCredential,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_pass_validation_with_mailbox_disabled() {
		let settings = Settings::default();
		assert!(settings.validate().is_ok());
	}

	#[test]
	fn mailbox_enabled_without_credential_fails() {
		let mut settings = Settings::default();
		settings.mailbox_enabled = true;
		settings.imap_host = Some("imap.example.com".to_string());
		assert!(matches!(settings.validate(), Err(ConfigError::AmbiguousImapCredential)));
	}

	#[test]
	fn mailbox_enabled_with_password_passes() {
		let mut settings = Settings::default();
		settings.mailbox_enabled = true;
		settings.imap_host = Some("imap.example.com".to_string());
		settings.imap_password = Some("secret".to_string());
		assert!(settings.validate().is_ok());
	}
}
