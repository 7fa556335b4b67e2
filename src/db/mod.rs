//! Database bootstrap: opens (creating if absent) the SQLite file, wires an
//! `r2d2` connection pool, and runs per-entity migrations in a fixed order.

pub mod errors;
pub mod files;
pub mod migrate;
pub mod migrationtrait;
pub mod rows;
pub mod templates;

use std::path::{Path, PathBuf};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;
use tracing::info;

pub struct Database {
	pub path: PathBuf,
	pub pool: Pool<SqliteConnectionManager>,
	pub files: files::Files,
	pub rows: rows::Rows,
	pub errors: errors::Errors,
	pub templates: templates::Templates,
}

impl Database {
	/// Open a database file, creating it (and its schema) if it does not
	/// already exist. Safe to call repeatedly against the same file.
	pub fn open(path: &Path) -> Result<Self, DatabaseError> {
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}

		let manager = SqliteConnectionManager::file(path)
			.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
		let pool = Pool::new(manager)?;

		let version = migrate::get_migration_version(&pool)?;
		if version == 0 {
			info!(?path, "initializing bordereaux database schema");
			migrate::create(pool.clone())?;
		} else if version < migrate::CURRENT_MIGRATION_VERSION {
			info!(?path, from = version, to = migrate::CURRENT_MIGRATION_VERSION, "migrating bordereaux database schema");
			migrate::upgrade(pool.clone())?;
		}

		Ok(Self {
			path: path.to_path_buf(),
			pool: pool.clone(),
			files: files::Files::new(pool.clone()),
			rows: rows::Rows::new(pool.clone()),
			errors: errors::Errors::new(pool.clone()),
			templates: templates::Templates::new(pool),
		})
	}
}

#[derive(Debug, Error)]
pub enum DatabaseError {
	#[error("file operation error: {0}")]
	FileError(#[from] std::io::Error),
	#[error("sqlite operation error: {0}")]
	SqliteError(#[from] rusqlite::Error),
	#[error("r2d2 pool error: {0}")]
	R2D2Error(#[from] r2d2::Error),
	#[error("error parsing date/time: {0}")]
	ParseError(#[from] chrono::ParseError),
}
