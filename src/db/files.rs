use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

use crate::db::DatabaseError;
use crate::db::migrationtrait::MigrationTrait;
use crate::models::{BordereauxFile, FileStatus};

pub struct Files {
	pool: Pool<SqliteConnectionManager>,
}

impl MigrationTrait for Files {
	fn create(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		let conn = pool.get()?;
		conn.execute_batch(
			"CREATE TABLE IF NOT EXISTS bordereaux_files (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				filename TEXT NOT NULL,
				file_path TEXT NOT NULL,
				file_size INTEGER NOT NULL,
				mime_type TEXT,
				content_hash TEXT NOT NULL UNIQUE,
				status TEXT NOT NULL DEFAULT 'pending',
				error_message TEXT,
				total_rows INTEGER NOT NULL DEFAULT 0,
				processed_rows INTEGER NOT NULL DEFAULT 0,
				sender TEXT,
				subject TEXT,
				received_at DATETIME,
				proposal_path TEXT,
				created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
				updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
				processed_at DATETIME
			);",
		)?;
		Ok(())
	}

	fn upgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		Self::create(pool)
	}

	fn downgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		let conn = pool.get()?;
		conn.execute_batch("DROP TABLE IF EXISTS bordereaux_files;")?;
		Ok(())
	}
}

impl Files {
	pub fn new(pool: Pool<SqliteConnectionManager>) -> Self {
		Self { pool }
	}

	pub fn find_by_hash(&self, content_hash: &str) -> Result<Option<BordereauxFile>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(&format!("{} WHERE content_hash = ?1", SELECT))?;
		let file = stmt
			.query_row(params![content_hash], row_to_file)
			.optional()?;
		Ok(file)
	}

	pub fn get(&self, id: i64) -> Result<Option<BordereauxFile>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT))?;
		let file = stmt.query_row(params![id], row_to_file).optional()?;
		Ok(file)
	}

	pub fn insert(
		&self,
		filename: &str,
		file_path: &str,
		file_size: i64,
		mime_type: Option<&str>,
		content_hash: &str,
		sender: Option<&str>,
		subject: Option<&str>,
		received_at: Option<DateTime<Utc>>,
	) -> Result<i64, DatabaseError> {
		let conn = self.pool.get()?;
		let now = Utc::now().to_rfc3339();
		conn.execute(
			"INSERT INTO bordereaux_files
				(filename, file_path, file_size, mime_type, content_hash, status, sender, subject, received_at, created_at, updated_at)
			VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9, ?9);",
			params![
				filename,
				file_path,
				file_size,
				mime_type,
				content_hash,
				sender,
				subject,
				received_at.map(|d| d.to_rfc3339()),
				now,
			],
		)?;
		Ok(conn.last_insert_rowid())
	}

	pub fn set_status(&self, id: i64, status: FileStatus, error_message: Option<&str>) -> Result<(), DatabaseError> {
		let conn = self.pool.get()?;
		conn.execute(
			"UPDATE bordereaux_files SET status = ?1, error_message = ?2, updated_at = ?3 WHERE id = ?4;",
			params![status.as_str(), error_message, Utc::now().to_rfc3339(), id],
		)?;
		Ok(())
	}

	pub fn set_proposal_path(&self, id: i64, path: &str) -> Result<(), DatabaseError> {
		let conn = self.pool.get()?;
		conn.execute(
			"UPDATE bordereaux_files SET proposal_path = ?1, updated_at = ?2 WHERE id = ?3;",
			params![path, Utc::now().to_rfc3339(), id],
		)?;
		Ok(())
	}

	pub fn update_processing_stats(
		&self,
		id: i64,
		total_rows: i64,
		processed_rows: i64,
		status: FileStatus,
		error_message: Option<&str>,
	) -> Result<(), DatabaseError> {
		let conn = self.pool.get()?;
		let now = Utc::now().to_rfc3339();
		conn.execute(
			"UPDATE bordereaux_files
				SET total_rows = ?1, processed_rows = ?2, status = ?3, error_message = ?4,
					processed_at = ?5, updated_at = ?5
				WHERE id = ?6;",
			params![total_rows, processed_rows, status.as_str(), error_message, now, id],
		)?;
		Ok(())
	}

	pub fn list(
		&self,
		status: Option<FileStatus>,
		limit: i64,
		offset: i64,
	) -> Result<Vec<BordereauxFile>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut files = Vec::new();
		if let Some(status) = status {
			let mut stmt = conn.prepare(&format!(
				"{} WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
				SELECT
			))?;
			let rows = stmt.query_map(params![status.as_str(), limit, offset], row_to_file)?;
			for row in rows {
				files.push(row?);
			}
		} else {
			let mut stmt = conn.prepare(&format!(
				"{} ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
				SELECT
			))?;
			let rows = stmt.query_map(params![limit, offset], row_to_file)?;
			for row in rows {
				files.push(row?);
			}
		}
		Ok(files)
	}

	/// All files currently sitting in `received`, oldest first — the batch
	/// processor's work queue.
	pub fn list_received(&self) -> Result<Vec<BordereauxFile>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(&format!(
			"{} WHERE status = 'received' ORDER BY created_at ASC",
			SELECT
		))?;
		let rows = stmt.query_map(params![], row_to_file)?;
		let mut files = Vec::new();
		for row in rows {
			files.push(row?);
		}
		Ok(files)
	}

	pub fn delete(&self, id: i64) -> Result<(), DatabaseError> {
		let conn = self.pool.get()?;
		conn.execute("DELETE FROM bordereaux_files WHERE id = ?1;", params![id])?;
		Ok(())
	}
}

const SELECT: &str = "SELECT id, filename, file_path, file_size, mime_type, content_hash, status,
	error_message, total_rows, processed_rows, sender, subject, received_at, proposal_path,
	created_at, updated_at, processed_at FROM bordereaux_files";

fn parse_dt(s: String) -> Result<DateTime<Utc>, rusqlite::Error> {
	DateTime::parse_from_rfc3339(&s)
		.map(|d| d.with_timezone(&Utc))
		.map_err(|_| rusqlite::Error::InvalidQuery)
}

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<BordereauxFile> {
	let status_str: String = row.get(6)?;
	let status = FileStatus::from_str(&status_str).unwrap_or(FileStatus::Failed);
	let received_at: Option<String> = row.get(12)?;
	let created_at: String = row.get(14)?;
	let updated_at: String = row.get(15)?;
	let processed_at: Option<String> = row.get(16)?;

	Ok(BordereauxFile {
		id: row.get(0)?,
		filename: row.get(1)?,
		file_path: row.get(2)?,
		file_size: row.get(3)?,
		mime_type: row.get(4)?,
		content_hash: row.get(5)?,
		status,
		error_message: row.get(7)?,
		total_rows: row.get(8)?,
		processed_rows: row.get(9)?,
		sender: row.get(10)?,
		subject: row.get(11)?,
		received_at: received_at.map(parse_dt).transpose()?,
		proposal_path: row.get(13)?,
		created_at: parse_dt(created_at)?,
		updated_at: parse_dt(updated_at)?,
		processed_at: processed_at.map(parse_dt).transpose()?,
	})
}
