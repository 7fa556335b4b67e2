use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::db::DatabaseError;
use crate::db::migrationtrait::MigrationTrait;
use crate::models::ValidationErrorRecord;
use crate::validation::RowError;

pub struct Errors {
	pool: Pool<SqliteConnectionManager>,
}

impl MigrationTrait for Errors {
	fn create(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		let conn = pool.get()?;
		conn.execute_batch(
			"CREATE TABLE IF NOT EXISTS validation_errors (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				file_id INTEGER NOT NULL REFERENCES bordereaux_files(id) ON DELETE CASCADE,
				row_index INTEGER NOT NULL,
				error_code TEXT NOT NULL,
				error_message TEXT NOT NULL,
				field_name TEXT,
				field_value TEXT,
				rule_name TEXT NOT NULL,
				created_at DATETIME DEFAULT CURRENT_TIMESTAMP
			);
			CREATE INDEX IF NOT EXISTS idx_validation_errors_file_id ON validation_errors(file_id);",
		)?;
		Ok(())
	}

	fn upgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		Self::create(pool)
	}

	fn downgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		let conn = pool.get()?;
		conn.execute_batch("DROP TABLE IF EXISTS validation_errors;")?;
		Ok(())
	}
}

impl Errors {
	pub fn new(pool: Pool<SqliteConnectionManager>) -> Self {
		Self { pool }
	}

	pub fn clear_for_file(&self, file_id: i64) -> Result<(), DatabaseError> {
		let conn = self.pool.get()?;
		conn.execute("DELETE FROM validation_errors WHERE file_id = ?1;", params![file_id])?;
		Ok(())
	}

	pub fn insert_all(&self, file_id: i64, errors: &[RowError]) -> Result<(), DatabaseError> {
		let mut conn = self.pool.get()?;
		let tx = conn.transaction()?;
		{
			let mut stmt = tx.prepare(
				"INSERT INTO validation_errors
					(file_id, row_index, error_code, error_message, field_name, field_value, rule_name, created_at)
				VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
			)?;
			for error in errors {
				stmt.execute(params![
					file_id,
					error.row_index,
					error.error_code,
					error.error_message,
					error.field_name,
					error.field_value,
					error.rule_name,
					Utc::now().to_rfc3339(),
				])?;
			}
		}
		tx.commit()?;
		Ok(())
	}

	pub fn list_for_file(&self, file_id: i64) -> Result<Vec<ValidationErrorRecord>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT id, file_id, row_index, error_code, error_message, field_name, field_value, rule_name, created_at
			FROM validation_errors WHERE file_id = ?1 ORDER BY row_index ASC;",
		)?;
		let rows = stmt.query_map(params![file_id], |row| {
			let created_at: String = row.get(8)?;
			Ok(ValidationErrorRecord {
				id: row.get(0)?,
				file_id: row.get(1)?,
				row_index: row.get(2)?,
				error_code: row.get(3)?,
				error_message: row.get(4)?,
				field_name: row.get(5)?,
				field_value: row.get(6)?,
				rule_name: row.get(7)?,
				created_at: DateTime::parse_from_rfc3339(&created_at)
					.map(|d| d.with_timezone(&Utc))
					.map_err(|_| rusqlite::Error::InvalidQuery)?,
			})
		})?;
		let mut out = Vec::new();
		for row in rows {
			out.push(row?);
		}
		Ok(out)
	}
}
