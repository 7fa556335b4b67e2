use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};
use std::collections::HashMap;

use crate::db::DatabaseError;
use crate::db::migrationtrait::MigrationTrait;
use crate::models::Template;

pub struct Templates {
	pool: Pool<SqliteConnectionManager>,
}

impl MigrationTrait for Templates {
	fn create(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		let conn = pool.get()?;
		conn.execute_batch(
			"CREATE TABLE IF NOT EXISTS templates (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				template_id TEXT NOT NULL UNIQUE,
				name TEXT NOT NULL,
				carrier TEXT,
				file_type TEXT NOT NULL,
				column_mappings TEXT NOT NULL,
				version TEXT NOT NULL DEFAULT '1',
				active_flag INTEGER NOT NULL DEFAULT 1,
				pattern TEXT,
				json_file_path TEXT,
				created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
				updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
			);",
		)?;
		Ok(())
	}

	fn upgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		Self::create(pool)
	}

	fn downgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		let conn = pool.get()?;
		conn.execute_batch("DROP TABLE IF EXISTS templates;")?;
		Ok(())
	}
}

impl Templates {
	pub fn new(pool: Pool<SqliteConnectionManager>) -> Self {
		Self { pool }
	}

	pub fn exists(&self, template_id: &str) -> Result<bool, DatabaseError> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare("SELECT 1 FROM templates WHERE template_id = ?1;")?;
		Ok(stmt.exists(params![template_id])?)
	}

	pub fn insert(
		&self,
		template_id: &str,
		name: &str,
		carrier: Option<&str>,
		file_type: &str,
		column_mappings: &HashMap<String, String>,
		version: &str,
		json_file_path: Option<&str>,
	) -> Result<i64, DatabaseError> {
		let conn = self.pool.get()?;
		let now = Utc::now().to_rfc3339();
		conn.execute(
			"INSERT INTO templates (template_id, name, carrier, file_type, column_mappings, version, active_flag, json_file_path, created_at, updated_at)
			VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?8);",
			params![
				template_id,
				name,
				carrier,
				file_type,
				serde_json::to_string(column_mappings).unwrap_or_default(),
				version,
				json_file_path,
				now,
			],
		)?;
		Ok(conn.last_insert_rowid())
	}

	pub fn update(
		&self,
		template_id: &str,
		name: &str,
		carrier: Option<&str>,
		file_type: &str,
		column_mappings: &HashMap<String, String>,
		active_flag: bool,
	) -> Result<(), DatabaseError> {
		let conn = self.pool.get()?;
		conn.execute(
			"UPDATE templates SET name = ?1, carrier = ?2, file_type = ?3, column_mappings = ?4,
				active_flag = ?5, updated_at = ?6
			WHERE template_id = ?7;",
			params![
				name,
				carrier,
				file_type,
				serde_json::to_string(column_mappings).unwrap_or_default(),
				active_flag,
				Utc::now().to_rfc3339(),
				template_id,
			],
		)?;
		Ok(())
	}

	pub fn delete(&self, template_id: &str) -> Result<(), DatabaseError> {
		let conn = self.pool.get()?;
		conn.execute("DELETE FROM templates WHERE template_id = ?1;", params![template_id])?;
		Ok(())
	}

	pub fn get(&self, template_id: &str) -> Result<Option<Template>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(&format!("{} WHERE template_id = ?1", SELECT))?;
		Ok(stmt.query_row(params![template_id], row_to_template).optional()?)
	}

	pub fn list_active(&self, file_type: Option<&str>) -> Result<Vec<Template>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut out = Vec::new();
		if let Some(file_type) = file_type {
			let mut stmt = conn.prepare(&format!(
				"{} WHERE active_flag = 1 AND file_type = ?1 ORDER BY created_at ASC",
				SELECT
			))?;
			let rows = stmt.query_map(params![file_type], row_to_template)?;
			for row in rows {
				out.push(row?);
			}
		} else {
			let mut stmt = conn.prepare(&format!("{} WHERE active_flag = 1 ORDER BY created_at ASC", SELECT))?;
			let rows = stmt.query_map(params![], row_to_template)?;
			for row in rows {
				out.push(row?);
			}
		}
		Ok(out)
	}

	pub fn list_all(&self) -> Result<Vec<Template>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(&format!("{} ORDER BY created_at ASC", SELECT))?;
		let rows = stmt.query_map(params![], row_to_template)?;
		let mut out = Vec::new();
		for row in rows {
			out.push(row?);
		}
		Ok(out)
	}
}

const SELECT: &str = "SELECT id, template_id, name, carrier, file_type, column_mappings, version,
	active_flag, pattern, json_file_path, created_at, updated_at FROM templates";

fn row_to_template(row: &rusqlite::Row) -> rusqlite::Result<Template> {
	let column_mappings_str: String = row.get(5)?;
	let pattern_str: Option<String> = row.get(8)?;
	let created_at: String = row.get(10)?;
	let updated_at: String = row.get(11)?;

	Ok(Template {
		id: row.get(0)?,
		template_id: row.get(1)?,
		name: row.get(2)?,
		carrier: row.get(3)?,
		file_type: row.get(4)?,
		column_mappings: serde_json::from_str(&column_mappings_str).unwrap_or_default(),
		version: row.get(6)?,
		active_flag: row.get::<_, i64>(7)? != 0,
		pattern: pattern_str.and_then(|s| serde_json::from_str(&s).ok()),
		json_file_path: row.get(9)?,
		created_at: DateTime::parse_from_rfc3339(&created_at)
			.map(|d| d.with_timezone(&Utc))
			.map_err(|_| rusqlite::Error::InvalidQuery)?,
		updated_at: DateTime::parse_from_rfc3339(&updated_at)
			.map(|d| d.with_timezone(&Utc))
			.map_err(|_| rusqlite::Error::InvalidQuery)?,
	})
}
