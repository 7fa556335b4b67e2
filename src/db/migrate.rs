use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::db::{
	DatabaseError, errors::Errors, files::Files, migrationtrait::MigrationTrait, rows::Rows,
	templates::Templates,
};

pub const CURRENT_MIGRATION_VERSION: i32 = 1;

pub fn create(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
	Files::create(pool.clone())?;
	Rows::create(pool.clone())?;
	Errors::create(pool.clone())?;
	Templates::create(pool.clone())?;
	create_schema_metadata(pool)?;
	Ok(())
}

pub fn upgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
	Files::upgrade(pool.clone())?;
	Rows::upgrade(pool.clone())?;
	Errors::upgrade(pool.clone())?;
	Templates::upgrade(pool.clone())?;
	Ok(())
}

pub fn downgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
	Errors::downgrade(pool.clone())?;
	Rows::downgrade(pool.clone())?;
	Templates::downgrade(pool.clone())?;
	Files::downgrade(pool.clone())?;
	Ok(())
}

fn create_schema_metadata(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
	let conn = pool.get()?;
	conn.execute_batch(
		"CREATE TABLE IF NOT EXISTS schema_metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
	)?;
	conn.execute(
		"INSERT OR IGNORE INTO schema_metadata (key, value) VALUES ('migration_version', ?1);",
		[CURRENT_MIGRATION_VERSION.to_string()],
	)?;
	Ok(())
}

pub fn get_migration_version(pool: &Pool<SqliteConnectionManager>) -> Result<i32, DatabaseError> {
	let conn = pool.get()?;
	let version: Option<String> = conn
		.query_row(
			"SELECT value FROM schema_metadata WHERE key = 'migration_version';",
			[],
			|row| row.get(0),
		)
		.ok();
	Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
}
