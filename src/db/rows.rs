use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::db::DatabaseError;
use crate::db::migrationtrait::MigrationTrait;
use crate::models::{BordereauxRow, CanonicalRow};
use crate::normalize::Currency;

pub struct Rows {
	pool: Pool<SqliteConnectionManager>,
}

impl MigrationTrait for Rows {
	fn create(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		let conn = pool.get()?;
		conn.execute_batch(
			"CREATE TABLE IF NOT EXISTS bordereaux_rows (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				file_id INTEGER NOT NULL REFERENCES bordereaux_files(id) ON DELETE CASCADE,
				policy_number TEXT,
				insured_name TEXT,
				inception_date TEXT,
				expiry_date TEXT,
				premium_amount TEXT,
				currency TEXT,
				claim_amount TEXT,
				commission_amount TEXT,
				net_premium TEXT,
				broker_name TEXT,
				product_type TEXT,
				coverage_type TEXT,
				risk_location TEXT,
				row_number INTEGER NOT NULL,
				raw_data TEXT NOT NULL,
				created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
				updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
			);
			CREATE INDEX IF NOT EXISTS idx_bordereaux_rows_file_id ON bordereaux_rows(file_id);",
		)?;
		Ok(())
	}

	fn upgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		Self::create(pool)
	}

	fn downgrade(pool: Pool<SqliteConnectionManager>) -> Result<(), DatabaseError> {
		let conn = pool.get()?;
		conn.execute_batch("DROP TABLE IF EXISTS bordereaux_rows;")?;
		Ok(())
	}
}

impl Rows {
	pub fn new(pool: Pool<SqliteConnectionManager>) -> Self {
		Self { pool }
	}

	pub fn clear_for_file(&self, file_id: i64) -> Result<(), DatabaseError> {
		let conn = self.pool.get()?;
		conn.execute("DELETE FROM bordereaux_rows WHERE file_id = ?1;", params![file_id])?;
		Ok(())
	}

	/// Insert every row in one transaction; rolls back entirely on failure.
	pub fn insert_all(&self, file_id: i64, rows: &[CanonicalRow]) -> Result<(), DatabaseError> {
		let mut conn = self.pool.get()?;
		let tx = conn.transaction()?;
		{
			let mut stmt = tx.prepare(
				"INSERT INTO bordereaux_rows
					(file_id, policy_number, insured_name, inception_date, expiry_date, premium_amount,
					 currency, claim_amount, commission_amount, net_premium, broker_name, product_type,
					 coverage_type, risk_location, row_number, raw_data, created_at, updated_at)
				VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17);",
			)?;
			for row in rows {
				let now = Utc::now().to_rfc3339();
				stmt.execute(params![
					file_id,
					row.policy_number,
					row.insured_name,
					row.inception_date.map(|d| d.to_string()),
					row.expiry_date.map(|d| d.to_string()),
					row.premium_amount.map(|d| d.to_string()),
					row.currency.map(|c| c.code().to_string()),
					row.claim_amount.map(|d| d.to_string()),
					row.commission_amount.map(|d| d.to_string()),
					row.net_premium.map(|d| d.to_string()),
					row.broker_name,
					row.product_type,
					row.coverage_type,
					row.risk_location,
					row.row_number,
					row.raw_data.to_string(),
					now,
				])?;
			}
		}
		tx.commit()?;
		Ok(())
	}

	pub fn list_for_file(&self, file_id: i64) -> Result<Vec<BordereauxRow>, DatabaseError> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT id, file_id, policy_number, insured_name, inception_date, expiry_date, premium_amount,
				currency, claim_amount, commission_amount, net_premium, broker_name, product_type,
				coverage_type, risk_location, row_number, raw_data, created_at, updated_at
			FROM bordereaux_rows WHERE file_id = ?1 ORDER BY row_number ASC;",
		)?;
		let rows = stmt.query_map(params![file_id], row_to_bordereaux_row)?;
		let mut out = Vec::new();
		for row in rows {
			out.push(row?);
		}
		Ok(out)
	}
}

fn parse_dt(s: String) -> Result<DateTime<Utc>, rusqlite::Error> {
	DateTime::parse_from_rfc3339(&s)
		.map(|d| d.with_timezone(&Utc))
		.map_err(|_| rusqlite::Error::InvalidQuery)
}

fn row_to_bordereaux_row(row: &rusqlite::Row) -> rusqlite::Result<BordereauxRow> {
	let inception: Option<String> = row.get(4)?;
	let expiry: Option<String> = row.get(5)?;
	let premium: Option<String> = row.get(6)?;
	let currency: Option<String> = row.get(7)?;
	let claim: Option<String> = row.get(8)?;
	let commission: Option<String> = row.get(9)?;
	let net_premium: Option<String> = row.get(10)?;
	let raw_data: String = row.get(16)?;
	let created_at: String = row.get(17)?;
	let updated_at: String = row.get(18)?;

	Ok(BordereauxRow {
		id: row.get(0)?,
		file_id: row.get(1)?,
		policy_number: row.get(2)?,
		insured_name: row.get(3)?,
		inception_date: inception.and_then(|d| d.parse().ok()),
		expiry_date: expiry.and_then(|d| d.parse().ok()),
		premium_amount: premium.and_then(|d| d.parse().ok()),
		currency: currency.and_then(|c| currency_from_code(&c)),
		claim_amount: claim.and_then(|d| d.parse().ok()),
		commission_amount: commission.and_then(|d| d.parse().ok()),
		net_premium: net_premium.and_then(|d| d.parse().ok()),
		broker_name: row.get(11)?,
		product_type: row.get(12)?,
		coverage_type: row.get(13)?,
		risk_location: row.get(14)?,
		row_number: row.get(15)?,
		raw_data: serde_json::from_str(&raw_data).unwrap_or(serde_json::Value::Null),
		created_at: parse_dt(created_at)?,
		updated_at: parse_dt(updated_at)?,
	})
}

fn currency_from_code(code: &str) -> Option<Currency> {
	crate::normalize::normalize_currency(code)
}
