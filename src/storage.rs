//! Content-addressed file storage: hashes bytes, deduplicates against the
//! database, and writes the raw file to disk exactly once per distinct content.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::db::{Database, DatabaseError};
use crate::models::{BordereauxFile, FileStatus};
use crate::util::Hash;

pub struct Storage {
	base_path: PathBuf,
}

pub struct SaveOutcome {
	pub file_id: i64,
	pub status: FileStatus,
	pub is_duplicate: bool,
}

impl Storage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Save raw bytes for a file that arrived from mail or upload.
	///
	/// Hashes first: if a file with the same content already exists, no
	/// bytes are written and the existing file's id is returned.
	pub fn save(
		&self,
		db: &Database,
		bytes: &[u8],
		filename: &str,
		mime_type: Option<&str>,
		sender: Option<&str>,
		subject: Option<&str>,
		received_at: Option<DateTime<Utc>>,
	) -> Result<SaveOutcome, StorageError> {
		let content_hash = Hash::calculate_sha256(&mut Cursor::new(bytes))?;

		if let Some(existing) = db.files.find_by_hash(&content_hash)? {
			return Ok(SaveOutcome {
				file_id: existing.id,
				status: existing.status,
				is_duplicate: true,
			});
		}

		std::fs::create_dir_all(&self.base_path)?;
		let stored_name = self.storage_filename(&content_hash, filename);
		let dest = self.base_path.join(&stored_name);
		std::fs::write(&dest, bytes)?;

		let file_id = db.files.insert(
			filename,
			dest.to_string_lossy().as_ref(),
			bytes.len() as i64,
			mime_type,
			&content_hash,
			sender,
			subject,
			received_at.or_else(|| Some(Utc::now())),
		)?;
		db.files.set_status(file_id, FileStatus::Received, None)?;

		info!(file_id, filename, content_hash, "stored new bordereaux file");

		Ok(SaveOutcome {
			file_id,
			status: FileStatus::Received,
			is_duplicate: false,
		})
	}

	/// Delete a file's bytes from disk (tolerating an absent file) and its
	/// database row (cascading rows/errors).
	pub fn delete(&self, db: &Database, file: &BordereauxFile) -> Result<(), StorageError> {
		let path = Path::new(&file.file_path);
		if path.exists() {
			std::fs::remove_file(path)?;
		}
		db.files.delete(file.id)?;
		Ok(())
	}

	fn storage_filename(&self, content_hash: &str, original: &str) -> String {
		let sanitized: String = original
			.chars()
			.map(|c| if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
			.collect();
		let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.f");
		format!("{}_{}_{}", &content_hash[..8.min(content_hash.len())], timestamp, sanitized)
	}
}

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("hashing error: {0}")]
	Hash(#[from] crate::util::HashError),
	#[error("database error: {0}")]
	Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn open_db(dir: &Path) -> Database {
		Database::open(&dir.join("bordereaux.db")).expect("open db")
	}

	#[test]
	fn saving_the_same_bytes_twice_deduplicates() {
		let dir = tempdir().unwrap();
		let db = open_db(dir.path());
		let storage = Storage::new(dir.path().join("store"));

		let first = storage
			.save(&db, b"hello world", "a.csv", None, None, None, None)
			.unwrap();
		assert!(!first.is_duplicate);

		let second = storage
			.save(&db, b"hello world", "a.csv", None, None, None, None)
			.unwrap();
		assert!(second.is_duplicate);
		assert_eq!(first.file_id, second.file_id);

		let entries: Vec<_> = std::fs::read_dir(dir.path().join("store")).unwrap().collect();
		assert_eq!(entries.len(), 1);
	}

	#[test]
	fn delete_removes_bytes_and_row() {
		let dir = tempdir().unwrap();
		let db = open_db(dir.path());
		let storage = Storage::new(dir.path().join("store"));

		let outcome = storage
			.save(&db, b"content", "a.csv", None, None, None, None)
			.unwrap();
		let file = db.files.get(outcome.file_id).unwrap().unwrap();
		storage.delete(&db, &file).unwrap();

		assert!(db.files.get(outcome.file_id).unwrap().is_none());
		assert!(!Path::new(&file.file_path).exists());
	}
}
