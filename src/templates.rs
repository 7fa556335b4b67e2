//! Template registry: wraps the database-backed `db::templates::Templates`
//! repository with a JSON sidecar written alongside every row, so templates
//! stay inspectable (and editable) on disk as well as queryable in SQL.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Database, DatabaseError};
use crate::models::Template;

#[derive(Clone)]
pub struct TemplateRegistry {
	dir: PathBuf,
}

impl TemplateRegistry {
	pub fn new(dir: PathBuf) -> Self {
		Self { dir }
	}

	/// Register a new template: insert the database row first (it owns the
	/// canonical `template_id` uniqueness constraint), then write the JSON
	/// sidecar and record its path back onto the row.
	pub fn create(
		&self,
		db: &Database,
		template_id: &str,
		name: &str,
		carrier: Option<&str>,
		file_type: &str,
		column_mappings: &HashMap<String, String>,
	) -> Result<Template, TemplateError> {
		if db.templates.exists(template_id)? {
			return Err(TemplateError::AlreadyExists(template_id.to_string()));
		}

		fs::create_dir_all(&self.dir)?;
		let sidecar_path = self.sidecar_path(template_id);

		db.templates.insert(template_id, name, carrier, file_type, column_mappings, "1", Some(&sidecar_path.to_string_lossy()))?;

		let template = db.templates.get(template_id)?.ok_or_else(|| TemplateError::NotFound(template_id.to_string()))?;
		self.write_sidecar(&template)?;

		info!(template_id, "registered template");
		Ok(template)
	}

	pub fn update(
		&self,
		db: &Database,
		template_id: &str,
		name: &str,
		carrier: Option<&str>,
		file_type: &str,
		column_mappings: &HashMap<String, String>,
		active_flag: bool,
	) -> Result<Template, TemplateError> {
		db.templates.update(template_id, name, carrier, file_type, column_mappings, active_flag)?;
		let template = db.templates.get(template_id)?.ok_or_else(|| TemplateError::NotFound(template_id.to_string()))?;
		self.write_sidecar(&template)?;
		Ok(template)
	}

	/// Delete a template's database row and its JSON sidecar. A missing
	/// sidecar (already removed by hand) is not an error.
	pub fn delete(&self, db: &Database, template_id: &str) -> Result<(), TemplateError> {
		db.templates.delete(template_id)?;
		let path = self.sidecar_path(template_id);
		if path.exists() {
			fs::remove_file(path)?;
		}
		Ok(())
	}

	pub fn get(&self, db: &Database, template_id: &str) -> Result<Option<Template>, TemplateError> {
		Ok(db.templates.get(template_id)?)
	}

	pub fn list_active(&self, db: &Database, file_type: Option<&str>) -> Result<Vec<Template>, TemplateError> {
		Ok(db.templates.list_active(file_type)?)
	}

	/// Walk the template directory for `*.json` sidecars not yet present in
	/// the database and insert them. Run once at startup so templates dropped
	/// into the directory by hand are picked up without a restart-free API call.
	pub fn load_all_from_json(&self, db: &Database) -> Result<usize, TemplateError> {
		if !self.dir.exists() {
			return Ok(0);
		}

		let mut loaded = 0;
		for entry in fs::read_dir(&self.dir)? {
			let entry = entry?;
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some("json") {
				continue;
			}

			let contents = fs::read_to_string(&path)?;
			let template: Template = match serde_json::from_str(&contents) {
				Ok(t) => t,
				Err(err) => {
					warn!(?path, %err, "skipping unreadable template sidecar");
					continue;
				}
			};

			if db.templates.exists(&template.template_id)? {
				continue;
			}

			db.templates.insert(
				&template.template_id,
				&template.name,
				template.carrier.as_deref(),
				&template.file_type,
				&template.column_mappings,
				&template.version,
				Some(&path.to_string_lossy()),
			)?;
			loaded += 1;
			info!(template_id = %template.template_id, ?path, "loaded template from sidecar");
		}

		Ok(loaded)
	}

	fn sidecar_path(&self, template_id: &str) -> PathBuf {
		self.dir.join(format!("{}.json", template_id))
	}

	fn write_sidecar(&self, template: &Template) -> Result<(), TemplateError> {
		fs::create_dir_all(&self.dir)?;
		let path = self.sidecar_path(&template.template_id);
		let body = serde_json::to_string_pretty(template)?;
		fs::write(path, body)?;
		Ok(())
	}
}

impl AsRef<Path> for TemplateRegistry {
	fn as_ref(&self) -> &Path {
		&self.dir
	}
}

#[derive(Debug, Error)]
pub enum TemplateError {
	#[error("template '{0}' already exists")]
	AlreadyExists(String),
	#[error("template '{0}' not found")]
	NotFound(String),
	#[error("database error: {0}")]
	Database(#[from] DatabaseError),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn mappings() -> HashMap<String, String> {
		[("Policy Number".to_string(), "policy_number".to_string())].into_iter().collect()
	}

	#[test]
	fn create_writes_both_row_and_sidecar() {
		let dir = tempdir().unwrap();
		let db = Database::open(&dir.path().join("b.db")).unwrap();
		let registry = TemplateRegistry::new(dir.path().join("templates"));

		let template = registry.create(&db, "t1", "T1", None, "premium", &mappings()).unwrap();
		assert!(dir.path().join("templates").join("t1.json").exists());
		assert_eq!(template.template_id, "t1");
	}

	#[test]
	fn create_rejects_duplicate_id() {
		let dir = tempdir().unwrap();
		let db = Database::open(&dir.path().join("b.db")).unwrap();
		let registry = TemplateRegistry::new(dir.path().join("templates"));

		registry.create(&db, "t1", "T1", None, "premium", &mappings()).unwrap();
		let err = registry.create(&db, "t1", "T1", None, "premium", &mappings()).unwrap_err();
		assert!(matches!(err, TemplateError::AlreadyExists(_)));
	}

	#[test]
	fn load_all_from_json_seeds_unregistered_sidecars() {
		let dir = tempdir().unwrap();
		let db = Database::open(&dir.path().join("b.db")).unwrap();
		let templates_dir = dir.path().join("templates");
		fs::create_dir_all(&templates_dir).unwrap();

		let template = Template {
			id: 0,
			template_id: "seeded".to_string(),
			name: "Seeded".to_string(),
			carrier: None,
			file_type: "claims".to_string(),
			column_mappings: mappings(),
			version: "1".to_string(),
			active_flag: true,
			pattern: None,
			json_file_path: None,
			created_at: chrono::Utc::now(),
			updated_at: chrono::Utc::now(),
		};
		fs::write(templates_dir.join("seeded.json"), serde_json::to_string(&template).unwrap()).unwrap();

		let registry = TemplateRegistry::new(templates_dir);
		let loaded = registry.load_all_from_json(&db).unwrap();
		assert_eq!(loaded, 1);
		assert!(db.templates.exists("seeded").unwrap());
	}
}
