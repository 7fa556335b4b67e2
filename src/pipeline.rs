//! Orchestrates a single file through parse → match → map → validate →
//! persist, driving the `FileStatus` state machine. Processing for a given
//! file id is serialized so a mailbox poll and a manual reprocess request
//! can never race on the same row set.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

use crate::db::{Database, DatabaseError};
use crate::llm::OpenRouterClient;
use crate::matching::find_matching_template;
use crate::mapping::map_to_canonical;
use crate::models::{BordereauxFileType, FileStatus, ProposalMetadata};
use crate::normalize::normalize_column_name;
use crate::parsing::{self, ParseError};
use crate::proposal::{ProposalError, ProposalGenerator};
use crate::templates::{TemplateError, TemplateRegistry};
use crate::validation::{self, RuleDocument};

pub struct Pipeline {
	templates: TemplateRegistry,
	proposals: ProposalGenerator,
	rules: RuleDocument,
	llm_client: Option<OpenRouterClient>,
	locks: StdMutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

#[derive(Debug)]
pub struct PipelineOutcome {
	pub file_id: i64,
	pub status: FileStatus,
	pub total_rows: i64,
	pub valid_rows: i64,
	pub error_rows: i64,
}

impl Pipeline {
	pub fn new(templates: TemplateRegistry, proposals: ProposalGenerator, rules: RuleDocument, llm_client: Option<OpenRouterClient>) -> Self {
		Self {
			templates,
			proposals,
			rules,
			llm_client,
			locks: StdMutex::new(HashMap::new()),
		}
	}

	fn lock_for(&self, file_id: i64) -> Arc<AsyncMutex<()>> {
		self.locks.lock().unwrap().entry(file_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	/// Run the full pipeline for `file_id`. Acquires the per-file lock for
	/// the duration, so a concurrent call for the same id waits rather than
	/// interleaving.
	pub async fn process_file(&self, db: &Database, file_id: i64) -> Result<PipelineOutcome, PipelineError> {
		let lock = self.lock_for(file_id);
		let _guard = lock.lock().await;

		let file = db.files.get(file_id)?.ok_or(PipelineError::FileNotFound(file_id))?;

		info!(file_id, filename = %file.filename, "pipeline started");
		db.files.set_status(file_id, FileStatus::Processing, None)?;

		let bytes = match std::fs::read(&file.file_path) {
			Ok(bytes) => bytes,
			Err(err) => {
				let msg = format!("error reading stored file: {err}");
				error!(file_id, %msg, "pipeline failed");
				db.files.set_status(file_id, FileStatus::Failed, Some(&msg))?;
				return Err(PipelineError::Io(err));
			}
		};

		let table = match parsing::parse_file(&bytes, &file.filename, None) {
			Ok(table) => table,
			Err(err) => {
				let msg = format!("error parsing file: {err}");
				error!(file_id, %msg, "pipeline failed");
				db.files.set_status(file_id, FileStatus::Failed, Some(&msg))?;
				return Err(PipelineError::Parse(err));
			}
		};

		let file_type = file.subject.as_deref().and_then(BordereauxFileType::infer_from_subject);
		let templates = db.templates.list_active(file_type.as_ref().map(|t| t.as_str()))?;
		let normalized_headers: Vec<String> = table.headers.iter().map(|h| normalize_column_name(h)).collect();
		let template = find_matching_template(&normalized_headers, &templates).cloned();

		let Some(template) = template else {
			warn!(file_id, header_count = table.headers.len(), "no matching template, generating mapping proposal");
			return self.generate_proposal(db, file_id, &file, &table).await;
		};

		info!(file_id, template_id = %template.template_id, "template matched");

		let canonical_rows = map_to_canonical(&table, &template);
		let total_rows = canonical_rows.len() as i64;
		let (valid_rows, errors) = validation::validate_rows(&canonical_rows, &self.rules);
		let valid_count = valid_rows.len() as i64;
		let error_count = errors.len() as i64;

		db.rows.clear_for_file(file_id)?;
		db.rows.insert_all(file_id, &valid_rows)?;
		db.errors.clear_for_file(file_id)?;
		db.errors.insert_all(file_id, &errors)?;

		let status = if error_count == 0 { FileStatus::ProcessedOk } else { FileStatus::ProcessedWithErrors };
		let error_message = (error_count > 0).then(|| format!("processed with {error_count} validation errors"));
		db.files.update_processing_stats(file_id, total_rows, valid_count, status, error_message.as_deref())?;

		info!(file_id, total_rows, valid_rows = valid_count, error_rows = error_count, status = status.as_str(), "pipeline completed");

		Ok(PipelineOutcome {
			file_id,
			status,
			total_rows,
			valid_rows: valid_count,
			error_rows: error_count,
		})
	}

	async fn generate_proposal(
		&self,
		db: &Database,
		file_id: i64,
		file: &crate::models::BordereauxFile,
		table: &parsing::ParsedTable,
	) -> Result<PipelineOutcome, PipelineError> {
		let metadata = ProposalMetadata {
			filename: Some(file.filename.clone()),
			sender: file.sender.clone(),
			subject: file.subject.clone(),
		};

		match self.proposals.generate(file_id, &table.headers, metadata, self.llm_client.as_ref()).await {
			Ok((path, proposal)) => {
				db.files.set_proposal_path(file_id, &path.to_string_lossy())?;
				db.files.set_status(file_id, FileStatus::NewTemplateRequired, None)?;
				info!(file_id, mapped = proposal.column_mappings.len(), "mapping proposal generated");
				Ok(PipelineOutcome {
					file_id,
					status: FileStatus::NewTemplateRequired,
					total_rows: table.rows.len() as i64,
					valid_rows: 0,
					error_rows: 0,
				})
			}
			Err(err) => {
				let msg = format!("error generating mapping proposal: {err}");
				error!(file_id, %msg, "pipeline failed");
				db.files.set_status(file_id, FileStatus::Failed, Some(&msg))?;
				Err(PipelineError::Proposal(err))
			}
		}
	}

	pub async fn reload_templates(&self, db: &Database) -> Result<usize, TemplateError> {
		self.templates.load_all_from_json(db)
	}
}

impl AsRef<Path> for Pipeline {
	fn as_ref(&self) -> &Path {
		self.templates.as_ref()
	}
}

#[derive(Debug, Error)]
pub enum PipelineError {
	#[error("file {0} not found")]
	FileNotFound(i64),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("parse error: {0}")]
	Parse(#[from] ParseError),
	#[error("proposal generation error: {0}")]
	Proposal(#[from] ProposalError),
	#[error("database error: {0}")]
	Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::Storage;
	use std::collections::HashMap as StdHashMap;
	use tempfile::tempdir;

	fn pipeline(dir: &Path) -> Pipeline {
		let templates = TemplateRegistry::new(dir.join("templates"));
		let proposals = ProposalGenerator::new(dir.join("templates/proposals"), None);
		Pipeline::new(templates, proposals, RuleDocument::default(), None)
	}

	#[tokio::test]
	async fn matched_template_produces_processed_ok() {
		let dir = tempdir().unwrap();
		let db = Database::open(&dir.path().join("b.db")).unwrap();
		let storage = Storage::new(dir.path().join("store"));
		let pipeline = pipeline(dir.path());

		let mappings: StdHashMap<String, String> =
			[("policy_number".to_string(), "policy_number".to_string()), ("premium".to_string(), "premium_amount".to_string())]
				.into_iter()
				.collect();
		pipeline.templates.create(&db, "t1", "T1", None, "premium", &mappings).unwrap();

		let csv = b"policy_number,premium\nPOL1,100\n";
		let outcome = storage.save(&db, csv, "file.csv", None, None, None, None).unwrap();

		let result = pipeline.process_file(&db, outcome.file_id).await.unwrap();
		assert_eq!(result.status, FileStatus::ProcessedOk);
		assert_eq!(result.valid_rows, 1);
	}

	#[tokio::test]
	async fn unmatched_headers_requires_new_template() {
		let dir = tempdir().unwrap();
		let db = Database::open(&dir.path().join("b.db")).unwrap();
		let storage = Storage::new(dir.path().join("store"));
		let pipeline = pipeline(dir.path());

		let csv = b"mystery_col,another_col\nvalue1,value2\n";
		let outcome = storage.save(&db, csv, "file.csv", None, None, None, None).unwrap();

		let result = pipeline.process_file(&db, outcome.file_id).await.unwrap();
		assert_eq!(result.status, FileStatus::NewTemplateRequired);

		let file = db.files.get(outcome.file_id).unwrap().unwrap();
		assert!(file.proposal_path.is_some());
	}
}
