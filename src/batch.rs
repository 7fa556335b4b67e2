//! Drains every file sitting in `received` through the pipeline. A single
//! file's failure is logged and counted, never aborts the batch.

use tracing::{error, info};

use crate::db::Database;
use crate::models::FileStatus;
use crate::pipeline::Pipeline;

#[derive(Debug, Default)]
pub struct BatchResult {
	pub processed_count: usize,
	pub success_count: usize,
	pub failed_count: usize,
	pub new_template_count: usize,
}

/// Process every `received` file once, in oldest-first order.
pub async fn process_new_files(db: &Database, pipeline: &Pipeline) -> Result<BatchResult, crate::db::DatabaseError> {
	let files = db.files.list_received()?;
	if files.is_empty() {
		info!("no unprocessed files found");
		return Ok(BatchResult::default());
	}

	info!(file_count = files.len(), "processing new files batch started");
	let mut result = BatchResult::default();

	for file in files {
		result.processed_count += 1;
		match pipeline.process_file(db, file.id).await {
			Ok(outcome) => {
				result.success_count += 1;
				if outcome.status == FileStatus::NewTemplateRequired {
					result.new_template_count += 1;
				}
				info!(file_id = file.id, status = outcome.status.as_str(), "file processed");
			}
			Err(err) => {
				result.failed_count += 1;
				error!(file_id = file.id, filename = %file.filename, %err, "file processing failed");
			}
		}
	}

	info!(
		processed = result.processed_count,
		success = result.success_count,
		failed = result.failed_count,
		new_template = result.new_template_count,
		"processing new files batch completed"
	);

	Ok(result)
}
