use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::server::{AppState, ServerError};
use crate::models::{BordereauxFile, FileStatus, ValidationErrorRecord};

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
	pub status: Option<String>,
	#[serde(default = "default_limit")]
	pub limit: i64,
	#[serde(default)]
	pub offset: i64,
}

fn default_limit() -> i64 {
	50
}

fn file_to_json(file: &BordereauxFile) -> Value {
	json!({
		"id": file.id,
		"filename": file.filename,
		"file_size": file.file_size,
		"mime_type": file.mime_type,
		"content_hash": file.content_hash,
		"status": file.status.as_str(),
		"error_message": file.error_message,
		"total_rows": file.total_rows,
		"processed_rows": file.processed_rows,
		"sender": file.sender,
		"subject": file.subject,
		"received_at": file.received_at.map(|d| d.to_rfc3339()),
		"proposal_path": file.proposal_path,
		"created_at": file.created_at.to_rfc3339(),
		"updated_at": file.updated_at.to_rfc3339(),
		"processed_at": file.processed_at.map(|d| d.to_rfc3339()),
	})
}

fn error_to_json(error: &ValidationErrorRecord) -> Value {
	json!({
		"row_index": error.row_index,
		"error_code": error.error_code,
		"error_message": error.error_message,
		"field_name": error.field_name,
		"field_value": error.field_value,
		"rule_name": error.rule_name,
	})
}

/// Accept one or many multipart file parts, save each, then run the
/// pipeline synchronously for every newly stored file.
pub async fn upload_files(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<Value>, ServerError> {
	let mut results = Vec::new();

	while let Some(field) = multipart.next_field().await? {
		let filename = field.file_name().unwrap_or("upload").to_string();
		let content_type = field.content_type().map(|c| c.to_string());
		let bytes = field.bytes().await?;

		let outcome = state.storage.save(&state.db, &bytes, &filename, content_type.as_deref(), None, None, None)?;
		let processed = state.pipeline.process_file(&state.db, outcome.file_id).await?;

		results.push(json!({
			"file_id": outcome.file_id,
			"filename": filename,
			"is_duplicate": outcome.is_duplicate,
			"status": processed.status.as_str(),
			"total_rows": processed.total_rows,
			"valid_rows": processed.valid_rows,
			"error_rows": processed.error_rows,
		}));
	}

	Ok(Json(json!({ "files": results })))
}

pub async fn reprocess_file(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, ServerError> {
	let outcome = state.pipeline.process_file(&state.db, id).await?;
	Ok(Json(json!({
		"file_id": outcome.file_id,
		"status": outcome.status.as_str(),
		"total_rows": outcome.total_rows,
		"valid_rows": outcome.valid_rows,
		"error_rows": outcome.error_rows,
	})))
}

pub async fn delete_file(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, ServerError> {
	let file = state.db.files.get(id)?.ok_or_else(|| ServerError::NotFound(format!("file {id}")))?;
	state.storage.delete(&state.db, &file)?;
	Ok(Json(json!({ "deleted": true, "file_id": id })))
}

pub async fn list_files(State(state): State<AppState>, Query(params): Query<ListFilesParams>) -> Result<Json<Value>, ServerError> {
	let status = match params.status {
		Some(s) => Some(FileStatus::from_str(&s).ok_or_else(|| ServerError::BadRequest(format!("unknown status '{s}'")))?),
		None => None,
	};
	let files = state.db.files.list(status, params.limit, params.offset)?;
	Ok(Json(json!({ "files": files.iter().map(file_to_json).collect::<Vec<_>>() })))
}

pub async fn get_file(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, ServerError> {
	let file = state.db.files.get(id)?.ok_or_else(|| ServerError::NotFound(format!("file {id}")))?;
	Ok(Json(file_to_json(&file)))
}

pub async fn list_file_errors(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, ServerError> {
	let errors = state.db.errors.list_for_file(id)?;
	Ok(Json(json!({ "file_id": id, "errors": errors.iter().map(error_to_json).collect::<Vec<_>>() })))
}
