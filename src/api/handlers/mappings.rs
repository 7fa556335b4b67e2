use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::server::{AppState, ServerError};
use crate::models::{FileStatus, MappingProposal, Template};

fn template_to_json(template: &Template) -> Value {
	json!({
		"template_id": template.template_id,
		"name": template.name,
		"carrier": template.carrier,
		"file_type": template.file_type,
		"column_mappings": template.column_mappings,
		"version": template.version,
		"active_flag": template.active_flag,
		"created_at": template.created_at.to_rfc3339(),
		"updated_at": template.updated_at.to_rfc3339(),
	})
}

pub async fn list_templates(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
	let templates = state.templates.list_active(&state.db, None)?;
	Ok(Json(json!({ "templates": templates.iter().map(template_to_json).collect::<Vec<_>>() })))
}

#[derive(Debug, Deserialize)]
pub struct UploadTemplateRequest {
	pub template_id: String,
	pub name: String,
	pub carrier: Option<String>,
	pub file_type: String,
	pub column_mappings: HashMap<String, String>,
}

pub async fn upload_template(State(state): State<AppState>, Json(req): Json<UploadTemplateRequest>) -> Result<Json<Value>, ServerError> {
	let template = state
		.templates
		.create(&state.db, &req.template_id, &req.name, req.carrier.as_deref(), &req.file_type, &req.column_mappings)?;
	Ok(Json(template_to_json(&template)))
}

pub async fn get_proposal(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<MappingProposal>, ServerError> {
	let file = state.db.files.get(id)?.ok_or_else(|| ServerError::NotFound(format!("file {id}")))?;
	if file.status != FileStatus::NewTemplateRequired {
		return Err(ServerError::BadRequest(format!("file {id} is not awaiting a new template")));
	}
	let path = file.proposal_path.ok_or_else(|| ServerError::NotFound(format!("no proposal recorded for file {id}")))?;
	let contents = std::fs::read_to_string(&path).map_err(|err| ServerError::BadRequest(format!("could not read proposal: {err}")))?;
	let proposal: MappingProposal = serde_json::from_str(&contents).map_err(|err| ServerError::BadRequest(format!("corrupt proposal: {err}")))?;
	Ok(Json(proposal))
}

#[derive(Debug, Deserialize)]
pub struct SaveTemplateRequest {
	pub template_id: String,
	pub name: String,
	pub carrier: Option<String>,
	pub file_type: String,
	pub column_mappings: HashMap<String, String>,
}

/// Promote an edited proposal into a registered template, then reprocess the
/// originating file against it.
pub async fn save_template_from_proposal(
	State(state): State<AppState>,
	Path(id): Path<i64>,
	Json(req): Json<SaveTemplateRequest>,
) -> Result<Json<Value>, ServerError> {
	state
		.templates
		.create(&state.db, &req.template_id, &req.name, req.carrier.as_deref(), &req.file_type, &req.column_mappings)?;
	let outcome = state.pipeline.process_file(&state.db, id).await?;
	Ok(Json(json!({
		"template_id": req.template_id,
		"file_id": outcome.file_id,
		"status": outcome.status.as_str(),
	})))
}

pub async fn get_template(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ServerError> {
	let template = state.templates.get(&state.db, &id)?.ok_or_else(|| ServerError::NotFound(format!("template {id}")))?;
	Ok(Json(template_to_json(&template)))
}

#[derive(Debug, Deserialize)]
pub struct EditTemplateRequest {
	pub name: String,
	pub carrier: Option<String>,
	pub file_type: String,
	pub column_mappings: HashMap<String, String>,
	#[serde(default = "default_active")]
	pub active_flag: bool,
}

fn default_active() -> bool {
	true
}

pub async fn edit_template(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(req): Json<EditTemplateRequest>,
) -> Result<Json<Value>, ServerError> {
	let template = state
		.templates
		.update(&state.db, &id, &req.name, req.carrier.as_deref(), &req.file_type, &req.column_mappings, req.active_flag)?;
	Ok(Json(template_to_json(&template)))
}

pub async fn delete_template(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ServerError> {
	state.templates.delete(&state.db, &id)?;
	Ok(Json(json!({ "deleted": true, "template_id": id })))
}
