use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::db::{Database, DatabaseError};
use crate::pipeline::{Pipeline, PipelineError};
use crate::proposal::{ProposalError, ProposalGenerator};
use crate::storage::{Storage, StorageError};
use crate::templates::{TemplateError, TemplateRegistry};

const UPLOAD_BODY_LIMIT: usize = 100 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
	pub db: Arc<Database>,
	pub storage: Arc<Storage>,
	pub pipeline: Arc<Pipeline>,
	pub templates: Arc<TemplateRegistry>,
	pub proposals: Arc<ProposalGenerator>,
}

pub fn create_api_router(state: AppState) -> Router {
	Router::new()
		.route("/health/", get(super::handlers::health::health_check))
		.route("/files/upload", post(super::handlers::files::upload_files))
		.route("/files/{id}/reprocess", post(super::handlers::files::reprocess_file))
		.route("/files/{id}/delete", delete(super::handlers::files::delete_file))
		.route("/files/api", get(super::handlers::files::list_files))
		.route("/files/{id}/api", get(super::handlers::files::get_file))
		.route("/files/{id}/errors/api", get(super::handlers::files::list_file_errors))
		.route("/mappings/", get(super::handlers::mappings::list_templates))
		.route("/mappings/upload", post(super::handlers::mappings::upload_template))
		.route("/mappings/file/{id}", get(super::handlers::mappings::get_proposal))
		.route("/mappings/file/{id}/save", post(super::handlers::mappings::save_template_from_proposal))
		.route(
			"/mappings/template/{id}/edit",
			get(super::handlers::mappings::get_template).post(super::handlers::mappings::edit_template),
		)
		.route("/mappings/template/{id}/delete", delete(super::handlers::mappings::delete_template))
		.layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

#[derive(Debug, Error)]
pub enum ServerError {
	#[error("not found: {0}")]
	NotFound(String),
	#[error("conflict: {0}")]
	Conflict(String),
	#[error("bad request: {0}")]
	BadRequest(String),
	#[error("database error: {0}")]
	Database(#[from] DatabaseError),
	#[error("storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("pipeline error: {0}")]
	Pipeline(#[from] PipelineError),
	#[error("template error: {0}")]
	Template(#[from] TemplateError),
	#[error("proposal error: {0}")]
	Proposal(#[from] ProposalError),
	#[error("multipart error: {0}")]
	Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let status = match &self {
			ServerError::NotFound(_) => StatusCode::NOT_FOUND,
			ServerError::Conflict(_) => StatusCode::CONFLICT,
			ServerError::Template(TemplateError::AlreadyExists(_)) => StatusCode::CONFLICT,
			ServerError::Template(TemplateError::NotFound(_)) => StatusCode::NOT_FOUND,
			ServerError::BadRequest(_) | ServerError::Multipart(_) => StatusCode::BAD_REQUEST,
			ServerError::Database(_) | ServerError::Storage(_) | ServerError::Pipeline(_) | ServerError::Template(_) | ServerError::Proposal(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		};
		(status, Json(json!({ "error": self.to_string() }))).into_response()
	}
}
