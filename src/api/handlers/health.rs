use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
	Json(json!({
		"status": "healthy",
		"timestamp": Utc::now().to_rfc3339(),
		"service": "bordereaux-api",
	}))
}
