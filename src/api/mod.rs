//! HTTP surface: a thin JSON/multipart shell over the pipeline, storage, and
//! template orchestrators.

mod handlers;
mod server;

pub use server::{create_api_router, AppState, ServerError};
