//! HTTP API Module
//!
//! Provides the REST API for file CRUD, listing and content generation.

mod http;
mod middleware;
mod types;

pub use http::{create_router, AppState, HttpServer};
pub use middleware::CORRELATION_ID_HEADER;
pub use types::{
    DetailResponse, FileWriteResponse, HealthResponse, InternalErrorResponse, ValidationDetail,
    ValidationErrorResponse,
};
