//! Churn prediction service
//!
//! Serves a trained model artifact over HTTP:
//! - `GET /ping`: liveness, answers `PONG`
//! - `POST /predict`: score one JSON record
//! - `GET /model`: describe the loaded artifact

pub mod config;
pub mod errors;
pub mod server;

pub use config::{LogFormat, ServiceConfig};
pub use errors::ServiceError;
pub use server::{build_router, start_server, AppState, SharedState};
