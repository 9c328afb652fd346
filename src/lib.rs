//! Job Orchestrator
//!
//! An in-memory job queue whose jobs are run, on request, through an ordered
//! pipeline of named steps looked up in a step registry. Exposed over HTTP
//! with axum.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

pub use app_state::AppState;
pub use routes::build_router;
