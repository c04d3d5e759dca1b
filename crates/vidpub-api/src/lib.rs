//! vidpub HTTP API
//!
//! Axum routes around the video upload pipeline: record management, the video and
//! thumbnail upload endpoints, and thumbnail serving.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
