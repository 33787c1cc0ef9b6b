//! Webhook server for the notification dispatch pipeline.
//!
//! Endpoints:
//! - POST /notifications (and /): database webhook, one inserted row per call
//! - GET  /health: liveness probe

pub mod middleware;
pub mod routes;
pub mod state;
