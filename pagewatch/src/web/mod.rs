//! Web server module for the audit endpoint.
//!
//! This module provides a thin web server that:
//! - Classifies requests as scheduled checks or deployment webhooks
//! - Verifies webhook signatures before doing any work
//! - Runs the PageSpeed fan-out and persists one row per audit
//! - Responds with a single JSON body per invocation

pub mod handlers;
pub mod signature;

use axum::{
    routing::{any, get},
    Router,
};

pub use handlers::{
    audit, classify_trigger, health, AppState, AuditQuery, AuditResponse, ErrorResponse,
    HealthResponse, TriggerKind, WebhookPayload, DEPLOYMENT_ID_HEADER, SIGNATURE_HEADER,
};
pub use signature::{is_signature_verification_enabled, verify_webhook_signature};

/// Build the application router.
///
/// The audit route is method-agnostic: cron triggers arrive as GETs, webhook
/// deliveries as POSTs.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/audit", any(audit))
        .with_state(state)
}
