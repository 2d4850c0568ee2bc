//! Audit endpoint handlers.
//!
//! One handler drives the whole flow: classify the trigger, verify webhook
//! signatures, fan out the four PageSpeed calls, persist one row, respond.
//! Failures from aggregation and persistence collapse into a single generic
//! 500 body; details stay in the server logs.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::psi::PsiClient;
use crate::storage::{AuditRecord, ScoreStore};
use crate::web::signature::{is_signature_verification_enabled, verify_webhook_signature};
use crate::Config;

/// Header whose presence marks a request as a deployment webhook.
pub const DEPLOYMENT_ID_HEADER: &str = "x-vercel-deployment-id";

/// Header carrying the webhook body signature.
pub const SIGNATURE_HEADER: &str = "x-vercel-signature";

const GENERIC_FAILURE: &str = "Failed to fetch PageSpeed Insights data or save to database";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub psi: PsiClient,
    pub store: ScoreStore,
}

impl AppState {
    pub fn new(config: Config, psi: PsiClient, store: ScoreStore) -> Self {
        Self {
            config: Arc::new(config),
            psi,
            store,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Audit Endpoint
// =============================================================================

/// How an audit request was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Periodic check, no deployment metadata.
    Scheduled,
    /// Deployment event carrying a signed payload.
    Webhook,
}

/// Classify a request by the presence of the deployment-id header.
///
/// A heuristic, not a cryptographic check: any request without the header
/// is treated as a trusted scheduled trigger.
pub fn classify_trigger(headers: &HeaderMap) -> TriggerKind {
    if headers.contains_key(DEPLOYMENT_ID_HEADER) {
        TriggerKind::Webhook
    } else {
        TriggerKind::Scheduled
    }
}

/// Query parameters on the audit endpoint.
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Deployment webhook body: `{ "deployment": { "id": "..." } }`.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub deployment: Option<DeploymentInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentInfo {
    #[serde(default)]
    pub id: Option<String>,
}

/// Successful audit response.
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub url: String,
    #[serde(rename = "deploymentId")]
    pub deployment_id: String,
    pub live: bool,
    #[serde(rename = "PERFORMANCE")]
    pub performance: Option<f64>,
    #[serde(rename = "BEST_PRACTICES")]
    pub best_practices: Option<f64>,
    #[serde(rename = "ACCESSIBILITY")]
    pub accessibility: Option<f64>,
    #[serde(rename = "SEO")]
    pub seo: Option<f64>,
}

impl From<&AuditRecord> for AuditResponse {
    fn from(record: &AuditRecord) -> Self {
        AuditResponse {
            url: record.url.clone(),
            deployment_id: record.deployment_id.clone(),
            live: record.live,
            performance: record.scores.performance,
            best_practices: record.scores.best_practices,
            accessibility: record.scores.accessibility,
            seo: record.scores.seo,
        }
    }
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

/// Audit endpoint.
///
/// Method-agnostic. The body is taken as raw bytes so webhook signatures
/// are verified over the exact wire bytes before any JSON parsing.
pub async fn audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let trigger = classify_trigger(&headers);

    info!(
        trigger = ?trigger,
        url = ?query.url,
        body_length = body.len(),
        "audit_request_received"
    );

    let deployment_id = match trigger {
        TriggerKind::Webhook => {
            // Verify signature over the raw body if a secret is configured
            if is_signature_verification_enabled(&state.config.webhook_secret) {
                let secret = state.config.webhook_secret.as_ref().unwrap();
                let signature = headers
                    .get(SIGNATURE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();

                if !verify_webhook_signature(secret, &body, signature) {
                    warn!("webhook_signature_invalid");
                    return (
                        StatusCode::FORBIDDEN,
                        Json(ErrorResponse {
                            error: "Invalid webhook signature",
                        }),
                    )
                        .into_response();
                }
            } else {
                warn!("webhook_secret_not_configured");
            }

            // Extract deployment information from the payload
            let payload: WebhookPayload = serde_json::from_slice(&body).unwrap_or_default();
            let deployment_id = payload
                .deployment
                .and_then(|d| d.id)
                .unwrap_or_default();

            if deployment_id.is_empty() || query.url.as_deref().unwrap_or("").is_empty() {
                warn!("webhook_missing_deployment_or_url");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "Deployment ID or URL is missing",
                    }),
                )
                    .into_response();
            }

            // Validate the provided access key
            match (&query.key, &state.config.secure_key) {
                (Some(provided), Some(expected)) if provided == expected => {
                    // Access granted
                }
                (_, None) => {
                    warn!("secure_key_not_configured");
                }
                _ => {
                    warn!("access_key_mismatch");
                    return (
                        StatusCode::FORBIDDEN,
                        Json(ErrorResponse {
                            error: "Unauthorized access",
                        }),
                    )
                        .into_response();
                }
            }

            deployment_id
        }
        // Scheduled checks carry no deployment metadata
        TriggerKind::Scheduled => String::new(),
    };

    let url = query.url.unwrap_or_default();
    let live = trigger == TriggerKind::Scheduled;

    let scores = match state.psi.fetch_scores(&url).await {
        Ok(scores) => scores,
        Err(e) => {
            error!(error = %e, url = %url, "psi_fetch_failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: GENERIC_FAILURE,
                }),
            )
                .into_response();
        }
    };

    let record = AuditRecord {
        url,
        deployment_id,
        live,
        scores,
    };

    if let Err(e) = state.store.insert(&record).await {
        error!(error = %e, url = %record.url, "audit_persist_failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: GENERIC_FAILURE,
            }),
        )
            .into_response();
    }

    info!(
        url = %record.url,
        deployment_id = %record.deployment_id,
        live = record.live,
        "audit_complete"
    );

    (StatusCode::OK, Json(AuditResponse::from(&record))).into_response()
}
