//! PageWatch - website performance audit trigger service.
//!
//! This library backs the `pagewatch-web` binary, a thin HTTP service that:
//! - Classifies incoming requests as scheduled checks or deployment webhooks
//! - Verifies webhook signatures (HMAC-SHA1 over the raw body)
//! - Fans out four concurrent PageSpeed Insights requests, one per category
//! - Persists one row of category scores to a remote Turso database
//!
//! ## Architecture
//!
//! ```text
//! Cron / Deploy Webhook → Web Server → PageSpeed Insights (×4) → Turso
//! ```

pub mod config;
pub mod psi;
pub mod storage;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use psi::{Category, PsiClient, PsiError, ScoreSet};
pub use storage::{AuditRecord, ScoreStore};
pub use web::AppState;
