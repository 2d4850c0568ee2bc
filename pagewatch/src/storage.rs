//! Turso (libSQL) persistence sink for audit results.
//!
//! One parameterized insert per audit; no read-back, no uniqueness
//! constraint. The connection is owned here and injected into the handler
//! state so the core logic never touches a global client handle.

use std::sync::Arc;

use anyhow::{Context, Result};
use libsql::{named_params, Builder, Connection, Database, Value};
use tracing::info;

use crate::psi::ScoreSet;

/// One audit outcome, persisted exactly once.
///
/// `deployment_id` is empty and `live` is true for scheduled checks;
/// webhook-triggered audits carry the deployment id with `live` false.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub url: String,
    pub deployment_id: String,
    pub live: bool,
    pub scores: ScoreSet,
}

const INSERT_AUDIT: &str = "\
INSERT INTO audits (url, deployment_id, live, performance, best_practices, accessibility, seo) \
VALUES (:url, :deployment_id, :live, :performance, :best_practices, :accessibility, :seo)";

const CREATE_AUDITS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS audits (
    url TEXT NOT NULL,
    deployment_id TEXT NOT NULL,
    live INTEGER NOT NULL,
    performance REAL,
    best_practices REAL,
    accessibility REAL,
    seo REAL
)";

/// Store for persisted audit rows.
///
/// Cheap to clone; the underlying connection is shared.
#[derive(Clone)]
pub struct ScoreStore {
    _db: Arc<Database>,
    conn: Connection,
}

impl ScoreStore {
    /// Connect to a remote Turso database.
    ///
    /// The schema is expected to exist already.
    pub async fn connect_remote(url: &str, auth_token: &str) -> Result<Self> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .context("Failed to connect to Turso database")?;
        let conn = db.connect().context("Failed to open database connection")?;

        Ok(Self {
            _db: Arc::new(db),
            conn,
        })
    }

    /// Open a local database file, creating the audits table if absent.
    ///
    /// Used for local development and tests; production connects remotely.
    pub async fn open_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .context("Failed to open local database")?;
        let conn = db.connect().context("Failed to open database connection")?;

        conn.execute(CREATE_AUDITS_TABLE, ())
            .await
            .context("Failed to create audits table")?;

        Ok(Self {
            _db: Arc::new(db),
            conn,
        })
    }

    /// Insert one audit row.
    pub async fn insert(&self, record: &AuditRecord) -> Result<()> {
        self.conn
            .execute(
                INSERT_AUDIT,
                named_params! {
                    ":url": record.url.clone(),
                    ":deployment_id": record.deployment_id.clone(),
                    ":live": i64::from(record.live),
                    ":performance": score_value(record.scores.performance),
                    ":best_practices": score_value(record.scores.best_practices),
                    ":accessibility": score_value(record.scores.accessibility),
                    ":seo": score_value(record.scores.seo),
                },
            )
            .await
            .context("Failed to insert audit row")?;

        info!(
            url = %record.url,
            deployment_id = %record.deployment_id,
            live = record.live,
            "audit_row_inserted"
        );

        Ok(())
    }
}

/// Map an optional score to its SQL value; a missing score persists as NULL.
fn score_value(score: Option<f64>) -> Value {
    match score {
        Some(s) => Value::Real(s),
        None => Value::Null,
    }
}
