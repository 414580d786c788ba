//! Screening request queue.
//!
//! The connector's sync drains this queue: pending requests are submitted to
//! the provider and marked with the provider-assigned id; the completion
//! webhook attaches the scored report. Stored in SQLite; the raw provider
//! results land in a JSON column.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

use super::api::CheckResults;
use super::scoring::RiskLevel;

/// Screening depth tier offered to applicants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreeningPackage {
    Standard,
    Premium,
    Express,
}

impl ScreeningPackage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningPackage::Standard => "standard",
            ScreeningPackage::Premium => "premium",
            ScreeningPackage::Express => "express",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(ScreeningPackage::Standard),
            "premium" => Ok(ScreeningPackage::Premium),
            "express" => Ok(ScreeningPackage::Express),
            other => Err(anyhow::anyhow!("Unknown screening package '{}'", other)),
        }
    }
}

impl fmt::Display for ScreeningPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue state of one screening request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreeningStatus {
    Pending,
    Submitted,
    Completed,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStatus::Pending => "pending",
            ScreeningStatus::Submitted => "submitted",
            ScreeningStatus::Completed => "completed",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ScreeningStatus::Pending),
            "submitted" => Ok(ScreeningStatus::Submitted),
            "completed" => Ok(ScreeningStatus::Completed),
            other => Err(anyhow::anyhow!("Unknown screening status '{}'", other)),
        }
    }
}

/// One applicant screening to run through a provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScreeningRequest {
    pub id: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub tenant_email: String,
    pub tenant_phone: Option<String>,
    pub property_id: String,
    pub unit_id: String,
    pub package: ScreeningPackage,
    pub status: ScreeningStatus,
    /// Provider-assigned id, set once the request has been submitted.
    pub provider_request_id: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl ScreeningRequest {
    pub fn new(
        tenant_id: &str,
        tenant_name: &str,
        tenant_email: &str,
        tenant_phone: Option<String>,
        property_id: &str,
        unit_id: &str,
        package: ScreeningPackage,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            tenant_name: tenant_name.to_string(),
            tenant_email: tenant_email.to_string(),
            tenant_phone,
            property_id: property_id.to_string(),
            unit_id: unit_id.to_string(),
            package,
            status: ScreeningStatus::Pending,
            provider_request_id: None,
            requested_at: Utc::now(),
        }
    }
}

/// Scored outcome of a completed screening.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub overall_score: u8,
    pub risk_level: RiskLevel,
    pub results: CheckResults,
    pub completed_at: DateTime<Utc>,
}

/// Queue of screening requests, shared between the connector's sync and the
/// completion webhook.
pub trait ScreeningQueue: Send + Sync {
    /// Enqueues a new request. Fails if the id already exists.
    fn insert(&self, request: &ScreeningRequest) -> Result<()>;

    /// Returns a request by id, or `None` if absent.
    fn get(&self, id: &str) -> Result<Option<ScreeningRequest>>;

    /// All requests still waiting to be submitted, oldest first.
    fn pending(&self) -> Result<Vec<ScreeningRequest>>;

    /// Records a successful submission with the provider-assigned id.
    fn mark_submitted(&self, id: &str, provider_request_id: &str) -> Result<()>;

    /// Attaches the scored report and marks the request completed.
    ///
    /// Keyed by the provider-assigned id, which is what completion webhooks
    /// carry. The report is stored even when no matching request exists.
    fn complete(&self, provider_request_id: &str, report: &ScreeningReport) -> Result<()>;

    /// Returns the stored report for a provider request id, if any.
    fn report(&self, provider_request_id: &str) -> Result<Option<ScreeningReport>>;
}

/// SQLite-backed [`ScreeningQueue`].
pub struct SqliteScreeningQueue {
    conn: Mutex<Connection>,
}

impl SqliteScreeningQueue {
    /// Opens (or creates) the database and ensures the tables exist.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open screening DB at {}", db_path))?;
        let queue = Self {
            conn: Mutex::new(conn),
        };
        queue.create_tables()?;
        Ok(queue)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS screening_requests (
                id                  TEXT PRIMARY KEY,
                tenant_id           TEXT NOT NULL,
                tenant_name         TEXT NOT NULL,
                tenant_email        TEXT NOT NULL,
                tenant_phone        TEXT,
                property_id         TEXT NOT NULL,
                unit_id             TEXT NOT NULL,
                package             TEXT NOT NULL,
                status              TEXT NOT NULL,
                provider_request_id TEXT,
                requested_at        TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS screening_reports (
                provider_request_id TEXT PRIMARY KEY,
                overall_score       INTEGER NOT NULL,
                risk_level          TEXT NOT NULL,
                results_json        TEXT NOT NULL,
                completed_at        TEXT NOT NULL
            );",
        )
        .context("Failed to create screening tables")?;
        Ok(())
    }
}

impl ScreeningQueue for SqliteScreeningQueue {
    fn insert(&self, request: &ScreeningRequest) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO screening_requests
                (id, tenant_id, tenant_name, tenant_email, tenant_phone,
                 property_id, unit_id, package, status, provider_request_id, requested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                request.id,
                request.tenant_id,
                request.tenant_name,
                request.tenant_email,
                request.tenant_phone,
                request.property_id,
                request.unit_id,
                request.package.as_str(),
                request.status.as_str(),
                request.provider_request_id,
                request.requested_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert screening request")?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ScreeningRequest>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, tenant_id, tenant_name, tenant_email, tenant_phone,
                    property_id, unit_id, package, status, provider_request_id, requested_at
             FROM screening_requests WHERE id = ?1",
            params![id],
            row_to_request,
        )
        .optional()
        .context("Failed to fetch screening request")
    }

    fn pending(&self) -> Result<Vec<ScreeningRequest>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, tenant_name, tenant_email, tenant_phone,
                    property_id, unit_id, package, status, provider_request_id, requested_at
             FROM screening_requests WHERE status = 'pending' ORDER BY requested_at ASC",
        )?;
        let rows = stmt.query_map([], row_to_request)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list pending screening requests")
    }

    fn mark_submitted(&self, id: &str, provider_request_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE screening_requests
                 SET status = 'submitted', provider_request_id = ?2
                 WHERE id = ?1",
                params![id, provider_request_id],
            )
            .context("Failed to mark screening request submitted")?;
        anyhow::ensure!(updated == 1, "No screening request with id '{}'", id);
        Ok(())
    }

    fn complete(&self, provider_request_id: &str, report: &ScreeningReport) -> Result<()> {
        let results_json =
            serde_json::to_string(&report.results).context("Failed to serialize results")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO screening_reports
                (provider_request_id, overall_score, risk_level, results_json, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                provider_request_id,
                report.overall_score as i64,
                report.risk_level.as_str(),
                results_json,
                report.completed_at.to_rfc3339(),
            ],
        )
        .context("Failed to store screening report")?;
        conn.execute(
            "UPDATE screening_requests SET status = 'completed'
             WHERE provider_request_id = ?1",
            params![provider_request_id],
        )
        .context("Failed to mark screening request completed")?;
        Ok(())
    }

    fn report(&self, provider_request_id: &str) -> Result<Option<ScreeningReport>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT overall_score, risk_level, results_json, completed_at
                 FROM screening_reports WHERE provider_request_id = ?1",
                params![provider_request_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .context("Failed to fetch screening report")?;

        let Some((score, risk, results_json, completed_at)) = row else {
            return Ok(None);
        };
        let risk_level = match risk.as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            other => anyhow::bail!("Unknown risk level '{}' in screening report", other),
        };
        let results: CheckResults =
            serde_json::from_str(&results_json).context("Failed to parse stored results")?;
        let completed_at: DateTime<Utc> = completed_at
            .parse()
            .context("Failed to parse completed_at")?;
        Ok(Some(ScreeningReport {
            overall_score: score as u8,
            risk_level,
            results,
            completed_at,
        }))
    }
}

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScreeningRequest> {
    let package: String = row.get(7)?;
    let status: String = row.get(8)?;
    let requested_at: String = row.get(10)?;
    Ok(ScreeningRequest {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        tenant_name: row.get(2)?,
        tenant_email: row.get(3)?,
        tenant_phone: row.get(4)?,
        property_id: row.get(5)?,
        unit_id: row.get(6)?,
        package: ScreeningPackage::parse(&package).expect("invalid package in DB"),
        status: ScreeningStatus::parse(&status).expect("invalid status in DB"),
        provider_request_id: row.get(9)?,
        requested_at: requested_at.parse().expect("invalid requested_at in DB"),
    })
}
