// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use rusqlite::params;

use crate::dispute::domain::{Dispute, DisputeStatus, DisputeType, Resolution};
use crate::repository::RepositoryError;
use crate::state::DbPool;

/// Repository trait - all dispute persistence operations
#[async_trait]
pub trait DisputeRepository: Send + Sync {
    /// Persist a freshly filed dispute.
    async fn create(&self, dispute: &Dispute) -> Result<(), RepositoryError>;

    /// Load a dispute by id.
    async fn load(&self, id: &str) -> Result<Option<Dispute>, RepositoryError>;

    /// Disputes filed by the user or against their bookings, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Dispute>, RepositoryError>;

    /// Every dispute, newest first. Admin overview.
    async fn list_all(&self, status: Option<DisputeStatus>)
        -> Result<Vec<Dispute>, RepositoryError>;

    /// Persist a transition that carries no resolution (investigate, close).
    async fn update_status(&self, id: &str, status: DisputeStatus)
        -> Result<(), RepositoryError>;

    /// Persist the resolved state together with its resolution. The two
    /// are written in one statement so they can never drift apart.
    async fn record_resolution(
        &self,
        id: &str,
        decision: &str,
        amount: Option<i64>,
        resolved_by: &str,
    ) -> Result<(), RepositoryError>;
}

/// SQLite implementation
pub struct SqliteDisputeRepository {
    pool: DbPool,
}

impl SqliteDisputeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const DISPUTE_COLUMNS: &str = "id, booking_id, filed_by, dispute_type, status, description, \
     evidence, resolution_decision, resolution_amount, resolved_by, resolved_at, \
     created_at, updated_at";

fn map_dispute_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Dispute> {
    let type_str: String = row.get(3)?;
    let dispute_type = DisputeType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown dispute type: {}", type_str).into(),
        )
    })?;

    let status_str: String = row.get(4)?;
    let status = DisputeStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown dispute status: {}", status_str).into(),
        )
    })?;

    let evidence_json: String = row.get(6)?;
    let evidence: Vec<String> = serde_json::from_str(&evidence_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let decision: Option<String> = row.get(7)?;
    let resolution = match decision {
        Some(decision) => Some(Resolution {
            decision,
            amount: row.get(8)?,
            resolved_by: row.get(9)?,
            resolved_at: row.get(10)?,
        }),
        None => None,
    };

    Ok(Dispute {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        filed_by: row.get(2)?,
        dispute_type,
        status,
        description: row.get(5)?,
        evidence,
        resolution,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

#[async_trait]
impl DisputeRepository for SqliteDisputeRepository {
    async fn create(&self, dispute: &Dispute) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        let evidence = serde_json::to_string(&dispute.evidence)?;
        conn.execute(
            "INSERT INTO disputes (id, booking_id, filed_by, dispute_type, status, description, evidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                dispute.id,
                dispute.booking_id,
                dispute.filed_by,
                dispute.dispute_type.as_str(),
                dispute.status.as_str(),
                dispute.description,
                evidence,
            ],
        )?;

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Dispute>, RepositoryError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            &format!("SELECT {} FROM disputes WHERE id = ?1", DISPUTE_COLUMNS),
            params![id],
            map_dispute_row,
        );

        match result {
            Ok(dispute) => Ok(Some(dispute)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Dispute>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT d.{} FROM disputes d
             JOIN bookings b ON b.id = d.booking_id
             WHERE d.filed_by = ?1 OR b.vendor_id = ?1 OR b.customer_id = ?1
             ORDER BY d.created_at DESC",
            DISPUTE_COLUMNS.replace(", ", ", d.")
        ))?;

        let disputes = stmt
            .query_map(params![user_id], map_dispute_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(disputes)
    }

    async fn list_all(
        &self,
        status: Option<DisputeStatus>,
    ) -> Result<Vec<Dispute>, RepositoryError> {
        let conn = self.pool.get()?;

        let disputes = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM disputes WHERE status = ?1 ORDER BY created_at DESC",
                    DISPUTE_COLUMNS
                ))?;
                let rows = stmt.query_map(params![status.as_str()], map_dispute_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM disputes ORDER BY created_at DESC",
                    DISPUTE_COLUMNS
                ))?;
                let rows = stmt.query_map([], map_dispute_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(disputes)
    }

    async fn update_status(
        &self,
        id: &str,
        status: DisputeStatus,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE disputes SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![status.as_str(), id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("dispute {}", id)));
        }

        Ok(())
    }

    async fn record_resolution(
        &self,
        id: &str,
        decision: &str,
        amount: Option<i64>,
        resolved_by: &str,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE disputes
             SET status = ?1, resolution_decision = ?2, resolution_amount = ?3,
                 resolved_by = ?4, resolved_at = datetime('now'),
                 updated_at = datetime('now')
             WHERE id = ?5",
            params![
                DisputeStatus::Resolved.as_str(),
                decision,
                amount,
                resolved_by,
                id
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("dispute {}", id)));
        }

        Ok(())
    }
}
