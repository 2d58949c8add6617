pub mod handlers;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

pub use handlers::router;

/// What kind of thing is waiting for an admin verdict. Together with
/// the resource id this keys the queue, so a resource is pending at
/// most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Listing,
    Item,
    Post,
    Kyc,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Listing => "listing",
            SubmissionKind::Item => "item",
            SubmissionKind::Post => "post",
            SubmissionKind::Kyc => "kyc",
        }
    }

    pub fn parse(s: &str) -> Option<SubmissionKind> {
        match s {
            "listing" => Some(SubmissionKind::Listing),
            "item" => Some(SubmissionKind::Item),
            "post" => Some(SubmissionKind::Post),
            "kyc" => Some(SubmissionKind::Kyc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub kind: SubmissionKind,
    pub resource_id: String,
    pub submitted_by: String,
    pub status: String,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

/// Put a submission into the pending queue. Resubmitting a previously
/// rejected resource reopens its entry; a still-pending entry is left
/// untouched.
pub fn enqueue(
    conn: &Connection,
    kind: SubmissionKind,
    resource_id: &str,
    submitted_by: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO moderation_queue (kind, resource_id, submitted_by)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (kind, resource_id) DO UPDATE SET
             status = 'pending',
             submitted_by = excluded.submitted_by,
             resolved_by = NULL,
             resolved_at = NULL,
             created_at = datetime('now')
         WHERE moderation_queue.status != 'pending'",
        params![kind.as_str(), resource_id, submitted_by],
    )?;
    Ok(())
}
