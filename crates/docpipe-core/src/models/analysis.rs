use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Status of one analysis job.
///
/// Valid transitions: `Pending -> Ack -> Success`, plus `Pending -> Fail` and
/// `Ack -> Fail`. `Success` and `Fail` are terminal for a job row; a new row
/// is created when a failed request is retried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Pending,
    Ack,
    Success,
    Fail,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Success | AnalysisStatus::Fail)
    }

    /// Whether a job in this status may still be rewritten by a webhook.
    pub fn accepts_webhook(&self) -> bool {
        matches!(self, AnalysisStatus::Pending | AnalysisStatus::Ack)
    }
}

impl Display for AnalysisStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AnalysisStatus::Pending => write!(f, "PENDING"),
            AnalysisStatus::Ack => write!(f, "ACK"),
            AnalysisStatus::Success => write!(f, "SUCCESS"),
            AnalysisStatus::Fail => write!(f, "FAIL"),
        }
    }
}

impl FromStr for AnalysisStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AnalysisStatus::Pending),
            "ACK" => Ok(AnalysisStatus::Ack),
            "SUCCESS" => Ok(AnalysisStatus::Success),
            "FAIL" => Ok(AnalysisStatus::Fail),
            _ => Err(anyhow::anyhow!("Invalid analysis status: {}", s)),
        }
    }
}

/// One submission to the external analysis service and its eventual outcome.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub request_id: Uuid,
    pub request: serde_json::Value,
    pub response: Option<serde_json::Value>,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a new job before the external call is made.
#[derive(Debug, Clone)]
pub struct NewAnalysisJob {
    pub request_id: Uuid,
    pub request: serde_json::Value,
}
