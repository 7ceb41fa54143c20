use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// Legal status moves: open → in_progress → completed, open → cancelled.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Open, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::Open, JobStatus::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "open" => Ok(JobStatus::Open),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" | "canceled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    FullTime,
    PartTime,
    Contract,
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "full_time" => Ok(JobType::FullTime),
            "part_time" => Ok(JobType::PartTime),
            "contract" => Ok(JobType::Contract),
            other => Err(format!("unknown job type '{}'", other)),
        }
    }
}

/// A job listing.
///
/// Budget is always the `budget_min`/`budget_max` pair. Rows carrying only the
/// legacy single `budget` column are read as `min = max = budget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "JobRow")]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget_min: Decimal,
    pub budget_max: Decimal,
    pub location: String,
    pub deadline: DateTime<Utc>,
    pub status: JobStatus,
    pub job_type: JobType,
    pub requirements: Option<String>,
    pub posted_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Loosely shaped `jobs` row as the backend returns it.
#[derive(Debug, Deserialize)]
struct JobRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    budget: Option<Decimal>,
    budget_min: Option<Decimal>,
    budget_max: Option<Decimal>,
    location: Option<String>,
    deadline: Option<DateTime<Utc>>,
    status: JobStatus,
    job_type: Option<JobType>,
    requirements: Option<String>,
    posted_by: Option<Uuid>,
    boutique_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = String;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let (budget_min, budget_max) = match (row.budget_min, row.budget_max, row.budget) {
            (Some(min), Some(max), _) => (min, max),
            (None, None, Some(single)) => (single, single),
            (Some(min), None, _) => (min, min),
            (None, Some(max), _) => (max, max),
            (None, None, None) => return Err("job has no budget".to_string()),
        };
        if budget_min > budget_max {
            return Err(format!("budget_min {} exceeds budget_max {}", budget_min, budget_max));
        }

        Ok(Job {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            budget_min,
            budget_max,
            location: row.location.ok_or("job has no location")?,
            deadline: row.deadline.ok_or("job has no deadline")?,
            status: row.status,
            job_type: row.job_type.unwrap_or_default(),
            requirements: row.requirements.filter(|r| !r.is_empty()),
            posted_by: row.posted_by.or(row.boutique_id).ok_or("job has no owner")?,
            created_at: row.created_at,
        })
    }
}

/// Insert payload for `jobs`. Only produced by validated drafts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub budget_min: Decimal,
    pub budget_max: Decimal,
    pub location: String,
    pub deadline: DateTime<Utc>,
    pub requirements: Option<String>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub posted_by: Uuid,
}
