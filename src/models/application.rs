use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::job::JobType;
use super::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("unknown application status '{}'", other)),
        }
    }
}

/// One row of `job_applications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    #[serde(rename = "tailor_id")]
    pub applicant_id: Uuid,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub proposed_budget: Option<Decimal>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewApplication {
    pub job_id: Uuid,
    #[serde(rename = "tailor_id")]
    pub applicant_id: Uuid,
    pub cover_letter: Option<String>,
    pub proposed_budget: Option<Decimal>,
    pub status: ApplicationStatus,
}

// --- Joined result shapes, one per query ---

pub const RECEIVED_APPLICATIONS_SELECT: &str =
    "*,job:jobs(title,budget_min,budget_max,posted_by),tailor:users!job_applications_tailor_id_fkey(email,profile:user_profiles(*))";

pub const SUBMITTED_APPLICATIONS_SELECT: &str =
    "*,job:jobs(title,description,budget_min,budget_max,location,deadline,job_type,boutique:users!jobs_posted_by_fkey(email,profile:user_profiles(*)))";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBrief {
    pub title: String,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyBrief {
    pub email: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// An application as the owning poster sees it: with the job title and the
/// applicant's contact and profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedApplication {
    #[serde(flatten)]
    pub application: Application,
    pub job: JobBrief,
    pub tailor: PartyBrief,
}

/// The job embedded in an applicant's own application. The detail fields are
/// cleared for viewers without job-detail access and then left out entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedJob {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub job_type: Option<JobType>,
    pub boutique: PartyBrief,
}

impl AppliedJob {
    pub fn redact(&mut self) {
        self.description = None;
        self.location = None;
        self.deadline = None;
    }

    pub fn is_redacted(&self) -> bool {
        self.description.is_none() && self.location.is_none() && self.deadline.is_none()
    }
}

/// An application as the applicant sees it: with the job and the poster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedApplication {
    #[serde(flatten)]
    pub application: Application,
    pub job: AppliedJob,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn app_row() -> serde_json::Value {
        json!({
            "id": "11111111-1111-4111-8111-111111111111",
            "job_id": "22222222-2222-4222-8222-222222222222",
            "tailor_id": "33333333-3333-4333-8333-333333333333",
            "cover_letter": "10 years of bridal work",
            "proposed_budget": "18000",
            "status": "pending",
            "created_at": "2024-05-01T10:00:00Z"
        })
    }

    #[test]
    fn test_received_application_parses_join() {
        let mut row = app_row();
        row["job"] = json!({ "title": "Sherwani", "budget_min": 1000, "budget_max": 2000 });
        row["tailor"] = json!({ "email": "t@example.com", "profile": null });
        let parsed: ReceivedApplication = serde_json::from_value(row).unwrap();
        assert_eq!(parsed.job.title, "Sherwani");
        assert_eq!(parsed.application.status, ApplicationStatus::Pending);
        assert!(parsed.tailor.profile.is_none());
    }

    #[test]
    fn test_redacted_applied_job_omits_detail_fields() {
        let mut row = app_row();
        row["job"] = json!({
            "title": "Sherwani",
            "description": "Raw silk, hand stitched",
            "budget_min": 1000,
            "budget_max": 2000,
            "location": "Jaipur",
            "deadline": "2030-01-01T00:00:00Z",
            "job_type": "contract",
            "boutique": { "email": "b@example.com", "profile": null }
        });
        let mut parsed: SubmittedApplication = serde_json::from_value(row).unwrap();
        assert!(!parsed.job.is_redacted());

        parsed.job.redact();
        let rendered = serde_json::to_value(&parsed).unwrap();
        assert_eq!(rendered["job"]["title"], "Sherwani");
        assert!(rendered["job"].get("description").is_none());
        assert!(rendered["job"].get("location").is_none());
        assert!(rendered["job"].get("deadline").is_none());
    }

    #[test]
    fn test_missing_join_is_an_error() {
        let mut row = app_row();
        row["job"] = serde_json::Value::Null;
        row["tailor"] = json!({ "email": "t@example.com" });
        assert!(serde_json::from_value::<ReceivedApplication>(row).is_err());
    }
}
