//! Pure accessors over a state snapshot. Tier questions delegate to `policy`.

use uuid::Uuid;

use super::AppState;
use crate::models::{Application, ApplicationStatus, Job, JobStatus};
use crate::policy::{self, JobView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ApplicationStatus),
}

impl StatusFilter {
    pub fn accepts(&self, status: ApplicationStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

pub fn is_subscribed(state: &AppState) -> bool {
    policy::is_subscribed(state.identity.as_ref())
}

pub fn can_access_job_details(state: &AppState) -> bool {
    policy::can_view_job_details(state.identity.as_ref())
}

pub fn can_send_messages(state: &AppState) -> bool {
    policy::can_message(state.identity.as_ref())
}

pub fn applications_with_status(state: &AppState, filter: StatusFilter) -> Vec<&Application> {
    state.applications.iter().filter(|a| filter.accepts(a.status)).collect()
}

pub fn applications_for_job(state: &AppState, job_id: Uuid) -> Vec<&Application> {
    state.applications.iter().filter(|a| a.job_id == job_id).collect()
}

pub fn jobs_with_status(state: &AppState, status: JobStatus) -> Vec<&Job> {
    state.jobs.iter().filter(|j| j.status == status).collect()
}

/// Cached jobs as the current identity may see them.
pub fn visible_jobs(state: &AppState) -> Vec<JobView> {
    state
        .jobs
        .iter()
        .map(|job| policy::present_job(state.identity.as_ref(), job))
        .collect()
}

/// Case-insensitive search of cached jobs. Descriptions are only searched
/// for identities allowed to read them.
pub fn search_jobs(state: &AppState, query: &str) -> Vec<JobView> {
    let needle = query.trim().to_lowercase();
    let with_details = can_access_job_details(state);
    state
        .jobs
        .iter()
        .filter(|job| {
            needle.is_empty()
                || job.title.to_lowercase().contains(&needle)
                || (with_details && job.description.to_lowercase().contains(&needle))
        })
        .map(|job| policy::present_job(state.identity.as_ref(), job))
        .collect()
}
