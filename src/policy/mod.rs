//! Access policy: pure predicates over an identity and a target record.
//!
//! Every tier and role check in the crate goes through this module. Callers
//! never compare tiers inline; they ask a predicate here or request the
//! [`AccessError`] explaining why an action is denied.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Application, ApplicationStatus, Identity, Job, JobStatus, JobType, PortfolioItem, Role, SubmittedApplication,
    SubscriptionTier,
};

pub const FEATURE_JOB_DETAILS: &str = "job details";
pub const FEATURE_MESSAGING: &str = "messaging";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Upgrade your plan to unlock {feature}")]
    Paywall { feature: &'static str },

    #[error("{0}")]
    Forbidden(String),

    #[error("Please sign in to continue")]
    NotSignedIn,
}

impl AccessError {
    fn forbidden(message: impl Into<String>) -> Self {
        AccessError::Forbidden(message.into())
    }
}

fn is_paid(identity: &Identity) -> bool {
    identity.subscription_tier != SubscriptionTier::Free
}

pub fn is_admin(identity: Option<&Identity>) -> bool {
    matches!(identity, Some(i) if i.role == Role::Admin)
}

pub fn is_subscribed(identity: Option<&Identity>) -> bool {
    identity.map(is_paid).unwrap_or(false)
}

/// Only paid tiers see full job details, whatever the role.
pub fn can_view_job_details(identity: Option<&Identity>) -> bool {
    is_subscribed(identity)
}

pub fn can_message(identity: Option<&Identity>) -> bool {
    is_subscribed(identity)
}

pub fn can_post_job(identity: Option<&Identity>) -> bool {
    matches!(identity, Some(i) if i.role == Role::Poster)
}

pub fn can_manage_job(identity: Option<&Identity>, job: &Job) -> bool {
    matches!(identity, Some(i) if i.role == Role::Poster && i.id == job.posted_by)
}

/// Only the owning poster may move a job along its lifecycle.
pub fn can_transition_job(identity: Option<&Identity>, job: &Job, next: JobStatus) -> bool {
    can_manage_job(identity, job) && job.status.can_transition_to(next)
}

/// Jobs are deletable by their manager while still open.
pub fn can_delete_job(identity: Option<&Identity>, job: &Job) -> bool {
    can_manage_job(identity, job) && job.status == JobStatus::Open
}

pub fn can_review_application(identity: Option<&Identity>, job: &Job) -> bool {
    can_manage_job(identity, job)
}

pub fn can_withdraw_application(identity: Option<&Identity>, application: &Application) -> bool {
    match identity {
        Some(i) => i.id == application.applicant_id && application.status == ApplicationStatus::Pending,
        None => false,
    }
}

/// An application counts against re-applying unless it was rejected.
pub fn has_active_application(identity: &Identity, job_id: Uuid, existing: &[Application]) -> bool {
    existing.iter().any(|a| {
        a.job_id == job_id && a.applicant_id == identity.id && a.status != ApplicationStatus::Rejected
    })
}

/// Why `identity` may not apply to `job`, or `None` when it may.
pub fn apply_denial(identity: Option<&Identity>, job: &Job, existing: &[Application]) -> Option<AccessError> {
    let Some(identity) = identity else {
        return Some(AccessError::NotSignedIn);
    };
    if identity.role != Role::Provider {
        return Some(AccessError::forbidden("Only tailors can apply to jobs"));
    }
    if !can_view_job_details(Some(identity)) {
        return Some(AccessError::Paywall { feature: FEATURE_JOB_DETAILS });
    }
    if job.status != JobStatus::Open {
        return Some(AccessError::forbidden("This job is no longer accepting applications"));
    }
    if has_active_application(identity, job.id, existing) {
        return Some(AccessError::forbidden("You have already applied to this job"));
    }
    None
}

pub fn can_apply_to_job(identity: Option<&Identity>, job: &Job, existing: &[Application]) -> bool {
    apply_denial(identity, job, existing).is_none()
}

pub fn can_edit_profile(identity: Option<&Identity>, user_id: Uuid) -> bool {
    matches!(identity, Some(i) if i.id == user_id)
}

pub fn can_manage_portfolio_item(identity: Option<&Identity>, item: &PortfolioItem) -> bool {
    matches!(identity, Some(i) if i.role == Role::Provider && i.id == item.tailor_id)
}

pub fn can_add_portfolio_item(identity: Option<&Identity>) -> bool {
    matches!(identity, Some(i) if i.role == Role::Provider)
}

/// Changing another user's tier is an admin action; users may change their own.
pub fn can_change_tier(identity: Option<&Identity>, user_id: Uuid) -> bool {
    can_edit_profile(identity, user_id) || is_admin(identity)
}

// --- Gates returning the reason for denial ---

pub fn require_signed_in(identity: Option<&Identity>) -> Result<&Identity, AccessError> {
    identity.ok_or(AccessError::NotSignedIn)
}

pub fn require_job_details(identity: Option<&Identity>) -> Result<(), AccessError> {
    require_signed_in(identity)?;
    if can_view_job_details(identity) {
        Ok(())
    } else {
        Err(AccessError::Paywall { feature: FEATURE_JOB_DETAILS })
    }
}

pub fn require_messaging(identity: Option<&Identity>) -> Result<(), AccessError> {
    require_signed_in(identity)?;
    if can_message(identity) {
        Ok(())
    } else {
        Err(AccessError::Paywall { feature: FEATURE_MESSAGING })
    }
}

pub fn require_admin(identity: Option<&Identity>) -> Result<&Identity, AccessError> {
    let identity = require_signed_in(identity)?;
    if is_admin(Some(identity)) {
        Ok(identity)
    } else {
        Err(AccessError::forbidden("Administrator access required"))
    }
}

// --- Redacted presentation ---

/// The listing fields every viewer may see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub budget_min: Decimal,
    pub budget_max: Decimal,
    pub status: JobStatus,
    pub job_type: JobType,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            budget_min: job.budget_min,
            budget_max: job.budget_max,
            status: job.status,
            job_type: job.job_type,
            created_at: job.created_at,
        }
    }
}

/// A job as a particular viewer is allowed to see it.
///
/// Free-tier viewers only ever receive [`JobView::Summary`], so description,
/// location, deadline and requirements cannot reach them by accident.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum JobView {
    Summary(JobSummary),
    Detailed(Job),
}

impl JobView {
    pub fn id(&self) -> Uuid {
        match self {
            JobView::Summary(s) => s.id,
            JobView::Detailed(j) => j.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            JobView::Summary(s) => &s.title,
            JobView::Detailed(j) => &j.title,
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, JobView::Summary(_))
    }
}

pub fn present_job(identity: Option<&Identity>, job: &Job) -> JobView {
    if can_view_job_details(identity) {
        JobView::Detailed(job.clone())
    } else {
        JobView::Summary(JobSummary::from(job))
    }
}

/// An applicant's own application, with the embedded job cut down to what
/// `identity` may see. Applying needs a paid tier but downgrading later does not
/// keep the details visible.
pub fn present_submitted(identity: Option<&Identity>, mut submitted: SubmittedApplication) -> SubmittedApplication {
    if !can_view_job_details(identity) {
        submitted.job.redact();
    }
    submitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppliedJob, PartyBrief};
    use chrono::Duration;

    fn identity(role: Role, tier: SubscriptionTier) -> Identity {
        Identity { id: Uuid::new_v4(), email: "someone@example.com".to_string(), role, subscription_tier: tier }
    }

    fn job(posted_by: Uuid, status: JobStatus) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Bridal lehenga".to_string(),
            description: "Hand embroidery on silk".to_string(),
            budget_min: Decimal::from(15000),
            budget_max: Decimal::from(25000),
            location: "Mumbai".to_string(),
            deadline: Utc::now() + Duration::days(14),
            status,
            job_type: JobType::Contract,
            requirements: Some("Zardosi".to_string()),
            posted_by,
            created_at: Utc::now(),
        }
    }

    fn application(job_id: Uuid, applicant: Uuid, status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            job_id,
            applicant_id: applicant,
            cover_letter: None,
            proposed_budget: None,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_details_and_messaging_follow_tier() {
        for role in [Role::Poster, Role::Provider] {
            let free = identity(role, SubscriptionTier::Free);
            assert!(!can_view_job_details(Some(&free)));
            assert!(!can_message(Some(&free)));
            for tier in [SubscriptionTier::Basic, SubscriptionTier::Premium] {
                let paid = identity(role, tier);
                assert!(can_view_job_details(Some(&paid)));
                assert!(can_message(Some(&paid)));
            }
        }
        assert!(!can_view_job_details(Some(&identity(Role::Admin, SubscriptionTier::Free))));
        assert!(!can_view_job_details(None));
    }

    #[test]
    fn test_free_viewer_gets_summary_only() {
        let free = identity(Role::Provider, SubscriptionTier::Free);
        let listing = job(Uuid::new_v4(), JobStatus::Open);
        match present_job(Some(&free), &listing) {
            JobView::Summary(summary) => assert_eq!(summary.title, listing.title),
            JobView::Detailed(_) => panic!("free tier must not see details"),
        }
        let rendered = serde_json::to_value(present_job(Some(&free), &listing)).unwrap();
        assert!(rendered.get("description").is_none());
        assert!(rendered.get("location").is_none());
    }

    #[test]
    fn test_submitted_application_redacted_for_free_tier() {
        let tailor = identity(Role::Provider, SubscriptionTier::Free);
        let listing = job(Uuid::new_v4(), JobStatus::Open);
        let submitted = SubmittedApplication {
            application: application(listing.id, tailor.id, ApplicationStatus::Pending),
            job: AppliedJob {
                title: listing.title.clone(),
                description: Some(listing.description.clone()),
                budget_min: Some(listing.budget_min),
                budget_max: Some(listing.budget_max),
                location: Some(listing.location.clone()),
                deadline: Some(listing.deadline),
                job_type: Some(listing.job_type),
                boutique: PartyBrief { email: "shop@example.com".to_string(), profile: None },
            },
        };

        let paid = identity(Role::Provider, SubscriptionTier::Premium);
        assert!(!present_submitted(Some(&paid), submitted.clone()).job.is_redacted());

        let shown = present_submitted(Some(&tailor), submitted);
        assert!(shown.job.is_redacted());
        assert_eq!(shown.job.title, listing.title);
        assert_eq!(shown.job.budget_max, Some(listing.budget_max));
    }

    #[test]
    fn test_cannot_apply_to_non_open_job() {
        let tailor = identity(Role::Provider, SubscriptionTier::Basic);
        for status in [JobStatus::InProgress, JobStatus::Completed, JobStatus::Cancelled] {
            assert!(!can_apply_to_job(Some(&tailor), &job(Uuid::new_v4(), status), &[]));
        }
        assert!(can_apply_to_job(Some(&tailor), &job(Uuid::new_v4(), JobStatus::Open), &[]));
    }

    #[test]
    fn test_apply_denials() {
        let listing = job(Uuid::new_v4(), JobStatus::Open);
        let free = identity(Role::Provider, SubscriptionTier::Free);
        assert_eq!(
            apply_denial(Some(&free), &listing, &[]),
            Some(AccessError::Paywall { feature: FEATURE_JOB_DETAILS })
        );
        let boutique = identity(Role::Poster, SubscriptionTier::Premium);
        assert!(matches!(apply_denial(Some(&boutique), &listing, &[]), Some(AccessError::Forbidden(_))));
        assert_eq!(apply_denial(None, &listing, &[]), Some(AccessError::NotSignedIn));
    }

    #[test]
    fn test_duplicate_application_blocked_unless_rejected() {
        let tailor = identity(Role::Provider, SubscriptionTier::Premium);
        let listing = job(Uuid::new_v4(), JobStatus::Open);
        let pending = [application(listing.id, tailor.id, ApplicationStatus::Pending)];
        assert!(!can_apply_to_job(Some(&tailor), &listing, &pending));
        let rejected = [application(listing.id, tailor.id, ApplicationStatus::Rejected)];
        assert!(can_apply_to_job(Some(&tailor), &listing, &rejected));
        let someone_else = [application(listing.id, Uuid::new_v4(), ApplicationStatus::Pending)];
        assert!(can_apply_to_job(Some(&tailor), &listing, &someone_else));
    }

    #[test]
    fn test_job_management_is_owner_only() {
        let owner = identity(Role::Poster, SubscriptionTier::Free);
        let other = identity(Role::Poster, SubscriptionTier::Premium);
        let listing = job(owner.id, JobStatus::Open);
        assert!(can_manage_job(Some(&owner), &listing));
        assert!(!can_manage_job(Some(&other), &listing));
        assert!(can_review_application(Some(&owner), &listing));
        assert!(!can_review_application(Some(&other), &listing));
        assert!(can_transition_job(Some(&owner), &listing, JobStatus::InProgress));
        assert!(!can_transition_job(Some(&owner), &listing, JobStatus::Completed));
        assert!(can_delete_job(Some(&owner), &listing));
        assert!(!can_delete_job(Some(&owner), &job(owner.id, JobStatus::Completed)));
    }

    #[test]
    fn test_withdraw_requires_pending_own_application() {
        let tailor = identity(Role::Provider, SubscriptionTier::Basic);
        let own = application(Uuid::new_v4(), tailor.id, ApplicationStatus::Pending);
        assert!(can_withdraw_application(Some(&tailor), &own));
        let accepted = application(Uuid::new_v4(), tailor.id, ApplicationStatus::Accepted);
        assert!(!can_withdraw_application(Some(&tailor), &accepted));
        let theirs = application(Uuid::new_v4(), Uuid::new_v4(), ApplicationStatus::Pending);
        assert!(!can_withdraw_application(Some(&tailor), &theirs));
    }

    #[test]
    fn test_admin_gate() {
        assert!(require_admin(Some(&identity(Role::Admin, SubscriptionTier::Free))).is_ok());
        assert!(matches!(
            require_admin(Some(&identity(Role::Poster, SubscriptionTier::Premium))),
            Err(AccessError::Forbidden(_))
        ));
        assert_eq!(require_admin(None).unwrap_err(), AccessError::NotSignedIn);
    }
}
