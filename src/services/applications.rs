use serde_json::json;
use uuid::Uuid;

use super::MarketContext;
use crate::error::{MarketError, MarketResult};
use crate::filter::Filter;
use crate::gateway::{by_id, fetch_all, fetch_one, insert_as, parse_row, Collection, GatewayError};
use crate::models::application::{RECEIVED_APPLICATIONS_SELECT, SUBMITTED_APPLICATIONS_SELECT};
use crate::models::{Application, ApplicationStatus, Job, ReceivedApplication, SubmittedApplication};
use crate::policy::{self, AccessError};
use crate::store::{QueryKey, StatusFilter};
use crate::validation::{ApplicationDraft, ValidationError};

pub struct ApplicationService<'a> {
    ctx: &'a MarketContext,
}

impl<'a> ApplicationService<'a> {
    pub(crate) fn new(ctx: &'a MarketContext) -> Self {
        Self { ctx }
    }

    /// Submit a pending application. Re-applying is refused while an earlier
    /// application for the same job is pending or accepted.
    pub async fn apply(&self, draft: &ApplicationDraft) -> MarketResult<Application> {
        let identity = self.ctx.require_identity()?;
        let new_application = draft.validate(identity.id)?;

        let store = self.ctx.store();
        let _loading = store.loading();

        let job = self.ctx.jobs().fetch(draft.job_id).await?;
        let mut existing_filter = Filter::new(Collection::JobApplications);
        existing_filter.eq("job_id", job.id.to_string())?;
        existing_filter.eq("tailor_id", identity.id.to_string())?;
        existing_filter.and_where(json!({ "status": { "$ne": ApplicationStatus::Rejected.as_str() } }))?;
        let existing: Vec<Application> = fetch_all(self.ctx.gateway(), &existing_filter).await?;

        if let Some(denial) = policy::apply_denial(Some(&identity), &job, &existing) {
            return Err(self.ctx.deny(denial));
        }

        let application: Application =
            insert_as(self.ctx.gateway(), Collection::JobApplications, &new_application).await?;
        tracing::info!("Applied to job {} as {}", job.id, identity.email);
        store.upsert_application(application.clone());
        Ok(application)
    }

    /// The current identity's own applications with their jobs, newest first.
    pub async fn mine(&self) -> MarketResult<Vec<SubmittedApplication>> {
        let identity = self.ctx.require_identity()?;
        let store = self.ctx.store();
        let _loading = store.loading();
        let token = store.begin_request(QueryKey::Applications);

        let mut filter = Filter::new(Collection::JobApplications);
        filter.select(SUBMITTED_APPLICATIONS_SELECT)?;
        filter.eq("tailor_id", identity.id.to_string())?;
        filter.order(json!("created_at desc"))?;

        let submitted: Vec<SubmittedApplication> = fetch_all(self.ctx.gateway(), &filter).await?;
        store.apply_applications(token, submitted.iter().map(|s| s.application.clone()).collect());
        Ok(submitted
            .into_iter()
            .map(|s| policy::present_submitted(Some(&identity), s))
            .collect())
    }

    /// Applications received on the current poster's jobs, or on one of them.
    pub async fn received(&self, job_id: Option<Uuid>, status: StatusFilter) -> MarketResult<Vec<ReceivedApplication>> {
        let identity = self.ctx.require_identity()?;
        if !policy::can_post_job(Some(&identity)) {
            return Err(AccessError::Forbidden("Only boutiques receive applications".to_string()).into());
        }

        let store = self.ctx.store();
        let _loading = store.loading();
        let token = store.begin_request(QueryKey::Applications);

        let job_ids: Vec<String> = match job_id {
            Some(job_id) => {
                let job = self.ctx.jobs().fetch(job_id).await?;
                if !policy::can_review_application(Some(&identity), &job) {
                    return Err(AccessError::Forbidden("You can only view applications for your own jobs".to_string()).into());
                }
                vec![job.id.to_string()]
            }
            None => {
                let mut jobs_filter = Filter::new(Collection::Jobs);
                jobs_filter.eq("posted_by", identity.id.to_string())?;
                let jobs: Vec<Job> = fetch_all(self.ctx.gateway(), &jobs_filter).await?;
                jobs.iter().map(|j| j.id.to_string()).collect()
            }
        };

        if job_ids.is_empty() {
            store.apply_applications(token, vec![]);
            return Ok(vec![]);
        }

        let mut filter = Filter::new(Collection::JobApplications);
        filter.select(RECEIVED_APPLICATIONS_SELECT)?;
        filter.and_where(json!({ "job_id": { "$in": job_ids } }))?;
        if let StatusFilter::Only(wanted) = status {
            filter.eq("status", wanted.as_str())?;
        }
        filter.order(json!("created_at desc"))?;

        let received: Vec<ReceivedApplication> = fetch_all(self.ctx.gateway(), &filter).await?;
        store.apply_applications(token, received.iter().map(|r| r.application.clone()).collect());
        Ok(received)
    }

    /// Accept or reject a pending application on one of the poster's jobs.
    pub async fn review(&self, application_id: Uuid, decision: ApplicationStatus) -> MarketResult<Application> {
        if decision == ApplicationStatus::Pending {
            return Err(ValidationError::field("status", "Choose accepted or rejected").into());
        }
        let identity = self.ctx.require_identity()?;
        let store = self.ctx.store();
        let _loading = store.loading();

        let application = self.fetch(application_id).await?;
        let job = self.ctx.jobs().fetch(application.job_id).await?;
        if !policy::can_review_application(Some(&identity), &job) {
            return Err(AccessError::Forbidden("You can only review applications for your own jobs".to_string()).into());
        }
        if application.status != ApplicationStatus::Pending {
            return Err(AccessError::Forbidden(format!(
                "This application has already been {}",
                application.status
            ))
            .into());
        }

        let mut filter = by_id(Collection::JobApplications, application_id)?;
        filter.eq("status", ApplicationStatus::Pending.as_str())?;
        let row = self
            .ctx
            .gateway()
            .update(&filter, json!({ "status": decision }))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound("Application".to_string()))?;
        let updated: Application = parse_row(Collection::JobApplications, row)?;

        tracing::info!("Application {} {}", application_id, updated.status);
        store.upsert_application(updated.clone());
        Ok(updated)
    }

    /// Delete the current identity's pending application.
    pub async fn withdraw(&self, application_id: Uuid) -> MarketResult<()> {
        let identity = self.ctx.require_identity()?;
        let store = self.ctx.store();
        let _loading = store.loading();

        let application = self.fetch(application_id).await?;
        if !policy::can_withdraw_application(Some(&identity), &application) {
            return Err(AccessError::Forbidden("Only your own pending applications can be withdrawn".to_string()).into());
        }

        let mut filter = by_id(Collection::JobApplications, application_id)?;
        filter.eq("tailor_id", identity.id.to_string())?;
        filter.eq("status", ApplicationStatus::Pending.as_str())?;
        let deleted = self.ctx.gateway().delete(&filter).await?;
        if deleted.is_empty() {
            return Err(MarketError::Gateway(GatewayError::NotFound("Application".to_string())));
        }

        tracing::info!("Withdrew application {}", application_id);
        store.remove_application(application_id);
        Ok(())
    }

    async fn fetch(&self, application_id: Uuid) -> MarketResult<Application> {
        let filter = by_id(Collection::JobApplications, application_id)?;
        Ok(fetch_one(self.ctx.gateway(), &filter).await?)
    }
}
