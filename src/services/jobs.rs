use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::MarketContext;
use crate::error::{MarketError, MarketResult};
use crate::filter::filter_where::escape_like;
use crate::filter::Filter;
use crate::gateway::{by_id, fetch_all, fetch_one, insert_as, parse_row, Collection, GatewayError};
use crate::models::{Job, JobStatus};
use crate::policy::{self, AccessError, JobView, FEATURE_JOB_DETAILS};
use crate::store::{derived, QueryKey};
use crate::validation::JobDraft;

/// Job board filters. Location is a detail field, so filtering by it is a paid feature.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub location: Option<String>,
    pub search: Option<String>,
}

pub struct JobService<'a> {
    ctx: &'a MarketContext,
}

impl<'a> JobService<'a> {
    pub(crate) fn new(ctx: &'a MarketContext) -> Self {
        Self { ctx }
    }

    /// Load open jobs, newest first, presented for the current identity.
    pub async fn list_open(&self, query: &JobQuery) -> MarketResult<Vec<JobView>> {
        let identity = self.ctx.current_identity();
        let location = query.location.as_deref().map(str::trim).filter(|l| !l.is_empty());
        if location.is_some() && !policy::can_view_job_details(identity.as_ref()) {
            return Err(self.ctx.deny(AccessError::Paywall { feature: FEATURE_JOB_DETAILS }));
        }

        let store = self.ctx.store();
        let _loading = store.loading();
        let token = store.begin_request(QueryKey::Jobs);

        let mut filter = Filter::new(Collection::Jobs);
        filter.eq("status", JobStatus::Open.as_str())?;
        if let Some(location) = location {
            filter.and_where(json!({ "location": { "$ilike": format!("%{}%", escape_like(location)) } }))?;
        }
        filter.order(json!("created_at desc"))?;

        let jobs: Vec<Job> = fetch_all(self.ctx.gateway(), &filter).await?;
        tracing::debug!("Loaded {} open jobs", jobs.len());
        store.apply_jobs(token, jobs);

        Ok(store.with_state(|state| match query.search.as_deref() {
            Some(search) => derived::search_jobs(state, search),
            None => derived::visible_jobs(state),
        }))
    }

    /// Full job details. Free-tier identities hit the paywall instead.
    pub async fn open_details(&self, job_id: Uuid) -> MarketResult<JobView> {
        let identity = self.ctx.current_identity();
        policy::require_job_details(identity.as_ref()).map_err(|e| self.ctx.deny(e))?;

        let store = self.ctx.store();
        let _loading = store.loading();
        let job = self.fetch(job_id).await?;
        store.select_job(Some(job.clone()));
        Ok(policy::present_job(identity.as_ref(), &job))
    }

    pub async fn post(&self, draft: &JobDraft) -> MarketResult<Job> {
        let identity = self.ctx.require_identity()?;
        if !policy::can_post_job(Some(&identity)) {
            return Err(AccessError::Forbidden("Only boutiques can post jobs".to_string()).into());
        }
        let new_job = draft.validate(identity.id, Utc::now())?;

        let store = self.ctx.store();
        let _loading = store.loading();
        let job: Job = insert_as(self.ctx.gateway(), Collection::Jobs, &new_job).await?;
        tracing::info!("Posted job {} ({})", job.id, job.title);
        store.upsert_job(job.clone());
        Ok(job)
    }

    /// Jobs posted by the current identity, newest first.
    pub async fn mine(&self) -> MarketResult<Vec<Job>> {
        let identity = self.ctx.require_identity()?;
        if !policy::can_post_job(Some(&identity)) {
            return Err(AccessError::Forbidden("Only boutiques have posted jobs".to_string()).into());
        }

        let store = self.ctx.store();
        let _loading = store.loading();
        let token = store.begin_request(QueryKey::Jobs);

        let mut filter = Filter::new(Collection::Jobs);
        filter.eq("posted_by", identity.id.to_string())?;
        filter.order(json!("created_at desc"))?;

        let jobs: Vec<Job> = fetch_all(self.ctx.gateway(), &filter).await?;
        store.apply_jobs(token, jobs.clone());
        Ok(jobs)
    }

    pub async fn update_status(&self, job_id: Uuid, next: JobStatus) -> MarketResult<Job> {
        let identity = self.ctx.require_identity()?;
        let store = self.ctx.store();
        let _loading = store.loading();

        let job = self.fetch(job_id).await?;
        if !policy::can_manage_job(Some(&identity), &job) {
            return Err(AccessError::Forbidden("You can only update your own jobs".to_string()).into());
        }
        if !policy::can_transition_job(Some(&identity), &job, next) {
            return Err(AccessError::Forbidden(format!(
                "A {} job cannot move to {}",
                job.status, next
            ))
            .into());
        }

        // Scoped to the status we checked so a concurrent change is not overwritten.
        let mut filter = by_id(Collection::Jobs, job_id)?;
        filter.eq("posted_by", identity.id.to_string())?;
        filter.eq("status", job.status.as_str())?;
        let row = self
            .ctx
            .gateway()
            .update(&filter, json!({ "status": next }))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound("Job".to_string()))?;
        let updated: Job = parse_row(Collection::Jobs, row)?;

        tracing::info!("Job {} moved {} -> {}", job_id, job.status, updated.status);
        store.upsert_job(updated.clone());
        Ok(updated)
    }

    pub async fn delete(&self, job_id: Uuid) -> MarketResult<()> {
        let identity = self.ctx.require_identity()?;
        let store = self.ctx.store();
        let _loading = store.loading();

        let job = self.fetch(job_id).await?;
        if !policy::can_delete_job(Some(&identity), &job) {
            return Err(AccessError::Forbidden("Only open jobs you posted can be deleted".to_string()).into());
        }

        let mut filter = by_id(Collection::Jobs, job_id)?;
        filter.eq("posted_by", identity.id.to_string())?;
        filter.eq("status", JobStatus::Open.as_str())?;
        let deleted = self.ctx.gateway().delete(&filter).await?;
        if deleted.is_empty() {
            return Err(MarketError::Gateway(GatewayError::NotFound("Job".to_string())));
        }

        tracing::info!("Deleted job {}", job_id);
        store.remove_job(job_id);
        Ok(())
    }

    pub(crate) async fn fetch(&self, job_id: Uuid) -> MarketResult<Job> {
        let filter = by_id(Collection::Jobs, job_id)?;
        Ok(fetch_one(self.ctx.gateway(), &filter).await?)
    }
}
