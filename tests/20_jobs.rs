mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use tailor_market::error::MarketError;
use tailor_market::gateway::{Collection, GatewayError};
use tailor_market::models::{JobStatus, Role, SubscriptionTier};
use tailor_market::policy::{AccessError, JobView};
use tailor_market::services::JobQuery;

#[tokio::test]
async fn posted_job_round_trips() -> Result<()> {
    let h = common::Harness::new();
    let boutique = h.sign_up("shop@boutique.in", Role::Poster).await?;
    let draft = common::job_draft("Bridal lehenga alteration");
    let posted = h.ctx.jobs().post(&draft).await?;

    let mine = h.ctx.jobs().mine().await?;
    assert_eq!(mine.len(), 1);
    let job = &mine[0];
    assert_eq!(job.id, posted.id);
    assert_eq!(job.budget_min, Decimal::from(15000));
    assert_eq!(job.budget_max, Decimal::from(25000));
    assert_eq!(job.location, "Mumbai");
    assert!(job.deadline > Utc::now());
    assert_eq!(job.status, JobStatus::Open);
    assert_eq!(job.posted_by, boutique.id);
    Ok(())
}

#[tokio::test]
async fn inverted_budget_fails_before_any_call() -> Result<()> {
    let h = common::Harness::new();
    h.sign_up("shop@boutique.in", Role::Poster).await?;
    let before = h.gateway.invocations();

    let mut draft = common::job_draft("Kurta set");
    draft.budget_min = "30000".to_string();
    draft.budget_max = "20000".to_string();
    let err = h.ctx.jobs().post(&draft).await.unwrap_err();

    assert_eq!(h.gateway.invocations(), before);
    let fields = err.field_errors().expect("field errors");
    assert_eq!(fields["budget_min"], "Minimum budget cannot be greater than maximum budget");
    assert!(h.gateway.rows(Collection::Jobs).is_empty());
    Ok(())
}

#[tokio::test]
async fn past_deadline_is_rejected() -> Result<()> {
    let h = common::Harness::new();
    h.sign_up("shop@boutique.in", Role::Poster).await?;
    let mut draft = common::job_draft("Kurta set");
    draft.deadline = (Utc::now() - Duration::days(2)).format("%Y-%m-%d").to_string();
    let err = h.ctx.jobs().post(&draft).await.unwrap_err();
    assert_eq!(err.user_message(), "Application deadline must be in the future");
    Ok(())
}

#[tokio::test]
async fn tailors_cannot_post_jobs() -> Result<()> {
    let h = common::Harness::new();
    h.subscriber("asha@stitch.in", Role::Provider, SubscriptionTier::Premium).await?;
    let err = h.ctx.jobs().post(&common::job_draft("Blouse")).await.unwrap_err();
    assert!(matches!(err, MarketError::Access(AccessError::Forbidden(_))));
    Ok(())
}

#[tokio::test]
async fn free_tier_sees_only_summaries() -> Result<()> {
    let h = common::Harness::new();
    let (_, job) = h.boutique_with_job("shop@boutique.in").await?;
    h.sign_up("asha@stitch.in", Role::Provider).await?;

    let views = h.ctx.jobs().list_open(&JobQuery::default()).await?;
    assert_eq!(views.len(), 1);
    assert!(views.iter().all(JobView::is_redacted));
    let rendered = serde_json::to_value(&views[0])?;
    assert!(rendered.get("description").is_none());
    assert!(rendered.get("location").is_none());
    assert!(rendered.get("deadline").is_none());

    let err = h.ctx.jobs().open_details(job.id).await.unwrap_err();
    assert!(err.is_paywall());
    assert!(h.ctx.store().snapshot().is_paywall_visible);
    assert!(h.ctx.store().snapshot().selected_job.is_none());
    Ok(())
}

#[tokio::test]
async fn subscribers_see_details() -> Result<()> {
    let h = common::Harness::new();
    let (_, job) = h.boutique_with_job("shop@boutique.in").await?;
    h.subscriber("asha@stitch.in", Role::Provider, SubscriptionTier::Basic).await?;

    let views = h.ctx.jobs().list_open(&JobQuery::default()).await?;
    assert!(matches!(&views[0], JobView::Detailed(j) if j.location == "Mumbai"));

    let view = h.ctx.jobs().open_details(job.id).await?;
    assert!(!view.is_redacted());
    assert_eq!(h.ctx.store().snapshot().selected_job.map(|j| j.id), Some(job.id));
    Ok(())
}

#[tokio::test]
async fn location_filter_is_a_paid_feature() -> Result<()> {
    let h = common::Harness::new();
    h.boutique_with_job("shop@boutique.in").await?;
    let me = h.sign_up("asha@stitch.in", Role::Provider).await?;

    let query = JobQuery { location: Some("mum".to_string()), search: None };
    let err = h.ctx.jobs().list_open(&query).await.unwrap_err();
    assert!(err.is_paywall());

    h.ctx.set_subscription_tier(me.id, SubscriptionTier::Basic).await?;
    assert_eq!(h.ctx.jobs().list_open(&query).await?.len(), 1);

    let elsewhere = JobQuery { location: Some("Delhi".to_string()), search: None };
    assert!(h.ctx.jobs().list_open(&elsewhere).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn location_wildcards_are_matched_literally() -> Result<()> {
    let h = common::Harness::new();
    h.boutique_with_job("shop@boutique.in").await?;
    h.subscriber("asha@stitch.in", Role::Provider, SubscriptionTier::Basic).await?;

    for typed in ["%", "_", "M%i", "Mum_ai"] {
        let query = JobQuery { location: Some(typed.to_string()), search: None };
        assert!(h.ctx.jobs().list_open(&query).await?.is_empty(), "{} matched as a wildcard", typed);
    }
    let query = JobQuery { location: Some("umba".to_string()), search: None };
    assert_eq!(h.ctx.jobs().list_open(&query).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn search_matches_titles() -> Result<()> {
    let h = common::Harness::new();
    h.sign_up("shop@boutique.in", Role::Poster).await?;
    h.ctx.jobs().post(&common::job_draft("Saree fall and pico")).await?;
    h.ctx.jobs().post(&common::job_draft("Sherwani fitting")).await?;
    h.sign_up("asha@stitch.in", Role::Provider).await?;

    let query = JobQuery { location: None, search: Some("SAREE".to_string()) };
    let views = h.ctx.jobs().list_open(&query).await?;
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].title(), "Saree fall and pico");
    Ok(())
}

#[tokio::test]
async fn newest_jobs_list_first() -> Result<()> {
    let h = common::Harness::new();
    h.sign_up("shop@boutique.in", Role::Poster).await?;
    h.ctx.jobs().post(&common::job_draft("First")).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    h.ctx.jobs().post(&common::job_draft("Second")).await?;

    let titles: Vec<String> = h.ctx.jobs().mine().await?.into_iter().map(|j| j.title).collect();
    assert_eq!(titles, vec!["Second".to_string(), "First".to_string()]);
    Ok(())
}

#[tokio::test]
async fn closed_job_stays_manageable_but_not_applicable() -> Result<()> {
    let h = common::Harness::new();
    let (_, job) = h.boutique_with_job("shop@boutique.in").await?;
    let moved = h.ctx.jobs().update_status(job.id, JobStatus::InProgress).await?;
    assert_eq!(moved.status, JobStatus::InProgress);

    h.subscriber("asha@stitch.in", Role::Provider, SubscriptionTier::Basic).await?;
    let draft = tailor_market::validation::ApplicationDraft::new(job.id);
    let err = h.ctx.applications().apply(&draft).await.unwrap_err();
    assert_eq!(err.user_message(), "This job is no longer accepting applications");
    assert!(h.gateway.rows(Collection::JobApplications).is_empty());

    h.sign_in("shop@boutique.in").await?;
    let done = h.ctx.jobs().update_status(job.id, JobStatus::Completed).await?;
    assert_eq!(done.status, JobStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn invalid_transition_is_refused() -> Result<()> {
    let h = common::Harness::new();
    let (_, job) = h.boutique_with_job("shop@boutique.in").await?;
    let err = h.ctx.jobs().update_status(job.id, JobStatus::Completed).await.unwrap_err();
    assert!(matches!(err, MarketError::Access(AccessError::Forbidden(_))));

    h.ctx.jobs().update_status(job.id, JobStatus::Cancelled).await?;
    let err = h.ctx.jobs().update_status(job.id, JobStatus::Open).await.unwrap_err();
    assert!(matches!(err, MarketError::Access(AccessError::Forbidden(_))));
    Ok(())
}

#[tokio::test]
async fn only_the_owner_manages_a_job() -> Result<()> {
    let h = common::Harness::new();
    let (_, job) = h.boutique_with_job("shop@boutique.in").await?;
    h.sign_up("rival@boutique.in", Role::Poster).await?;

    let err = h.ctx.jobs().update_status(job.id, JobStatus::Cancelled).await.unwrap_err();
    assert!(matches!(err, MarketError::Access(AccessError::Forbidden(_))));
    let err = h.ctx.jobs().delete(job.id).await.unwrap_err();
    assert!(matches!(err, MarketError::Access(AccessError::Forbidden(_))));
    assert_eq!(h.gateway.rows(Collection::Jobs).len(), 1);
    Ok(())
}

#[tokio::test]
async fn delete_removes_open_job() -> Result<()> {
    let h = common::Harness::new();
    let (_, job) = h.boutique_with_job("shop@boutique.in").await?;
    h.ctx.jobs().delete(job.id).await?;
    assert!(h.gateway.rows(Collection::Jobs).is_empty());
    assert!(h.ctx.store().snapshot().jobs.is_empty());

    let err = h.ctx.jobs().delete(job.id).await.unwrap_err();
    assert!(matches!(err, MarketError::Gateway(GatewayError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn failed_load_resets_loading_and_keeps_cache() -> Result<()> {
    let h = common::Harness::new();
    h.boutique_with_job("shop@boutique.in").await?;
    h.subscriber("asha@stitch.in", Role::Provider, SubscriptionTier::Basic).await?;
    h.ctx.jobs().list_open(&JobQuery::default()).await?;
    let cached = h.ctx.store().snapshot().jobs;

    h.gateway.fail_next(GatewayError::Network("timed out".to_string()));
    let err = h.ctx.jobs().list_open(&JobQuery::default()).await.unwrap_err();
    assert_eq!(err.user_message(), "Something went wrong talking to the server. Please try again.");

    let state = h.ctx.store().snapshot();
    assert!(!state.is_loading);
    assert_eq!(state.jobs, cached);
    Ok(())
}
