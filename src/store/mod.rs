//! Application store: identity, cached collections and UI flags.
//!
//! A plain value shared by `Arc`; there is no global instance. Mutators
//! replace whole slices under a write lock, and readers work on cloned
//! snapshots so derived views never observe a half-applied update.

pub mod derived;
pub mod sequencer;

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::models::{Application, Identity, Job, Message};

pub use derived::StatusFilter;
pub use sequencer::{QueryKey, RequestSequencer, RequestToken};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub identity: Option<Identity>,
    pub jobs: Vec<Job>,
    pub selected_job: Option<Job>,
    pub applications: Vec<Application>,
    pub messages: Vec<Message>,
    pub is_paywall_visible: bool,
    pub is_loading: bool,
}

#[derive(Default)]
struct Inner {
    state: AppState,
    loading_depth: usize,
    manual_loading: bool,
}

impl Inner {
    fn refresh_loading(&mut self) {
        self.state.is_loading = self.loading_depth > 0 || self.manual_loading;
    }
}

#[derive(Default)]
pub struct Store {
    inner: RwLock<Inner>,
    sequencer: RequestSequencer,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> AppState {
        self.read().state.clone()
    }

    /// Run `f` against the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.read().state)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().state.identity.clone()
    }

    // --- Mutators ---

    pub fn set_identity(&self, identity: Option<Identity>) {
        self.write().state.identity = identity;
    }

    pub fn replace_jobs(&self, jobs: Vec<Job>) {
        self.write().state.jobs = jobs;
    }

    /// Replace by id, or prepend when new so the newest job lists first.
    pub fn upsert_job(&self, job: Job) {
        let mut inner = self.write();
        let state = &mut inner.state;
        if state.selected_job.as_ref().map(|s| s.id) == Some(job.id) {
            state.selected_job = Some(job.clone());
        }
        match state.jobs.iter_mut().find(|j| j.id == job.id) {
            Some(existing) => *existing = job,
            None => state.jobs.insert(0, job),
        }
    }

    pub fn remove_job(&self, job_id: Uuid) -> bool {
        let mut inner = self.write();
        let state = &mut inner.state;
        if state.selected_job.as_ref().map(|s| s.id) == Some(job_id) {
            state.selected_job = None;
        }
        let before = state.jobs.len();
        state.jobs.retain(|j| j.id != job_id);
        state.jobs.len() != before
    }

    pub fn select_job(&self, job: Option<Job>) {
        self.write().state.selected_job = job;
    }

    pub fn replace_applications(&self, applications: Vec<Application>) {
        self.write().state.applications = applications;
    }

    /// Replace by id or append.
    pub fn upsert_application(&self, application: Application) {
        let mut inner = self.write();
        let applications = &mut inner.state.applications;
        match applications.iter_mut().find(|a| a.id == application.id) {
            Some(existing) => *existing = application,
            None => applications.push(application),
        }
    }

    pub fn remove_application(&self, application_id: Uuid) -> bool {
        let mut inner = self.write();
        let applications = &mut inner.state.applications;
        let before = applications.len();
        applications.retain(|a| a.id != application_id);
        applications.len() != before
    }

    pub fn replace_messages(&self, messages: Vec<Message>) {
        self.write().state.messages = messages;
    }

    pub fn set_paywall_visible(&self, visible: bool) {
        self.write().state.is_paywall_visible = visible;
    }

    /// Unguarded loading mark. Clearing it never lowers the flag while a
    /// [`LoadingGuard`] is still alive.
    pub fn set_loading(&self, loading: bool) {
        let mut inner = self.write();
        inner.manual_loading = loading;
        inner.refresh_loading();
    }

    /// Clear everything tied to the signed-in user.
    pub fn reset(&self) {
        let mut inner = self.write();
        let loading = inner.state.is_loading;
        inner.state = AppState { is_loading: loading, ..AppState::default() };
    }

    // --- Loading ---

    /// Mark the store as loading until the returned guard drops.
    pub fn loading(&self) -> LoadingGuard<'_> {
        let mut inner = self.write();
        inner.loading_depth += 1;
        inner.refresh_loading();
        LoadingGuard { store: self }
    }

    fn finish_loading(&self) {
        let mut inner = self.write();
        inner.loading_depth = inner.loading_depth.saturating_sub(1);
        inner.refresh_loading();
    }

    // --- Sequenced results ---

    pub fn begin_request(&self, key: QueryKey) -> RequestToken {
        self.sequencer.begin(key)
    }

    fn apply_if_current(&self, token: RequestToken, apply: impl FnOnce(&mut AppState)) -> bool {
        let mut inner = self.write();
        if !self.sequencer.is_current(token) {
            tracing::debug!("Discarding stale {:?} response", token.key());
            return false;
        }
        apply(&mut inner.state);
        true
    }

    pub fn apply_jobs(&self, token: RequestToken, jobs: Vec<Job>) -> bool {
        self.apply_if_current(token, |state| state.jobs = jobs)
    }

    pub fn apply_applications(&self, token: RequestToken, applications: Vec<Application>) -> bool {
        self.apply_if_current(token, |state| state.applications = applications)
    }

    pub fn apply_messages(&self, token: RequestToken, messages: Vec<Message>) -> bool {
        self.apply_if_current(token, |state| state.messages = messages)
    }

    // --- Derived ---

    pub fn is_subscribed(&self) -> bool {
        self.with_state(derived::is_subscribed)
    }

    pub fn can_access_job_details(&self) -> bool {
        self.with_state(derived::can_access_job_details)
    }

    pub fn can_send_messages(&self) -> bool {
        self.with_state(derived::can_send_messages)
    }
}

/// Resets the loading flag when dropped, on every exit path.
#[must_use = "loading ends as soon as the guard is dropped"]
pub struct LoadingGuard<'a> {
    store: &'a Store,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.finish_loading();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplicationStatus, JobStatus, JobType, Role, SubscriptionTier};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn job(title: &str, status: JobStatus) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "Zari work on dupatta".to_string(),
            budget_min: Decimal::from(1000),
            budget_max: Decimal::from(2000),
            location: "Jaipur".to_string(),
            deadline: Utc::now() + Duration::days(7),
            status,
            job_type: JobType::PartTime,
            requirements: None,
            posted_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    fn application(job_id: Uuid, status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            job_id,
            applicant_id: Uuid::new_v4(),
            cover_letter: None,
            proposed_budget: None,
            status,
            created_at: Utc::now(),
        }
    }

    fn identity(tier: SubscriptionTier) -> Identity {
        Identity { id: Uuid::new_v4(), email: "t@example.com".to_string(), role: Role::Provider, subscription_tier: tier }
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let store = Store::new();
        let first = store.begin_request(QueryKey::Jobs);
        let second = store.begin_request(QueryKey::Jobs);

        assert!(store.apply_jobs(second, vec![job("newer", JobStatus::Open)]));
        assert!(!store.apply_jobs(first, vec![job("older", JobStatus::Open)]));

        let titles: Vec<String> = store.snapshot().jobs.into_iter().map(|j| j.title).collect();
        assert_eq!(titles, vec!["newer".to_string()]);
    }

    #[test]
    fn test_set_loading_does_not_cancel_outstanding_guard() {
        let store = Store::new();
        let guard = store.loading();
        store.set_loading(false);
        assert!(store.snapshot().is_loading);
        store.set_loading(true);
        store.set_loading(false);
        assert!(store.snapshot().is_loading);

        drop(guard);
        assert!(!store.snapshot().is_loading);

        store.set_loading(true);
        let nested = store.loading();
        drop(nested);
        assert!(store.snapshot().is_loading);
        store.set_loading(false);
        assert!(!store.snapshot().is_loading);
    }

    #[test]
    fn test_loading_guard_resets_on_early_exit() {
        let store = Store::new();
        let outcome: Result<(), &str> = (|| {
            let _guard = store.loading();
            assert!(store.snapshot().is_loading);
            Err("gateway failed")
        })();
        assert!(outcome.is_err());
        assert!(!store.snapshot().is_loading);
    }

    #[test]
    fn test_nested_loading_guards() {
        let store = Store::new();
        let outer = store.loading();
        {
            let _inner = store.loading();
        }
        assert!(store.snapshot().is_loading);
        drop(outer);
        assert!(!store.snapshot().is_loading);
    }

    #[test]
    fn test_upsert_application_replaces_by_id() {
        let store = Store::new();
        let mut app = application(Uuid::new_v4(), ApplicationStatus::Pending);
        store.upsert_application(app.clone());
        app.status = ApplicationStatus::Accepted;
        store.upsert_application(app.clone());
        let state = store.snapshot();
        assert_eq!(state.applications.len(), 1);
        assert_eq!(state.applications[0].status, ApplicationStatus::Accepted);
        assert!(store.remove_application(app.id));
        assert!(!store.remove_application(app.id));
    }

    #[test]
    fn test_filtered_views() {
        let store = Store::new();
        let open = job("Saree fall", JobStatus::Open);
        store.replace_jobs(vec![open.clone(), job("Blouse", JobStatus::Completed)]);
        store.replace_applications(vec![
            application(open.id, ApplicationStatus::Pending),
            application(open.id, ApplicationStatus::Rejected),
            application(Uuid::new_v4(), ApplicationStatus::Pending),
        ]);

        let state = store.snapshot();
        assert_eq!(derived::jobs_with_status(&state, JobStatus::Open).len(), 1);
        assert_eq!(derived::applications_for_job(&state, open.id).len(), 2);
        assert_eq!(
            derived::applications_with_status(&state, StatusFilter::Only(ApplicationStatus::Pending)).len(),
            2
        );
        assert_eq!(derived::applications_with_status(&state, StatusFilter::All).len(), 3);
    }

    #[test]
    fn test_derived_accessors_follow_identity() {
        let store = Store::new();
        assert!(!store.is_subscribed());
        store.set_identity(Some(identity(SubscriptionTier::Free)));
        assert!(!store.can_access_job_details());
        store.set_identity(Some(identity(SubscriptionTier::Premium)));
        assert!(store.is_subscribed());
        assert!(store.can_access_job_details());
        assert!(store.can_send_messages());
    }

    #[test]
    fn test_search_hides_description_matches_from_free_tier() {
        let store = Store::new();
        store.replace_jobs(vec![job("Saree fall", JobStatus::Open)]);

        store.set_identity(Some(identity(SubscriptionTier::Free)));
        assert!(store.with_state(|s| derived::search_jobs(s, "zari")).is_empty());
        let by_title = store.with_state(|s| derived::search_jobs(s, "saree"));
        assert_eq!(by_title.len(), 1);
        assert!(by_title[0].is_redacted());

        store.set_identity(Some(identity(SubscriptionTier::Basic)));
        assert_eq!(store.with_state(|s| derived::search_jobs(s, "zari")).len(), 1);
    }

    #[test]
    fn test_reset_clears_user_state() {
        let store = Store::new();
        store.set_identity(Some(identity(SubscriptionTier::Basic)));
        store.replace_jobs(vec![job("Kurta", JobStatus::Open)]);
        store.set_paywall_visible(true);
        store.reset();
        assert_eq!(store.snapshot(), AppState::default());
    }
}
