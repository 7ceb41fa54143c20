//! Controller-level orchestration: policy check, validation, gateway call,
//! then a confirmed store update.
//!
//! [`MarketContext`] owns the injected gateway, the session manager and the
//! store; the per-area services borrow it. Failed calls leave the store as
//! it was, and every loading flag is scoped by a [`crate::store::LoadingGuard`].

pub mod account;
pub mod applications;
pub mod jobs;
pub mod messages;
pub mod portfolio;
pub mod profiles;
pub mod subscriptions;

use std::sync::Arc;

use crate::error::MarketError;
use crate::gateway::MarketGateway;
use crate::models::Identity;
use crate::policy::AccessError;
use crate::session::SessionManager;
use crate::store::Store;

pub use applications::ApplicationService;
pub use jobs::{JobQuery, JobService};
pub use messages::MessageService;
pub use portfolio::PortfolioService;
pub use profiles::{ProfilePage, ProfileService};
pub use subscriptions::SubscriptionService;

pub struct MarketContext {
    gateway: Arc<dyn MarketGateway>,
    session: SessionManager,
    store: Arc<Store>,
}

impl MarketContext {
    pub fn new(gateway: Arc<dyn MarketGateway>) -> Self {
        Self::with_store(gateway, Arc::new(Store::new()))
    }

    pub fn with_store(gateway: Arc<dyn MarketGateway>, store: Arc<Store>) -> Self {
        Self { session: SessionManager::new(gateway.clone()), gateway, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_handle(&self) -> Arc<Store> {
        self.store.clone()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub(crate) fn gateway(&self) -> &dyn MarketGateway {
        self.gateway.as_ref()
    }

    pub fn jobs(&self) -> JobService<'_> {
        JobService::new(self)
    }

    pub fn applications(&self) -> ApplicationService<'_> {
        ApplicationService::new(self)
    }

    pub fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(self)
    }

    pub fn portfolio(&self) -> PortfolioService<'_> {
        PortfolioService::new(self)
    }

    pub fn messages(&self) -> MessageService<'_> {
        MessageService::new(self)
    }

    pub fn subscriptions(&self) -> SubscriptionService<'_> {
        SubscriptionService::new(self)
    }

    /// Identity for the next action. An expired session signs the store out first.
    pub(crate) fn current_identity(&self) -> Option<Identity> {
        let identity = self.session.ensure_fresh();
        if identity.is_none() && self.store.identity().is_some() {
            self.store.reset();
        }
        identity
    }

    pub(crate) fn require_identity(&self) -> Result<Identity, MarketError> {
        self.current_identity().ok_or_else(|| AccessError::NotSignedIn.into())
    }

    /// Convert a denial into an error, raising the paywall when that is the reason.
    pub(crate) fn deny(&self, err: AccessError) -> MarketError {
        if let AccessError::Paywall { feature } = &err {
            tracing::info!("Paywall shown for {}", feature);
            self.store.set_paywall_visible(true);
        }
        err.into()
    }
}
