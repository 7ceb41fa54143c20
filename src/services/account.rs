//! Sign-in lifecycle as seen by the store. Each call mirrors the session
//! manager's outcome into the store identity.

use uuid::Uuid;

use super::MarketContext;
use crate::error::MarketResult;
use crate::models::{Identity, Role, SubscriptionTier};
use crate::validation::{SignInForm, SignUpForm};

impl MarketContext {
    /// Resume a persisted session, if any.
    pub async fn start(&self) -> Option<Identity> {
        let _loading = self.store().loading();
        let identity = self.session().resolve_current_identity().await;
        self.store().set_identity(identity.clone());
        identity
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> MarketResult<Identity> {
        form.validate()?;
        let _loading = self.store().loading();
        let result = self.session().sign_up(form.email.trim(), &form.password, form.role).await;
        self.settle(result)
    }

    pub async fn sign_in(&self, form: &SignInForm) -> MarketResult<Identity> {
        form.validate()?;
        let _loading = self.store().loading();
        let result = self.session().sign_in(form.email.trim(), &form.password).await;
        self.settle(result)
    }

    pub async fn sign_out(&self) {
        let _loading = self.store().loading();
        self.session().sign_out().await;
        self.store().reset();
    }

    pub async fn set_user_role(&self, user_id: Uuid, role: Role) -> MarketResult<Identity> {
        let _loading = self.store().loading();
        let updated = self.session().update_user_role(user_id, role).await?;
        self.mirror_if_self(&updated);
        Ok(updated)
    }

    pub async fn set_subscription_tier(&self, user_id: Uuid, tier: SubscriptionTier) -> MarketResult<Identity> {
        let _loading = self.store().loading();
        let updated = self.session().update_subscription_tier(user_id, tier).await?;
        self.mirror_if_self(&updated);
        Ok(updated)
    }

    fn settle(&self, result: Result<Identity, crate::session::AuthError>) -> MarketResult<Identity> {
        match result {
            Ok(identity) => {
                self.store().reset();
                self.store().set_identity(Some(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                self.store().set_identity(None);
                Err(e.into())
            }
        }
    }

    fn mirror_if_self(&self, updated: &Identity) {
        if self.store().identity().map(|i| i.id) == Some(updated.id) {
            self.store().set_identity(Some(updated.clone()));
        }
    }
}
