//! Session & identity management.
//!
//! Turns the auth service's principal into a domain [`Identity`] by loading the
//! matching `users` row, and tracks the sign-in lifecycle:
//! `Unauthenticated → Authenticating → Authenticated`, back to
//! `Unauthenticated` on sign-out or when the held session expires.

pub mod error;

use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::MarketResult;
use crate::gateway::{by_id, fetch_optional, parse_row, Collection, GatewayError, MarketGateway, Principal};
use crate::models::{Identity, Role, SubscriptionTier};
use crate::policy::{self, AccessError};

pub use error::{AuthError, IdentityLookupError};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated(Identity),
}

pub struct SessionManager {
    gateway: Arc<dyn MarketGateway>,
    state: RwLock<SessionState>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn MarketGateway>) -> Self {
        Self { gateway, state: RwLock::new(SessionState::Unauthenticated) }
    }

    pub fn state(&self) -> SessionState {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        match self.state() {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    fn set_state(&self, next: SessionState) {
        *self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }

    /// Load the `users` row for `user_id`.
    pub async fn lookup_identity(&self, user_id: Uuid) -> Result<Identity, IdentityLookupError> {
        let filter = by_id(Collection::Users, user_id).map_err(GatewayError::from)?;
        fetch_optional::<Identity, _>(self.gateway.as_ref(), &filter)
            .await?
            .ok_or(IdentityLookupError::MissingRecord(user_id))
    }

    /// Resolve the signed-in principal into an identity. Every failure degrades to `None`.
    pub async fn resolve_current_identity(&self) -> Option<Identity> {
        self.set_state(SessionState::Authenticating);

        let principal = match self.gateway.current_principal().await {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                self.set_state(SessionState::Unauthenticated);
                return None;
            }
            Err(e) => {
                tracing::warn!("Could not read current session: {}", e);
                self.set_state(SessionState::Unauthenticated);
                return None;
            }
        };

        match self.lookup_identity(principal.id).await {
            Ok(identity) => {
                tracing::info!("Resumed session for {} ({})", identity.email, identity.role);
                self.set_state(SessionState::Authenticated(identity.clone()));
                Some(identity)
            }
            Err(e) => {
                tracing::error!("Identity lookup failed: {}", e);
                self.set_state(SessionState::Unauthenticated);
                None
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str, role: Role) -> Result<Identity, AuthError> {
        if role == Role::Admin {
            return Err(AuthError::RoleNotAllowed(role));
        }
        self.set_state(SessionState::Authenticating);

        let metadata = json!({ "role": role, "subscription_status": SubscriptionTier::Free });
        let result = match self.gateway.sign_up(email, password, metadata).await {
            Ok(principal) => self.identity_for_principal(&principal, Some(role)).await,
            Err(e) => Err(e),
        };
        self.finish("sign-up", result)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.set_state(SessionState::Authenticating);

        let result = match self.gateway.sign_in_with_password(email, password).await {
            Ok(principal) => self.identity_for_principal(&principal, None).await,
            Err(e) => Err(e),
        };
        if matches!(result, Err(AuthError::AccountRecordMissing)) {
            tracing::error!("Signed-in principal has no users row");
            if let Err(e) = self.gateway.sign_out().await {
                tracing::warn!("Could not end the orphaned auth session: {}", e);
            }
        }
        self.finish("sign-in", result)
    }

    /// Always ends the local session; a failed remote sign-out is only logged.
    pub async fn sign_out(&self) {
        if let Err(e) = self.gateway.sign_out().await {
            tracing::warn!("Remote sign-out failed, clearing local session anyway: {}", e);
        }
        self.set_state(SessionState::Unauthenticated);
        tracing::info!("Signed out");
    }

    /// Drop to unauthenticated if the held session has expired.
    pub fn ensure_fresh(&self) -> Option<Identity> {
        let identity = self.identity()?;
        if self.gateway.session_expired() {
            tracing::info!("Session for {} expired", identity.email);
            self.set_state(SessionState::Unauthenticated);
            return None;
        }
        Some(identity)
    }

    pub async fn update_user_role(&self, user_id: Uuid, role: Role) -> MarketResult<Identity> {
        let actor = self.identity();
        policy::require_admin(actor.as_ref())?;
        self.patch_user(user_id, json!({ "role": role, "updated_at": Utc::now() })).await
    }

    pub async fn update_subscription_tier(&self, user_id: Uuid, tier: SubscriptionTier) -> MarketResult<Identity> {
        let actor = self.identity();
        policy::require_signed_in(actor.as_ref())?;
        if !policy::can_change_tier(actor.as_ref(), user_id) {
            return Err(AccessError::Forbidden("You can only change your own subscription".to_string()).into());
        }
        self.patch_user(user_id, json!({ "subscription_status": tier, "updated_at": Utc::now() })).await
    }

    async fn patch_user(&self, user_id: Uuid, patch: Value) -> MarketResult<Identity> {
        let filter = by_id(Collection::Users, user_id)?;
        let row = self
            .gateway
            .update(&filter, patch)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound("User".to_string()))?;
        let identity: Identity = parse_row(Collection::Users, row)?;

        if self.identity().map(|current| current.id) == Some(user_id) {
            self.set_state(SessionState::Authenticated(identity.clone()));
        }
        tracing::info!("Updated user {}: role={}, tier={}", user_id, identity.role, identity.subscription_tier);
        Ok(identity)
    }

    /// Load the identity for a fresh principal. Only sign-up passes a role, and
    /// only then is a missing `users` row provisioned.
    async fn identity_for_principal(&self, principal: &Principal, role: Option<Role>) -> Result<Identity, AuthError> {
        match self.lookup_identity(principal.id).await {
            Ok(identity) => Ok(identity),
            Err(IdentityLookupError::MissingRecord(_)) => match role {
                Some(role) if role != Role::Admin => self.provision(principal, role).await,
                _ => Err(AuthError::AccountRecordMissing),
            },
            Err(IdentityLookupError::Gateway(e)) => Err(AuthError::Backend(e.to_string())),
        }
    }

    async fn provision(&self, principal: &Principal, role: Role) -> Result<Identity, AuthError> {
        let email = principal
            .email
            .clone()
            .ok_or_else(|| AuthError::Backend("principal has no email".to_string()))?;
        let identity = Identity { id: principal.id, email, role, subscription_tier: SubscriptionTier::Free };
        let record = serde_json::to_value(&identity).map_err(|e| AuthError::Backend(e.to_string()))?;

        tracing::warn!("No users row for {}, creating one", identity.id);
        self.gateway
            .upsert(Collection::Users, record, "id")
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        Ok(identity)
    }

    fn finish(&self, action: &str, result: Result<Identity, AuthError>) -> Result<Identity, AuthError> {
        match &result {
            Ok(identity) => {
                tracing::info!("{} succeeded for {} ({})", action, identity.email, identity.role);
                self.set_state(SessionState::Authenticated(identity.clone()));
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", action, e);
                self.set_state(SessionState::Unauthenticated);
            }
        }
        result
    }
}
