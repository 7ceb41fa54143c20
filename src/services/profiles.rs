use uuid::Uuid;

use super::MarketContext;
use crate::error::MarketResult;
use crate::gateway::{by_id, fetch_optional, parse_row, Collection};
use crate::models::{PortfolioItem, Profile};
use crate::policy::{self, AccessError};
use crate::validation::ProfileDraft;

pub struct ProfileService<'a> {
    ctx: &'a MarketContext,
}

/// A provider's public page: profile plus portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePage {
    pub profile: Option<Profile>,
    pub portfolio: Vec<PortfolioItem>,
}

impl<'a> ProfileService<'a> {
    pub(crate) fn new(ctx: &'a MarketContext) -> Self {
        Self { ctx }
    }

    /// Profile for `user_id`. Users who never saved one have none.
    pub async fn get(&self, user_id: Uuid) -> MarketResult<Option<Profile>> {
        let filter = by_id(Collection::UserProfiles, user_id)?;
        Ok(fetch_optional(self.ctx.gateway(), &filter).await?)
    }

    pub async fn mine(&self) -> MarketResult<Option<Profile>> {
        let identity = self.ctx.require_identity()?;
        self.get(identity.id).await
    }

    /// Create or replace the current identity's profile.
    pub async fn save(&self, draft: &ProfileDraft) -> MarketResult<Profile> {
        let identity = self.ctx.require_identity()?;
        if !policy::can_edit_profile(Some(&identity), identity.id) {
            return Err(AccessError::Forbidden("You can only edit your own profile".to_string()).into());
        }
        let profile = draft.validate(identity.id)?;

        let _loading = self.ctx.store().loading();
        let record = serde_json::to_value(&profile).map_err(crate::gateway::GatewayError::from)?;
        let row = self
            .ctx
            .gateway()
            .upsert(Collection::UserProfiles, record, Collection::UserProfiles.primary_key())
            .await?;
        let saved: Profile = parse_row(Collection::UserProfiles, row)?;
        tracing::info!("Saved profile for {}", identity.id);
        Ok(saved)
    }

    /// Load a profile and its portfolio concurrently.
    pub async fn page(&self, user_id: Uuid) -> MarketResult<ProfilePage> {
        let _loading = self.ctx.store().loading();
        let items = self.ctx.portfolio();
        let (profile, portfolio) = futures::try_join!(self.get(user_id), items.list(user_id))?;
        Ok(ProfilePage { profile, portfolio })
    }
}
