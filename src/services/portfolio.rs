use serde_json::json;
use uuid::Uuid;

use super::MarketContext;
use crate::error::{MarketError, MarketResult};
use crate::filter::Filter;
use crate::gateway::{by_id, fetch_all, fetch_one, insert_as, Collection, GatewayError};
use crate::models::PortfolioItem;
use crate::policy::{self, AccessError};
use crate::validation::PortfolioDraft;

pub struct PortfolioService<'a> {
    ctx: &'a MarketContext,
}

impl<'a> PortfolioService<'a> {
    pub(crate) fn new(ctx: &'a MarketContext) -> Self {
        Self { ctx }
    }

    /// A provider's portfolio, newest first.
    pub async fn list(&self, tailor_id: Uuid) -> MarketResult<Vec<PortfolioItem>> {
        let mut filter = Filter::new(Collection::PortfolioItems);
        filter.eq("tailor_id", tailor_id.to_string())?;
        filter.order(json!("created_at desc"))?;
        Ok(fetch_all(self.ctx.gateway(), &filter).await?)
    }

    pub async fn mine(&self) -> MarketResult<Vec<PortfolioItem>> {
        let identity = self.ctx.require_identity()?;
        self.list(identity.id).await
    }

    pub async fn add(&self, draft: &PortfolioDraft) -> MarketResult<PortfolioItem> {
        let identity = self.ctx.require_identity()?;
        if !policy::can_add_portfolio_item(Some(&identity)) {
            return Err(AccessError::Forbidden("Only tailors keep a portfolio".to_string()).into());
        }
        let new_item = draft.validate(identity.id)?;

        let _loading = self.ctx.store().loading();
        let item: PortfolioItem = insert_as(self.ctx.gateway(), Collection::PortfolioItems, &new_item).await?;
        tracing::info!("Added portfolio item {} for {}", item.id, identity.id);
        Ok(item)
    }

    pub async fn delete(&self, item_id: Uuid) -> MarketResult<()> {
        let identity = self.ctx.require_identity()?;
        let _loading = self.ctx.store().loading();

        let filter = by_id(Collection::PortfolioItems, item_id)?;
        let item: PortfolioItem = fetch_one(self.ctx.gateway(), &filter).await?;
        if !policy::can_manage_portfolio_item(Some(&identity), &item) {
            return Err(AccessError::Forbidden("You can only remove your own portfolio items".to_string()).into());
        }

        let mut filter = by_id(Collection::PortfolioItems, item_id)?;
        filter.eq("tailor_id", identity.id.to_string())?;
        if self.ctx.gateway().delete(&filter).await?.is_empty() {
            return Err(MarketError::Gateway(GatewayError::NotFound("Portfolio item".to_string())));
        }
        tracing::info!("Deleted portfolio item {}", item_id);
        Ok(())
    }
}
