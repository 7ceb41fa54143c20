use super::MarketContext;
use crate::config;
use crate::error::{MarketError, MarketResult};
use crate::models::plan::{find_plan, PLANS};
use crate::models::SubscriptionPlan;
use crate::validation::ValidationError;

pub struct SubscriptionService<'a> {
    ctx: &'a MarketContext,
}

impl<'a> SubscriptionService<'a> {
    pub(crate) fn new(ctx: &'a MarketContext) -> Self {
        Self { ctx }
    }

    pub fn plans(&self) -> &'static [&'static SubscriptionPlan] {
        &PLANS
    }

    /// Start checkout for `plan_id`. The payment flow is not wired up, so a
    /// valid request ends in `NotImplemented` without touching the tier.
    pub async fn subscribe(&self, plan_id: &str) -> MarketResult<&'static SubscriptionPlan> {
        let identity = self.ctx.require_identity()?;
        let plan = find_plan(plan_id)
            .ok_or_else(|| ValidationError::field("plan", format!("Unknown plan '{}'", plan_id)))?;

        let has_key = config::config()
            .and_then(|c| c.integrations.payment_key_id.as_deref())
            .is_some_and(|k| !k.is_empty());
        tracing::info!(
            "Checkout requested by {} for {} ({} {}), payment key configured: {}",
            identity.email,
            plan.id,
            plan.price,
            plan.currency,
            has_key
        );
        Err(MarketError::NotImplemented("Payment checkout"))
    }

    pub async fn cancel(&self) -> MarketResult<()> {
        let identity = self.ctx.require_identity()?;
        tracing::info!("Cancellation requested by {}", identity.email);
        Err(MarketError::NotImplemented("Subscription cancellation"))
    }
}
