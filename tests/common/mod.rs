#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};

use tailor_market::gateway::MemoryGateway;
use tailor_market::models::{Identity, Job, Role, SubscriptionTier};
use tailor_market::services::MarketContext;
use tailor_market::validation::{JobDraft, SignUpForm};

pub const PASSWORD: &str = "stitch123";

/// A context wired to an in-memory backend.
pub struct Harness {
    pub gateway: Arc<MemoryGateway>,
    pub ctx: MarketContext,
}

impl Harness {
    pub fn new() -> Self {
        let gateway = Arc::new(MemoryGateway::new());
        let ctx = MarketContext::new(gateway.clone());
        Self { gateway, ctx }
    }

    /// Sign up `email` with `role`; the session stays signed in as that user.
    pub async fn sign_up(&self, email: &str, role: Role) -> Result<Identity> {
        let form = SignUpForm {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            confirm_password: PASSWORD.to_string(),
            role,
        };
        Ok(self.ctx.sign_up(&form).await?)
    }

    /// Sign up and move onto `tier`.
    pub async fn subscriber(&self, email: &str, role: Role, tier: SubscriptionTier) -> Result<Identity> {
        let identity = self.sign_up(email, role).await?;
        Ok(self.ctx.set_subscription_tier(identity.id, tier).await?)
    }

    pub async fn sign_in(&self, email: &str) -> Result<Identity> {
        let form = tailor_market::validation::SignInForm { email: email.to_string(), password: PASSWORD.to_string() };
        Ok(self.ctx.sign_in(&form).await?)
    }

    /// Sign up a boutique and post one open job as it.
    pub async fn boutique_with_job(&self, email: &str) -> Result<(Identity, Job)> {
        let boutique = self.sign_up(email, Role::Poster).await?;
        let job = self.ctx.jobs().post(&job_draft("Bridal lehenga alteration")).await?;
        Ok((boutique, job))
    }
}

pub fn job_draft(title: &str) -> JobDraft {
    JobDraft {
        title: title.to_string(),
        description: "Hand embroidery on a red silk lehenga".to_string(),
        budget_min: "15000".to_string(),
        budget_max: "25000".to_string(),
        location: "Mumbai".to_string(),
        deadline: (Utc::now() + Duration::days(30)).format("%Y-%m-%d").to_string(),
        requirements: "Zardozi experience".to_string(),
        job_type: Default::default(),
    }
}
