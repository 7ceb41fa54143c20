use serde::Serialize;

use super::identity::SubscriptionTier;

/// A purchasable subscription plan. Prices are whole rupees per month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub tier: SubscriptionTier,
    pub price: u32,
    pub currency: &'static str,
    pub features: &'static [&'static str],
}

pub const BASIC_PLAN: SubscriptionPlan = SubscriptionPlan {
    id: "basic_monthly",
    name: "Basic Plan",
    tier: SubscriptionTier::Basic,
    price: 500,
    currency: "INR",
    features: &[
        "Access to job details",
        "Apply to jobs",
        "Basic messaging",
        "Profile visibility",
    ],
};

pub const PREMIUM_PLAN: SubscriptionPlan = SubscriptionPlan {
    id: "premium_monthly",
    name: "Premium Plan",
    tier: SubscriptionTier::Premium,
    price: 1500,
    currency: "INR",
    features: &[
        "All Basic features",
        "Priority job listings",
        "Advanced messaging",
        "Portfolio showcase",
        "Analytics dashboard",
    ],
};

pub const PLANS: [&SubscriptionPlan; 2] = [&BASIC_PLAN, &PREMIUM_PLAN];

pub fn find_plan(id: &str) -> Option<&'static SubscriptionPlan> {
    PLANS.iter().copied().find(|p| p.id == id)
}
