mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::json;

use tailor_market::error::MarketError;
use tailor_market::gateway::Collection;
use tailor_market::models::{Role, SubscriptionTier};

#[tokio::test]
async fn free_tier_cannot_message() -> Result<()> {
    let h = common::Harness::new();
    let boutique = h.sign_up("shop@boutique.in", Role::Poster).await?;
    h.sign_up("asha@stitch.in", Role::Provider).await?;

    let err = h.ctx.messages().send(boutique.id, "Namaste").await.unwrap_err();
    assert!(err.is_paywall());
    assert!(h.ctx.store().snapshot().is_paywall_visible);
    Ok(())
}

#[tokio::test]
async fn subscriber_send_is_not_available_yet() -> Result<()> {
    let h = common::Harness::new();
    let boutique = h.sign_up("shop@boutique.in", Role::Poster).await?;
    h.subscriber("asha@stitch.in", Role::Provider, SubscriptionTier::Basic).await?;

    let err = h.ctx.messages().send(boutique.id, "   ").await.unwrap_err();
    assert_eq!(err.user_message(), "Message cannot be empty");

    let err = h.ctx.messages().send(boutique.id, "Namaste").await.unwrap_err();
    assert!(matches!(err, MarketError::NotImplemented(_)));
    assert!(h.gateway.rows(Collection::Messages).is_empty());
    Ok(())
}

#[tokio::test]
async fn conversation_is_oldest_first() -> Result<()> {
    let h = common::Harness::new();
    let boutique = h.sign_up("shop@boutique.in", Role::Poster).await?;
    let me = h.subscriber("asha@stitch.in", Role::Provider, SubscriptionTier::Premium).await?;
    let stranger = uuid::Uuid::new_v4();
    let now = Utc::now();

    h.gateway.seed(Collection::Messages, json!({
        "sender_id": boutique.id, "receiver_id": me.id, "content": "Can you start Monday?",
        "created_at": (now - Duration::minutes(5)).to_rfc3339(),
    }));
    h.gateway.seed(Collection::Messages, json!({
        "sender_id": me.id, "receiver_id": boutique.id, "content": "Yes",
        "created_at": now.to_rfc3339(),
    }));
    h.gateway.seed(Collection::Messages, json!({
        "sender_id": stranger, "receiver_id": me.id, "content": "Unrelated",
        "created_at": (now - Duration::minutes(10)).to_rfc3339(),
    }));

    let thread = h.ctx.messages().conversation(boutique.id).await?;
    let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Can you start Monday?", "Yes"]);
    assert_eq!(h.ctx.store().snapshot().messages.len(), 2);
    Ok(())
}

#[tokio::test]
async fn plans_are_listed_in_rupees() -> Result<()> {
    let h = common::Harness::new();
    let plans = h.ctx.subscriptions().plans();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].price, 500);
    assert_eq!(plans[1].tier, SubscriptionTier::Premium);
    assert!(plans.iter().all(|p| p.currency == "INR"));
    Ok(())
}

#[tokio::test]
async fn checkout_does_not_change_tier() -> Result<()> {
    let h = common::Harness::new();
    h.sign_up("asha@stitch.in", Role::Provider).await?;

    let err = h.ctx.subscriptions().subscribe("gold_yearly").await.unwrap_err();
    assert!(err.field_errors().is_some_and(|f| f.contains_key("plan")));

    let err = h.ctx.subscriptions().subscribe("basic_monthly").await.unwrap_err();
    assert!(matches!(err, MarketError::NotImplemented(_)));
    assert_eq!(h.ctx.store().identity().map(|i| i.subscription_tier), Some(SubscriptionTier::Free));
    Ok(())
}

#[tokio::test]
async fn signed_out_users_cannot_subscribe() -> Result<()> {
    let h = common::Harness::new();
    let err = h.ctx.subscriptions().subscribe("basic_monthly").await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_SIGNED_IN");
    Ok(())
}
