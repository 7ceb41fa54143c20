use serde_json::json;
use uuid::Uuid;

use super::MarketContext;
use crate::error::{MarketError, MarketResult};
use crate::filter::Filter;
use crate::gateway::{fetch_all, Collection};
use crate::models::Message;
use crate::policy;
use crate::store::QueryKey;
use crate::validation::validate_message;

pub struct MessageService<'a> {
    ctx: &'a MarketContext,
}

impl<'a> MessageService<'a> {
    pub(crate) fn new(ctx: &'a MarketContext) -> Self {
        Self { ctx }
    }

    /// Messaging is gated by tier, and the delivery path does not exist yet:
    /// a permitted send validates the content and then reports it as unavailable.
    pub async fn send(&self, receiver_id: Uuid, content: &str) -> MarketResult<Message> {
        let identity = self.ctx.current_identity();
        policy::require_messaging(identity.as_ref()).map_err(|e| self.ctx.deny(e))?;
        let content = validate_message(content)?;
        tracing::debug!("Message to {} ({} chars) not sent", receiver_id, content.chars().count());
        Err(MarketError::NotImplemented("Messaging"))
    }

    /// Both directions of the conversation with `other`, oldest first.
    pub async fn conversation(&self, other: Uuid) -> MarketResult<Vec<Message>> {
        let identity = self.ctx.current_identity();
        policy::require_messaging(identity.as_ref()).map_err(|e| self.ctx.deny(e))?;
        let me = policy::require_signed_in(identity.as_ref())?.id;

        let store = self.ctx.store();
        let _loading = store.loading();
        let token = store.begin_request(QueryKey::Messages);

        let mut filter = Filter::new(Collection::Messages);
        filter.and_where(json!({
            "$or": [
                { "sender_id": me.to_string(), "receiver_id": other.to_string() },
                { "sender_id": other.to_string(), "receiver_id": me.to_string() }
            ]
        }))?;
        filter.order(json!("created_at asc"))?;

        let messages: Vec<Message> = fetch_all(self.ctx.gateway(), &filter).await?;
        store.apply_messages(token, messages.clone());
        Ok(messages)
    }
}
