//! Remote Data Gateway: the only way the client touches durable state.
//!
//! [`DataGateway`] is a collection query/command interface and [`AuthGateway`]
//! the authentication sub-interface. Rows cross the boundary as JSON and are
//! parsed into typed models by [`fetch_all`] and friends, so malformed rows
//! and relational joins fail here instead of leaking into the store.

pub mod error;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::filter::{Filter, FilterError};
use crate::session::AuthError;

pub use error::GatewayError;
pub use memory::MemoryGateway;
pub use rest::RestGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Jobs,
    JobApplications,
    UserProfiles,
    PortfolioItems,
    Messages,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::Jobs,
        Collection::JobApplications,
        Collection::UserProfiles,
        Collection::PortfolioItems,
        Collection::Messages,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Jobs => "jobs",
            Collection::JobApplications => "job_applications",
            Collection::UserProfiles => "user_profiles",
            Collection::PortfolioItems => "portfolio_items",
            Collection::Messages => "messages",
        }
    }

    pub fn primary_key(&self) -> &'static str {
        match self {
            Collection::UserProfiles => "user_id",
            _ => "id",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.table_name() == s)
            .ok_or_else(|| format!("unknown collection '{}'", s))
    }
}

/// Authenticated principal as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "user_metadata")]
    pub metadata: Value,
}

#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, GatewayError>;

    /// Insert one record and return it as stored.
    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, GatewayError>;

    /// Patch every record matching `filter`; returns the updated rows.
    async fn update(&self, filter: &Filter, patch: Value) -> Result<Vec<Value>, GatewayError>;

    /// Delete every record matching `filter`; returns the deleted rows.
    async fn delete(&self, filter: &Filter) -> Result<Vec<Value>, GatewayError>;

    /// Insert or merge on the `on_conflict` column.
    async fn upsert(&self, collection: Collection, record: Value, on_conflict: &str) -> Result<Value, GatewayError>;
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<Principal, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn current_principal(&self) -> Result<Option<Principal>, AuthError>;

    /// True once the held session can no longer be used.
    fn session_expired(&self) -> bool {
        false
    }
}

/// Both halves of the backend behind one object.
pub trait MarketGateway: DataGateway + AuthGateway {}

impl<T: DataGateway + AuthGateway + ?Sized> MarketGateway for T {}

/// Parse one row into `T`, mapping shape errors to [`GatewayError::MalformedRecord`].
pub fn parse_row<T: DeserializeOwned>(collection: Collection, row: Value) -> Result<T, GatewayError> {
    serde_json::from_value(row).map_err(|e| GatewayError::MalformedRecord {
        collection: collection.table_name(),
        reason: e.to_string(),
    })
}

pub fn parse_rows<T: DeserializeOwned>(collection: Collection, rows: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter().map(|row| parse_row(collection, row)).collect()
}

pub async fn fetch_all<T, G>(gateway: &G, filter: &Filter) -> Result<Vec<T>, GatewayError>
where
    T: DeserializeOwned,
    G: DataGateway + ?Sized,
{
    let rows = gateway.select(filter).await?;
    parse_rows(filter.collection(), rows)
}

pub async fn fetch_optional<T, G>(gateway: &G, filter: &Filter) -> Result<Option<T>, GatewayError>
where
    T: DeserializeOwned,
    G: DataGateway + ?Sized,
{
    let mut rows = gateway.select(filter).await?;
    if rows.is_empty() {
        return Ok(None);
    }
    parse_row(filter.collection(), rows.swap_remove(0)).map(Some)
}

/// Like [`fetch_optional`] but a missing row is [`GatewayError::NotFound`].
pub async fn fetch_one<T, G>(gateway: &G, filter: &Filter) -> Result<T, GatewayError>
where
    T: DeserializeOwned,
    G: DataGateway + ?Sized,
{
    fetch_optional(gateway, filter)
        .await?
        .ok_or_else(|| GatewayError::NotFound(record_label(filter.collection()).to_string()))
}

pub async fn insert_as<T, G, R>(gateway: &G, collection: Collection, record: &R) -> Result<T, GatewayError>
where
    T: DeserializeOwned,
    G: DataGateway + ?Sized,
    R: Serialize + ?Sized,
{
    let row = gateway.insert(collection, serde_json::to_value(record)?).await?;
    parse_row(collection, row)
}

/// Human-readable singular name used in not-found messages.
pub fn record_label(collection: Collection) -> &'static str {
    match collection {
        Collection::Users => "User",
        Collection::Jobs => "Job",
        Collection::JobApplications => "Application",
        Collection::UserProfiles => "Profile",
        Collection::PortfolioItems => "Portfolio item",
        Collection::Messages => "Message",
    }
}

/// Filter selecting a single record by primary key.
pub fn by_id(collection: Collection, id: Uuid) -> Result<Filter, FilterError> {
    let mut filter = Filter::new(collection);
    filter.eq(collection.primary_key(), id.to_string())?;
    Ok(filter)
}
