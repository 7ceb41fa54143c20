//! In-process gateway that evaluates [`Filter`]s against JSON rows.
//!
//! Mirrors the backend closely enough to drive every service end to end:
//! relational embeds resolve through the same foreign keys, sign-up provisions
//! the `users` row the way the database trigger does, and every call is
//! counted so callers can assert that validation failed before any I/O.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{AuthGateway, Collection, DataGateway, GatewayError, Principal};
use crate::filter::filter_select::FilterSelect;
use crate::filter::filter_where::values_equal;
use crate::filter::{Embed, Filter, SelectItem};
use crate::session::AuthError;

const MIN_PASSWORD_LEN: usize = 6;

/// A foreign key, walked in one direction.
struct Relation {
    from: Collection,
    to: Collection,
    local: &'static str,
    foreign: &'static str,
    to_one: bool,
    constraint: &'static str,
}

const RELATIONS: &[Relation] = &[
    Relation { from: Collection::JobApplications, to: Collection::Jobs, local: "job_id", foreign: "id", to_one: true, constraint: "job_applications_job_id_fkey" },
    Relation { from: Collection::JobApplications, to: Collection::Users, local: "tailor_id", foreign: "id", to_one: true, constraint: "job_applications_tailor_id_fkey" },
    Relation { from: Collection::Jobs, to: Collection::Users, local: "posted_by", foreign: "id", to_one: true, constraint: "jobs_posted_by_fkey" },
    Relation { from: Collection::Jobs, to: Collection::JobApplications, local: "id", foreign: "job_id", to_one: false, constraint: "job_applications_job_id_fkey" },
    Relation { from: Collection::Users, to: Collection::UserProfiles, local: "id", foreign: "user_id", to_one: true, constraint: "user_profiles_user_id_fkey" },
    Relation { from: Collection::Users, to: Collection::PortfolioItems, local: "id", foreign: "tailor_id", to_one: false, constraint: "portfolio_items_tailor_id_fkey" },
    Relation { from: Collection::UserProfiles, to: Collection::Users, local: "user_id", foreign: "id", to_one: true, constraint: "user_profiles_user_id_fkey" },
    Relation { from: Collection::PortfolioItems, to: Collection::Users, local: "tailor_id", foreign: "id", to_one: true, constraint: "portfolio_items_tailor_id_fkey" },
    Relation { from: Collection::Messages, to: Collection::Users, local: "sender_id", foreign: "id", to_one: true, constraint: "messages_sender_id_fkey" },
    Relation { from: Collection::Messages, to: Collection::Users, local: "receiver_id", foreign: "id", to_one: true, constraint: "messages_receiver_id_fkey" },
];

struct Account {
    principal: Principal,
    password: String,
}

struct MemoryState {
    tables: HashMap<Collection, Vec<Value>>,
    accounts: Vec<Account>,
    current: Option<Principal>,
    expired: bool,
    provision_users: bool,
    data_failures: VecDeque<GatewayError>,
    auth_failures: VecDeque<AuthError>,
}

pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    invocations: AtomicUsize,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                tables: HashMap::new(),
                accounts: Vec::new(),
                current: None,
                expired: false,
                provision_users: true,
                data_failures: VecDeque::new(),
                auth_failures: VecDeque::new(),
            }),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Disable the sign-up trigger that creates the `users` row.
    pub fn without_user_provisioning(self) -> Self {
        self.lock().provision_users = false;
        self
    }

    /// Number of data and auth calls made so far. Test helpers are not counted.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Insert a row directly, bypassing the call counter.
    pub fn seed(&self, collection: Collection, row: Value) -> Value {
        let row = with_defaults(collection, row);
        self.lock().tables.entry(collection).or_default().push(row.clone());
        row
    }

    /// Snapshot of a table, bypassing the call counter.
    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.lock().tables.get(&collection).cloned().unwrap_or_default()
    }

    /// Fail the next data call with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        self.lock().data_failures.push_back(error);
    }

    /// Fail the next auth call with `error`.
    pub fn fail_next_auth(&self, error: AuthError) {
        self.lock().auth_failures.push_back(error);
    }

    /// Mark the held session as expired.
    pub fn expire_session(&self) {
        self.lock().expired = true;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call and surface any injected data failure.
    fn begin_data(&self) -> Result<MutexGuard<'_, MemoryState>, GatewayError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        match state.data_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    fn begin_auth(&self) -> Result<MutexGuard<'_, MemoryState>, AuthError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        match state.auth_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

impl MemoryState {
    fn table(&self, collection: Collection) -> &[Value] {
        self.tables.get(&collection).map(Vec::as_slice).unwrap_or(&[])
    }

    fn table_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        self.tables.entry(collection).or_default()
    }

    fn find_by(&self, collection: Collection, column: &str, value: &Value) -> Vec<&Value> {
        self.table(collection)
            .iter()
            .filter(|row| row.get(column).map(|v| values_equal(v, value)).unwrap_or(false))
            .collect()
    }

    /// Attach every embed in `items` to `row`, recursively.
    fn embed(&self, collection: Collection, row: &mut Value, items: &[SelectItem]) -> Result<(), GatewayError> {
        for embed in FilterSelect::embeds(items) {
            let relation = resolve_relation(collection, embed)?;
            let key = row.get(relation.local).cloned().unwrap_or(Value::Null);
            let mut related = Vec::new();
            if !key.is_null() {
                for candidate in self.find_by(relation.to, relation.foreign, &key) {
                    let mut child = candidate.clone();
                    self.embed(relation.to, &mut child, &embed.items)?;
                    related.push(project(&embed.items, &child));
                }
            }
            let value = if relation.to_one {
                related.into_iter().next().unwrap_or(Value::Null)
            } else {
                Value::Array(related)
            };
            if let Some(obj) = row.as_object_mut() {
                obj.insert(embed.alias.clone(), value);
            }
        }
        Ok(())
    }

    fn select(&self, filter: &Filter) -> Result<Vec<Value>, GatewayError> {
        let collection = filter.collection();
        let mut rows = Vec::new();
        for row in self.table(collection) {
            let mut row = row.clone();
            self.embed(collection, &mut row, filter.select_items())?;
            if filter.matches(&row) {
                rows.push(row);
            }
        }
        filter.apply_order_and_page(&mut rows);
        Ok(rows.iter().map(|row| project(filter.select_items(), row)).collect())
    }

    fn check_unique(&self, collection: Collection, row: &Value) -> Result<(), GatewayError> {
        let pk = collection.primary_key();
        let Some(key) = row.get(pk) else {
            return Ok(());
        };
        if !self.find_by(collection, pk, key).is_empty() {
            return Err(GatewayError::Status {
                status: 409,
                message: format!("duplicate key value violates unique constraint \"{}_pkey\"", collection),
            });
        }
        Ok(())
    }

    fn provision_user(&mut self, principal: &Principal) {
        let now = Utc::now().to_rfc3339();
        let metadata = &principal.metadata;
        let row = json!({
            "id": principal.id,
            "email": principal.email,
            "role": metadata.get("role").cloned().unwrap_or(Value::Null),
            "subscription_status": metadata
                .get("subscription_status")
                .cloned()
                .unwrap_or_else(|| json!("free")),
            "created_at": now,
            "updated_at": now,
        });
        self.table_mut(Collection::Users).push(row);
    }
}

fn resolve_relation(from: Collection, embed: &Embed) -> Result<&'static Relation, GatewayError> {
    let to: Collection = embed.table.parse().map_err(|e: String| GatewayError::Status { status: 400, message: e })?;
    let candidates: Vec<&Relation> = RELATIONS
        .iter()
        .filter(|r| r.from == from && r.to == to)
        .filter(|r| match &embed.hint {
            Some(hint) => r.constraint == hint || r.local == hint,
            None => true,
        })
        .collect();

    match candidates.as_slice() {
        [single] => Ok(single),
        [] => Err(GatewayError::Status {
            status: 400,
            message: format!("no relationship between '{}' and '{}'", from, to),
        }),
        _ => Err(GatewayError::Status {
            status: 300,
            message: format!("more than one relationship between '{}' and '{}'", from, to),
        }),
    }
}

/// Select the requested columns and keep embedded aliases.
fn project(items: &[SelectItem], row: &Value) -> Value {
    let mut out = FilterSelect::project(items, row);
    if let (Some(out_obj), Some(row_obj)) = (out.as_object_mut(), row.as_object()) {
        for embed in FilterSelect::embeds(items) {
            if let Some(value) = row_obj.get(&embed.alias) {
                out_obj.insert(embed.alias.clone(), value.clone());
            }
        }
    }
    out
}

fn with_defaults(collection: Collection, row: Value) -> Value {
    let mut obj = match row {
        Value::Object(obj) => obj,
        other => return other,
    };
    if collection.primary_key() == "id" && !obj.contains_key("id") {
        obj.insert("id".to_string(), json!(Uuid::new_v4()));
    }
    let now = json!(Utc::now().to_rfc3339());
    obj.entry("created_at").or_insert_with(|| now.clone());
    if collection == Collection::UserProfiles || collection == Collection::Users {
        obj.entry("updated_at").or_insert(now);
    }
    Value::Object(obj)
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn require_object(collection: Collection, record: &Value) -> Result<(), GatewayError> {
    if record.is_object() {
        Ok(())
    } else {
        Err(GatewayError::MalformedRecord {
            collection: collection.table_name(),
            reason: "record must be a JSON object".to_string(),
        })
    }
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, GatewayError> {
        let state = self.begin_data()?;
        state.select(filter)
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, GatewayError> {
        let mut state = self.begin_data()?;
        require_object(collection, &record)?;
        let row = with_defaults(collection, record);
        state.check_unique(collection, &row)?;
        state.table_mut(collection).push(row.clone());
        Ok(row)
    }

    async fn update(&self, filter: &Filter, patch: Value) -> Result<Vec<Value>, GatewayError> {
        let mut state = self.begin_data()?;
        require_object(filter.collection(), &patch)?;
        let mut updated = Vec::new();
        for row in state.table_mut(filter.collection()).iter_mut() {
            if filter.matches(row) {
                merge(row, &patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, filter: &Filter) -> Result<Vec<Value>, GatewayError> {
        let mut state = self.begin_data()?;
        let table = state.table_mut(filter.collection());
        let (deleted, kept): (Vec<Value>, Vec<Value>) = table.drain(..).partition(|row| filter.matches(row));
        *table = kept;
        Ok(deleted)
    }

    async fn upsert(&self, collection: Collection, record: Value, on_conflict: &str) -> Result<Value, GatewayError> {
        let mut state = self.begin_data()?;
        require_object(collection, &record)?;
        let key = record.get(on_conflict).cloned().unwrap_or(Value::Null);
        if !key.is_null() {
            let existing = state
                .table_mut(collection)
                .iter_mut()
                .find(|row| row.get(on_conflict).map(|v| values_equal(v, &key)).unwrap_or(false));
            if let Some(row) = existing {
                merge(row, &record);
                if let Some(obj) = row.as_object_mut() {
                    obj.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
                }
                return Ok(row.clone());
            }
        }
        let row = with_defaults(collection, record);
        state.table_mut(collection).push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl AuthGateway for MemoryGateway {
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<Principal, AuthError> {
        let mut state = self.begin_auth()?;
        let normalized = email.trim().to_lowercase();
        if state.accounts.iter().any(|a| a.principal.email.as_deref() == Some(normalized.as_str())) {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let principal = Principal {
            id: Uuid::new_v4(),
            email: Some(normalized),
            metadata: if metadata.is_object() { metadata } else { Value::Object(Map::new()) },
        };
        if state.provision_users {
            state.provision_user(&principal);
        }
        state.accounts.push(Account { principal: principal.clone(), password: password.to_string() });
        state.current = Some(principal.clone());
        state.expired = false;
        Ok(principal)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let mut state = self.begin_auth()?;
        let normalized = email.trim().to_lowercase();
        let principal = state
            .accounts
            .iter()
            .find(|a| a.principal.email.as_deref() == Some(normalized.as_str()) && a.password == password)
            .map(|a| a.principal.clone())
            .ok_or(AuthError::InvalidCredentials)?;
        state.current = Some(principal.clone());
        state.expired = false;
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut state = self.begin_auth()?;
        state.current = None;
        state.expired = false;
        Ok(())
    }

    async fn current_principal(&self) -> Result<Option<Principal>, AuthError> {
        let state = self.begin_auth()?;
        if state.expired {
            return Ok(None);
        }
        Ok(state.current.clone())
    }

    fn session_expired(&self) -> bool {
        let state = self.lock();
        state.current.is_some() && state.expired
    }
}
