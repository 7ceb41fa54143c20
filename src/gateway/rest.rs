//! Reqwest-backed gateway for a PostgREST data API with a GoTrue auth service.
//!
//! This adapter owns transport details only: URL and header construction,
//! HTTP error mapping, and session persistence between CLI invocations.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{AuthGateway, Collection, DataGateway, GatewayError, Principal};
use crate::config::AppConfig;
use crate::filter::{Filter, QueryPairs};
use crate::session::AuthError;

const REST_PREFIX: &str = "rest/v1/";
const AUTH_PREFIX: &str = "auth/v1/";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Tokens held for the signed-in principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: Principal,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: i64,
}

pub struct RestGateway {
    client: Client,
    base_url: Url,
    anon_key: String,
    session: RwLock<Option<AuthSession>>,
    session_file: Option<PathBuf>,
}

impl RestGateway {
    /// Build a gateway from configuration, restoring a persisted session if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(map_transport_error)?;

        let session_file = config.gateway.session_file.clone();
        let session = session_file.as_deref().and_then(load_session);
        if session.is_some() {
            tracing::debug!("Restored persisted session");
        }

        Ok(Self {
            client,
            base_url: with_trailing_slash(config.backend.url.clone()),
            anon_key: config.backend.anon_key.clone(),
            session: RwLock::new(session),
            session_file,
        })
    }

    fn rest_url(&self, collection: Collection) -> Result<Url, GatewayError> {
        self.base_url
            .join(&format!("{}{}", REST_PREFIX, collection.table_name()))
            .map_err(|e| GatewayError::Network(format!("invalid REST url: {}", e)))
    }

    fn auth_url(&self, path: &str) -> Result<Url, AuthError> {
        self.base_url
            .join(&format!("{}{}", AUTH_PREFIX, path))
            .map_err(|e| AuthError::Network(format!("invalid auth url: {}", e)))
    }

    fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    fn current_session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_session(&self, session: Option<AuthSession>) {
        if let Some(path) = &self.session_file {
            let result = match &session {
                Some(s) => save_session(path, s),
                None => remove_session(path),
            };
            if let Err(e) = result {
                tracing::warn!("Failed to persist session to {}: {}", path.display(), e);
            }
        }
        *self.session.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    /// Common headers: the anon key always, the user's bearer token when signed in.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        self.client
            .request(method, url)
            .header("apikey", self.anon_key.as_str())
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", bearer))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send_rows(&self, builder: RequestBuilder) -> Result<Vec<Value>, GatewayError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let body = read_success(response).await?;
        match body {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(vec![]),
            other => Ok(vec![other]),
        }
    }

    async fn send_auth(&self, builder: RequestBuilder) -> Result<Value, AuthError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(map_auth_error(status, &body));
        }
        Ok(body)
    }

    /// Accept either a full token response or a bare user object.
    fn accept_auth_response(&self, body: Value) -> Result<Principal, AuthError> {
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body)
                .map_err(|e| AuthError::Backend(format!("unexpected session payload: {}", e)))?;
            let principal = session.user.clone();
            self.store_session(Some(session));
            return Ok(principal);
        }
        let user = body.get("user").cloned().unwrap_or(body);
        serde_json::from_value(user).map_err(|e| AuthError::Backend(format!("unexpected user payload: {}", e)))
    }
}

#[async_trait]
impl DataGateway for RestGateway {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, GatewayError> {
        let url = self.rest_url(filter.collection())?;
        tracing::debug!("GET {} {:?}", url, filter.to_query_pairs());
        self.send_rows(self.request(Method::GET, url).query(&filter.to_query_pairs()))
            .await
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, GatewayError> {
        let url = self.rest_url(collection)?;
        tracing::debug!("POST {}", url);
        let rows = self
            .send_rows(
                self.request(Method::POST, url)
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&record),
            )
            .await?;
        first_row(collection, rows)
    }

    async fn update(&self, filter: &Filter, patch: Value) -> Result<Vec<Value>, GatewayError> {
        let url = self.rest_url(filter.collection())?;
        let pairs = scoped_pairs(filter)?;
        tracing::debug!("PATCH {} {:?}", url, pairs);
        self.send_rows(
            self.request(Method::PATCH, url)
                .query(&pairs)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(&patch),
        )
        .await
    }

    async fn delete(&self, filter: &Filter) -> Result<Vec<Value>, GatewayError> {
        let url = self.rest_url(filter.collection())?;
        let pairs = scoped_pairs(filter)?;
        tracing::debug!("DELETE {} {:?}", url, pairs);
        self.send_rows(
            self.request(Method::DELETE, url)
                .query(&pairs)
                .header("Prefer", RETURN_REPRESENTATION),
        )
        .await
    }

    async fn upsert(&self, collection: Collection, record: Value, on_conflict: &str) -> Result<Value, GatewayError> {
        let url = self.rest_url(collection)?;
        tracing::debug!("POST {} on_conflict={}", url, on_conflict);
        let rows = self
            .send_rows(
                self.request(Method::POST, url)
                    .query(&[("on_conflict", on_conflict)])
                    .header("Prefer", format!("resolution=merge-duplicates,{}", RETURN_REPRESENTATION))
                    .json(&record),
            )
            .await?;
        first_row(collection, rows)
    }
}

#[async_trait]
impl AuthGateway for RestGateway {
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<Principal, AuthError> {
        let url = self.auth_url("signup")?;
        let body = self
            .send_auth(
                self.request(Method::POST, url)
                    .json(&json!({ "email": email, "password": password, "data": metadata })),
            )
            .await?;
        self.accept_auth_response(body)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let url = self.auth_url("token")?;
        let body = self
            .send_auth(
                self.request(Method::POST, url)
                    .query(&[("grant_type", "password")])
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        if body.get("access_token").is_none() {
            return Err(AuthError::Backend("sign-in returned no session".to_string()));
        }
        self.accept_auth_response(body)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.access_token().is_none() {
            return Ok(());
        }
        let url = self.auth_url("logout")?;
        let result = self.send_auth(self.request(Method::POST, url)).await;
        // The local session is dropped even when the remote call fails.
        self.store_session(None);
        result.map(|_| ())
    }

    async fn current_principal(&self) -> Result<Option<Principal>, AuthError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if token_expired(&session.access_token) {
            tracing::info!("Stored session has expired");
            self.store_session(None);
            return Ok(None);
        }

        let url = self.auth_url("user")?;
        match self.send_auth(self.request(Method::GET, url)).await {
            Ok(body) => serde_json::from_value(body)
                .map(Some)
                .map_err(|e| AuthError::Backend(format!("unexpected user payload: {}", e))),
            Err(AuthError::NotAuthenticated) => {
                self.store_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn session_expired(&self) -> bool {
        match self.access_token() {
            Some(token) => token_expired(&token),
            None => false,
        }
    }
}

/// Decode the JWT `exp` claim without verifying the signature; the backend verifies.
pub fn token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.exp)
}

/// Tokens whose expiry cannot be read count as expired.
pub fn token_expired(token: &str) -> bool {
    match token_expiry(token) {
        Some(exp) => exp <= chrono::Utc::now().timestamp(),
        None => true,
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// PATCH and DELETE without a filter would touch the whole table.
fn scoped_pairs(filter: &Filter) -> Result<QueryPairs, GatewayError> {
    let pairs = filter.to_where_pairs();
    if pairs.is_empty() {
        return Err(GatewayError::Status {
            status: 400,
            message: format!("refusing unscoped write to {}", filter.collection()),
        });
    }
    Ok(pairs)
}

fn first_row(collection: Collection, rows: Vec<Value>) -> Result<Value, GatewayError> {
    rows.into_iter().next().ok_or_else(|| GatewayError::MalformedRecord {
        collection: collection.table_name(),
        reason: "write returned no representation".to_string(),
    })
}

async fn read_success(response: Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status_error(status, bytes.as_ref()));
    }
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes.as_ref())?)
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Network("request timed out".to_string())
    } else {
        GatewayError::Network(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    let parsed: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let message = error_message(&parsed).unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    GatewayError::Status { status: status.as_u16(), message }
}

fn error_message(body: &Value) -> Option<String> {
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn map_auth_error(status: StatusCode, body: &Value) -> AuthError {
    let message = error_message(body).unwrap_or_else(|| status.to_string());
    let lowered = message.to_lowercase();

    if status == StatusCode::UNAUTHORIZED {
        AuthError::NotAuthenticated
    } else if lowered.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else if lowered.contains("already registered") || lowered.contains("already exists") {
        AuthError::EmailAlreadyRegistered
    } else if lowered.contains("email not confirmed") {
        AuthError::EmailNotConfirmed
    } else if lowered.contains("password") && (lowered.contains("at least") || lowered.contains("weak")) {
        AuthError::WeakPassword(message)
    } else if status.is_server_error() {
        AuthError::Network(message)
    } else {
        AuthError::Backend(message)
    }
}

fn load_session(path: &Path) -> Option<AuthSession> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!("Ignoring unreadable session file {}: {}", path.display(), e);
            None
        }
    }
}

fn save_session(path: &Path, session: &AuthSession) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(session)?)?;
    Ok(())
}

fn remove_session(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
