// Garmin Connect gateway implementation
use crate::application::health_gateway::{GatewayError, HealthGateway, is_empty_payload};
use crate::application::time_source::TimeSource;
use crate::domain::period::DatePeriod;
use crate::infrastructure::garmin::endpoints::Endpoint;
use crate::infrastructure::garmin::session::{Credentials, SessionStore, SessionToken};
use anyhow::Context;
use async_trait::async_trait;
use chrono::TimeDelta;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct GarminClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    credentials: Credentials,
    store: Option<SessionStore>,
    clock: Arc<dyn TimeSource>,
    session: RwLock<Option<SessionToken>>,
}

impl GarminClient {
    pub fn new(
        base_url: String,
        token_url: String,
        credentials: Credentials,
        store: Option<SessionStore>,
        clock: Arc<dyn TimeSource>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url,
            credentials,
            store,
            clock,
            session: RwLock::new(None),
        })
    }

    fn saved_session(&self) -> Option<SessionToken> {
        let store = self.store.as_ref()?;
        match store.load() {
            Ok(Some(token)) if token.is_valid_at(self.clock.now()) => Some(token),
            Ok(Some(_)) => {
                debug!("Saved Garmin session has expired");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable Garmin session: {:#}", e);
                None
            }
        }
    }

    /// Exchanges credentials for a fresh token, persisting it when a session dir is set
    async fn login(&self) -> Result<(), GatewayError> {
        let password = self.credentials.password.as_ref().ok_or_else(|| {
            GatewayError::Authentication(
                "no valid saved session and no password configured".to_string(),
            )
        })?;

        let response = self
            .http
            .post(&self.token_url)
            .json(&LoginRequest {
                email: &self.credentials.email,
                password: password.expose(),
            })
            .send()
            .await
            .map_err(|e| GatewayError::Authentication(format!("login request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(GatewayError::Authentication(format!(
                "login rejected with status {}",
                status
            )));
        }

        let body = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| GatewayError::Authentication(format!("invalid token response: {}", e)))?;

        let token = SessionToken {
            access_token: body.access_token,
            expires_at: self.clock.now() + TimeDelta::seconds(body.expires_in),
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&token) {
                warn!("Failed to save Garmin session: {:#}", e);
            }
        }

        info!("Logged in to Garmin Connect as {}", self.credentials.email);
        *self.session.write().await = Some(token);
        Ok(())
    }

    // The saved session was just rejected, so it must not be reused
    async fn reauthenticate(&self) -> Result<(), GatewayError> {
        *self.session.write().await = None;
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                warn!("Failed to clear Garmin session: {:#}", e);
            }
        }
        self.login().await
    }

    async fn fetch_once(
        &self,
        endpoint: Endpoint,
        period: &DatePeriod,
    ) -> Result<Option<Value>, GatewayError> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or_else(|| GatewayError::Authentication("not logged in".to_string()))?;

        let url = format!("{}{}", self.base_url, endpoint.path(period));
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Authentication(format!(
                "{} responded with status {}",
                endpoint, status
            )));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| GatewayError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        decode_payload(endpoint, &body)
    }
}

fn decode_payload(endpoint: Endpoint, body: &str) -> Result<Option<Value>, GatewayError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(body).map_err(|e| GatewayError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;
    if is_empty_payload(&value) {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Runs `operation`, and after an authentication failure re-authenticates and
/// runs it exactly once more
pub async fn with_reauth<T, Op, OpFut, Auth, AuthFut>(
    mut operation: Op,
    mut reauthenticate: Auth,
) -> Result<T, GatewayError>
where
    Op: FnMut() -> OpFut,
    OpFut: Future<Output = Result<T, GatewayError>>,
    Auth: FnMut() -> AuthFut,
    AuthFut: Future<Output = Result<(), GatewayError>>,
{
    match operation().await {
        Err(e) if e.is_authentication() => {
            warn!("{}; re-authenticating once", e);
            reauthenticate().await?;
            operation().await
        }
        other => other,
    }
}

#[async_trait]
impl HealthGateway for GarminClient {
    async fn authenticate(&self) -> Result<(), GatewayError> {
        if let Some(token) = self.saved_session() {
            info!("Reusing saved Garmin session for {}", self.credentials.email);
            *self.session.write().await = Some(token);
            return Ok(());
        }
        self.login().await
    }

    async fn fetch(
        &self,
        endpoint: Endpoint,
        period: &DatePeriod,
    ) -> Result<Option<Value>, GatewayError> {
        with_reauth(
            || self.fetch_once(endpoint, period),
            || self.reauthenticate(),
        )
        .await
    }
}
