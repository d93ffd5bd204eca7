//! OAuth client-credentials token lifecycle.
//!
//! One token is cached per provider. It is handed out until it comes within
//! the safety margin of its reported expiry, at which point the next caller
//! performs a fresh exchange. Refresh is serialized behind an async mutex so
//! concurrent callers never issue duplicate exchanges.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{to_chrono, Clock};
use crate::config::{Credentials, API_SCOPE};
use crate::error::{ListingsError, Result};
use crate::models::wire::{ApiErrorBody, TokenResponse};
use crate::transport::{execute_with_timeout, HttpRequest, Transport};

/// A bearer token and the instants that bound its use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    /// When the upstream says the token stops working.
    pub expires_at: DateTime<Utc>,
    /// When this provider stops handing it out (`expires_at - margin`).
    pub refresh_at: DateTime<Utc>,
}

pub struct TokenProvider {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    credentials: Credentials,
    token_url: String,
    margin: Duration,
    timeout: Duration,
    current: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        credentials: Credentials,
        token_url: impl Into<String>,
        margin: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            clock,
            credentials,
            token_url: token_url.into(),
            margin,
            timeout,
            current: Mutex::new(None),
        }
    }

    /// Return a usable bearer token, exchanging credentials if the cached one
    /// is missing or inside the safety margin.
    ///
    /// A returned token always has more than the margin left before expiry;
    /// an exchange that yields a shorter lifetime is an auth error.
    pub async fn token(&self) -> Result<String> {
        let mut guard = self.current.lock().await;
        if let Some(token) = guard.as_ref() {
            if self.clock.now() < token.refresh_at {
                return Ok(token.value.clone());
            }
            debug!(expires_at = %token.expires_at, "access token within safety margin, refreshing");
        }

        let fresh = self.request_new_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    /// Drop the cached token so the next [`token`](Self::token) call re-authenticates.
    pub async fn invalidate(&self) {
        let mut guard = self.current.lock().await;
        if guard.take().is_some() {
            info!("access token invalidated");
        }
    }

    /// Snapshot of the cached token, if any.
    pub async fn cached(&self) -> Option<AccessToken> {
        self.current.lock().await.clone()
    }

    async fn request_new_token(&self) -> Result<AccessToken> {
        let basic = STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));
        let request = HttpRequest::post_form(
            self.token_url.clone(),
            vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("scope".to_string(), API_SCOPE.to_string()),
            ],
        )
        .header("Authorization", format!("Basic {}", basic));

        let response = execute_with_timeout(self.transport.as_ref(), request, self.timeout)
            .await
            .map_err(|e| ListingsError::Auth(format!("token request failed: {}", e)))?;

        if !response.is_success() {
            let detail = serde_json::from_str::<ApiErrorBody>(&response.body)
                .ok()
                .and_then(|b| b.summary())
                .unwrap_or_else(|| response.body.clone());
            warn!(status = response.status, "token exchange rejected");
            return Err(ListingsError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                response.status, detail
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| ListingsError::Auth(format!("malformed token response: {}", e)))?;
        if parsed.access_token.is_empty() {
            return Err(ListingsError::Auth(
                "token endpoint returned an empty access token".into(),
            ));
        }

        let now = self.clock.now();
        let lifetime = Duration::from_secs(parsed.expires_in);
        if lifetime <= self.margin {
            warn!(
                expires_in = parsed.expires_in,
                margin_secs = self.margin.as_secs(),
                "token lifetime does not exceed safety margin"
            );
            return Err(ListingsError::Auth(format!(
                "token lifetime of {}s does not exceed the {}s safety margin",
                parsed.expires_in,
                self.margin.as_secs()
            )));
        }
        let (Some(expires_at), Some(refresh_at)) = (
            now.checked_add_signed(to_chrono(lifetime)),
            now.checked_add_signed(to_chrono(lifetime - self.margin)),
        ) else {
            return Err(ListingsError::Auth(format!(
                "token endpoint returned an out-of-range expires_in: {}",
                parsed.expires_in
            )));
        };
        info!(expires_in = parsed.expires_in, "obtained access token");

        Ok(AccessToken {
            value: parsed.access_token,
            expires_at,
            refresh_at,
        })
    }
}
