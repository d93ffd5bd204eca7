//! Authorized request plumbing shared by search and enrichment.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{Endpoints, MARKETPLACE_HEADER};
use crate::error::Result;
use crate::token::TokenProvider;
use crate::transport::{execute_with_timeout, HttpRequest, HttpResponse, Transport};

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenProvider>,
    endpoints: Endpoints,
    marketplace_id: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenProvider>,
        endpoints: Endpoints,
        marketplace_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            tokens,
            endpoints,
            marketplace_id: marketplace_id.into(),
            timeout,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Send a GET with bearer auth and the marketplace header.
    ///
    /// Token failures surface as [`crate::ListingsError::Auth`]. A 401 reply
    /// invalidates the cached token; the response is still returned so the
    /// caller can classify it.
    pub async fn get(&self, request: HttpRequest) -> Result<HttpResponse> {
        let token = self.tokens.token().await?;
        let request = request
            .header("Authorization", format!("Bearer {}", token))
            .header(MARKETPLACE_HEADER, self.marketplace_id.clone());
        let url = request.url.clone();
        let response = execute_with_timeout(self.transport.as_ref(), request, self.timeout).await?;
        debug!(url = %url, status = response.status, "upstream response");
        if response.status == 401 {
            self.tokens.invalidate().await;
        }
        Ok(response)
    }
}
