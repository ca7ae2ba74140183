use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tracing::warn;

use lightpanel_common::EntityState;

/// Boundary to the home-automation hub. Failures never cross it: a
/// read collapses to `None`, a service call to `false`, both logged.
#[allow(async_fn_in_trait)]
pub trait RemoteStateClient {
    async fn get_entity(&self, entity_id: &str) -> Option<EntityState>;
    async fn call_service(&self, domain: &str, service: &str, payload: Value) -> bool;
}

pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HubClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building hub http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

impl RemoteStateClient for HubClient {
    async fn get_entity(&self, entity_id: &str) -> Option<EntityState> {
        let url = format!("{}/api/states/{entity_id}", self.base_url);
        let response = match self.http.get(&url).bearer_auth(&self.token).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("state read for {entity_id} failed: {err}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("state read for {entity_id} returned {}", response.status());
            return None;
        }

        match response.json::<EntityState>().await {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!("state payload for {entity_id} was malformed: {err}");
                None
            }
        }
    }

    async fn call_service(&self, domain: &str, service: &str, payload: Value) -> bool {
        let url = format!("{}/api/services/{domain}/{service}", self.base_url);
        match self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!("service {domain}.{service} returned {}", response.status());
                false
            }
            Err(err) => {
                warn!("service {domain}.{service} failed: {err}");
                false
            }
        }
    }
}
