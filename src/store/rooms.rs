//! Room record store over a PostgREST-style endpoint.
//!
//! Strictly best-effort: the in-memory registry is the source of truth, every
//! write here is fire-and-forget, and failures are logged and swallowed so
//! play continues uninterrupted. Without configuration the server runs in
//! memory-only mode.

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;

/// Room row as persisted
#[derive(Debug, Clone, Serialize)]
struct RoomRecord {
    room_id: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
struct RoomStatusUpdate {
    status: String,
}

/// REST client bound to the configured store
#[derive(Clone)]
struct StoreClient {
    http: Client,
    base_url: String,
    service_key: String,
}

impl StoreClient {
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn insert<T: Serialize>(&self, table: &str, data: &T) -> Result<(), StoreError> {
        let response = self
            .http
            .post(self.rest_url(table))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(data)
            .send()
            .await
            .map_err(StoreError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, body });
        }
        Ok(())
    }

    async fn update<T: Serialize>(
        &self,
        table: &str,
        query: &str,
        data: &T,
    ) -> Result<(), StoreError> {
        let url = format!("{}?{}", self.rest_url(table), query);
        let response = self
            .http
            .patch(url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .json(data)
            .send()
            .await
            .map_err(StoreError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, body });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },
}

/// Handle the registry uses for room lifecycle writes
#[derive(Clone)]
pub struct RoomStore {
    client: Option<StoreClient>,
}

impl RoomStore {
    pub fn new(config: &Config) -> Self {
        let client = match (&config.store_url, &config.store_service_key) {
            (Some(url), Some(key)) => Some(StoreClient {
                http: Client::new(),
                base_url: url.clone(),
                service_key: key.clone(),
            }),
            _ => {
                warn!("room store not configured, running in memory-only mode");
                None
            }
        };
        Self { client }
    }

    /// A store that never writes (memory-only mode)
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn record_created(&self, room_id: &str) {
        let record = RoomRecord {
            room_id: room_id.to_string(),
            status: "waiting".to_string(),
            created_at: chrono::Utc::now(),
        };
        self.write(room_id, move |client| async move {
            client.insert("rooms", &record).await
        });
    }

    pub fn record_activated(&self, room_id: &str) {
        let query = format!("room_id=eq.{room_id}");
        self.write(room_id, move |client| async move {
            client
                .update(
                    "rooms",
                    &query,
                    &RoomStatusUpdate {
                        status: "active".to_string(),
                    },
                )
                .await
        });
    }

    pub fn record_closed(&self, room_id: &str) {
        let query = format!("room_id=eq.{room_id}");
        self.write(room_id, move |client| async move {
            client
                .update(
                    "rooms",
                    &query,
                    &RoomStatusUpdate {
                        status: "finished".to_string(),
                    },
                )
                .await
        });
    }

    /// Spawn the write so the caller never waits on the store; log and drop
    /// any failure.
    fn write<F, Fut>(&self, room_id: &str, op: F)
    where
        F: FnOnce(StoreClient) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let Some(client) = self.client.clone() else {
            return;
        };
        let room_id = room_id.to_string();
        tokio::spawn(async move {
            match op(client).await {
                Ok(()) => debug!(room_id = %room_id, "room record written"),
                Err(e) => warn!(room_id = %room_id, error = %e, "room store write failed (ignored)"),
            }
        });
    }
}
