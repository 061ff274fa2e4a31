//! Schema lifecycle and caching
//!
//! One provider instance owns the process-wide schema: it fetches the raw
//! document from a `SchemaSource`, builds the index and hands out shared
//! references to it. Concurrent loads are single-flight, a refresh failure
//! keeps the last good index in place, and a cancelled load installs
//! nothing.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};

use crate::error::{Result, SchemaError, TransportError};
use crate::index::SchemaIndex;

/// Source of the raw schema document
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Fetch the raw JSON text of the schema document
    async fn fetch(&self) -> std::result::Result<String, TransportError>;
}

/// Lifecycle phase of the provider, for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    /// No schema loaded and no load running
    Uninitialized,
    /// First load in flight
    Loading,
    /// A schema is installed
    Ready,
    /// A schema is installed and a newer one is being fetched
    Refreshing,
    /// The only load so far failed
    Failed,
}

type LoadResult = std::result::Result<Arc<SchemaIndex>, SchemaError>;

struct ProviderState {
    current: Option<Arc<SchemaIndex>>,
    last_error: Option<SchemaError>,
    in_flight: Option<watch::Receiver<Option<LoadResult>>>,
}

enum Role {
    Leader(watch::Sender<Option<LoadResult>>),
    Follower(watch::Receiver<Option<LoadResult>>),
}

/// Owns the lifecycle of the loaded schema
pub struct SchemaProvider {
    source: Arc<dyn SchemaSource>,
    state: Mutex<ProviderState>,
}

impl SchemaProvider {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self {
            source,
            state: Mutex::new(ProviderState {
                current: None,
                last_error: None,
                in_flight: None,
            }),
        }
    }

    /// Schema currently installed, if any
    pub async fn current(&self) -> Option<Arc<SchemaIndex>> {
        self.state.lock().await.current.clone()
    }

    /// Error of the most recent failed load, if the last load failed
    pub async fn last_error(&self) -> Option<SchemaError> {
        self.state.lock().await.last_error.clone()
    }

    /// Lifecycle phase
    pub async fn status(&self) -> ProviderStatus {
        let mut state = self.state.lock().await;
        // A leader cancelled with no follower waiting leaves a dead flight
        // behind; drop it so the settled phase shows through.
        if let Some(flight) = &state.in_flight {
            if flight.has_changed().is_err() {
                state.in_flight = None;
            }
        }
        match (&state.in_flight, &state.current, &state.last_error) {
            (Some(_), Some(_), _) => ProviderStatus::Refreshing,
            (Some(_), None, _) => ProviderStatus::Loading,
            (None, Some(_), _) => ProviderStatus::Ready,
            (None, None, Some(_)) => ProviderStatus::Failed,
            (None, None, None) => ProviderStatus::Uninitialized,
        }
    }

    /// Return the installed schema, fetching it on first use.
    pub async fn load(&self) -> Result<Arc<SchemaIndex>> {
        self.load_inner(false).await
    }

    /// Fetch the schema again even if one is installed.
    ///
    /// Consumers holding the previous index keep it until the new one is
    /// installed; on failure the previous index stays current.
    pub async fn refresh(&self) -> Result<Arc<SchemaIndex>> {
        self.load_inner(true).await
    }

    async fn load_inner(&self, force: bool) -> Result<Arc<SchemaIndex>> {
        loop {
            let role = {
                let mut state = self.state.lock().await;
                if !force {
                    if let Some(index) = &state.current {
                        return Ok(index.clone());
                    }
                }
                if let Some(rx) = &state.in_flight {
                    Role::Follower(rx.clone())
                } else {
                    let (tx, rx) = watch::channel(None);
                    state.in_flight = Some(rx);
                    Role::Leader(tx)
                }
            };

            match role {
                Role::Leader(tx) => return self.lead_fetch(tx).await,
                Role::Follower(mut rx) => {
                    loop {
                        if let Some(result) = rx.borrow_and_update().clone() {
                            return result;
                        }
                        if rx.changed().await.is_err() {
                            break;
                        }
                    }
                    // The leader went away without publishing a result, so
                    // its caller was cancelled mid-fetch. Discard the dead
                    // flight and contend for the load again.
                    let mut state = self.state.lock().await;
                    if let Some(flight) = &state.in_flight {
                        if flight.has_changed().is_err() {
                            state.in_flight = None;
                        }
                    }
                }
            }
        }
    }

    async fn lead_fetch(&self, tx: watch::Sender<Option<LoadResult>>) -> Result<Arc<SchemaIndex>> {
        info!("loading schema");
        let result = self.fetch_and_build().await;

        let mut state = self.state.lock().await;
        match &result {
            Ok(index) => {
                debug!("schema ready: {} element types", index.len());
                state.current = Some(index.clone());
                state.last_error = None;
            }
            Err(error) => {
                if state.current.is_some() {
                    warn!("schema refresh failed, keeping the previous schema: {error}");
                } else {
                    warn!("schema load failed: {error}");
                }
                state.last_error = Some(error.clone());
            }
        }
        state.in_flight = None;
        drop(state);

        let _ = tx.send(Some(result.clone()));
        result
    }

    async fn fetch_and_build(&self) -> LoadResult {
        let raw = self.source.fetch().await?;
        let index = SchemaIndex::build(&raw)?;
        Ok(Arc::new(index))
    }
}
