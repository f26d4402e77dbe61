use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::{CodeVerifier, SessionRegistry};
use crate::error::AppError;
use crate::models::event::RequestEvent;
use crate::observability::metrics::Metrics;
use crate::storage::Storage;
use crate::store::RequestStore;

pub struct AppState {
    pub requests: RequestStore,
    pub sessions: SessionRegistry,
    pub verifier: Arc<dyn CodeVerifier>,
    pub request_events_tx: broadcast::Sender<RequestEvent>,
    pub metrics: Metrics,
}

impl AppState {
    /// Builds the state, reloading any requests and sessions already in `storage`.
    pub fn new(
        storage: Arc<dyn Storage>,
        verifier: Arc<dyn CodeVerifier>,
        event_buffer_size: usize,
    ) -> Result<Self, AppError> {
        let requests = RequestStore::load(storage.clone())?;
        let sessions = SessionRegistry::load(storage)?;
        let (request_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        let metrics = Metrics::new();
        metrics.pickup_requests.set(requests.len() as i64);
        metrics.active_sessions.set(sessions.len() as i64);

        Ok(Self {
            requests,
            sessions,
            verifier,
            request_events_tx,
            metrics,
        })
    }
}
