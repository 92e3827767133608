//! Shared application state
//!
//! Holds the loaded configuration, the provider REST client, the relay
//! factory and the bookkeeping behind relay connection limits.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::config::ServerConfig;
use crate::core::{ChunkAggregator, JobOptions, JobRunner, RealtimeRelay, SonioxClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionLimitError {
    #[error("global WebSocket connection limit reached")]
    GlobalLimitReached,
    #[error("per-IP WebSocket connection limit reached")]
    PerIpLimitReached,
}

pub struct AppState {
    pub config: ServerConfig,
    pub soniox: Arc<SonioxClient>,
    pub relay: RealtimeRelay,
    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, u32>,
}

impl AppState {
    /// Build the state from a validated configuration.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, reqwest::Error> {
        let soniox = Arc::new(SonioxClient::new(config.soniox_config())?);
        let relay = RealtimeRelay::new(config.soniox_ws_url.clone(), config.realtime_model.clone());

        Ok(Arc::new(Self {
            config,
            soniox,
            relay,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        }))
    }

    /// Aggregator for one file-transcription request.
    pub fn aggregator(&self, options: JobOptions) -> ChunkAggregator {
        let runner = JobRunner::new(self.soniox.clone(), options);
        ChunkAggregator::new(runner, self.config.max_chunk_duration_secs as f64)
    }

    /// Reserve a relay slot for `ip`.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        match self.config.max_websocket_connections {
            Some(max) => {
                self.ws_connections
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                        (count < max).then_some(count + 1)
                    })
                    .map_err(|_| ConnectionLimitError::GlobalLimitReached)?;
            }
            None => {
                self.ws_connections.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut per_ip = self.ip_connections.entry(ip).or_insert(0);
        if *per_ip >= self.config.max_connections_per_ip {
            drop(per_ip);
            self.ws_connections.fetch_sub(1, Ordering::SeqCst);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *per_ip += 1;

        debug!(ip = %ip, count = *per_ip, "Relay connection acquired");
        Ok(())
    }

    /// Release a slot taken by `try_acquire_connection`.
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });

        if let Some(mut per_ip) = self.ip_connections.get_mut(&ip) {
            *per_ip = per_ip.saturating_sub(1);
        }
        self.ip_connections.remove_if(&ip, |_, count| *count == 0);
        debug!(ip = %ip, "Relay connection released");
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.ip_connections.get(ip).map(|count| *count).unwrap_or(0)
    }
}

/// Releases a relay slot when dropped.
pub struct ConnectionGuard {
    state: Arc<AppState>,
    ip: IpAddr,
}

impl ConnectionGuard {
    pub fn new(state: Arc<AppState>, ip: IpAddr) -> Self {
        Self { state, ip }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.release_connection(self.ip);
    }
}
