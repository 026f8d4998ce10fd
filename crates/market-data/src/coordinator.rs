//! Single-ticker live price broadcaster
//!
//! One target slot, one background loop per coordinator, any number of
//! subscribers. Analysis requests overwrite the target; the loop reads it once
//! per tick, fetches the spot price and publishes it on a broadcast channel.
//!
//! # Lifecycle
//!
//! ```text
//!  Idle ──start() / first subscriber──▶ Armed ──set_target()──▶ Streaming
//! ```
//!
//! A target set while idle is kept and picked up by the first tick.
//!
//! The loop is never stopped; it lives as long as the runtime.

use observability::StreamMetrics;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gateway::MarketDataGateway;
use crate::types::PriceUpdate;

/// Shared target slot.
///
/// Written by every analysis request, read once per loop tick. Last write
/// wins; there is no queue of targets.
#[derive(Debug, Default)]
pub struct StreamState {
    active_ticker: RwLock<Option<String>>,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_target(&self, ticker: impl Into<String>) {
        *self.active_ticker.write() = Some(ticker.into());
    }

    pub fn active_ticker(&self) -> Option<String> {
        self.active_ticker.read().clone()
    }
}

/// Observable state of the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPhase {
    /// No loop running
    Idle,
    /// Loop running, nothing to stream yet
    Armed,
    /// Loop running with a target
    Streaming,
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Delay between loop ticks
    pub interval: Duration,
    /// Updates buffered per subscriber before it starts lagging
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            channel_capacity: 64,
        }
    }
}

pub struct StreamCoordinator {
    state: Arc<StreamState>,
    gateway: Arc<dyn MarketDataGateway>,
    sender: broadcast::Sender<PriceUpdate>,
    interval: Duration,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    loops_started: AtomicUsize,
    metrics: StreamMetrics,
}

impl StreamCoordinator {
    pub fn new(
        state: Arc<StreamState>,
        gateway: Arc<dyn MarketDataGateway>,
        config: StreamConfig,
    ) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));

        Self {
            state,
            gateway,
            sender,
            interval: config.interval,
            loop_handle: Mutex::new(None),
            loops_started: AtomicUsize::new(0),
            metrics: StreamMetrics::new(),
        }
    }

    /// Point the stream at a new ticker. Always succeeds.
    pub fn set_target(&self, ticker: impl Into<String>) {
        let ticker = ticker.into();
        debug!(ticker = %ticker, "Stream target updated");
        self.state.set_target(ticker);
    }

    pub fn active_ticker(&self) -> Option<String> {
        self.state.active_ticker()
    }

    pub fn phase(&self) -> StreamPhase {
        if self.loop_handle.lock().is_none() {
            StreamPhase::Idle
        } else if self.state.active_ticker().is_some() {
            StreamPhase::Streaming
        } else {
            StreamPhase::Armed
        }
    }

    /// Called when a push client connects.
    ///
    /// Starts the broadcast loop if it is not running yet. Returns whether
    /// this call was the one that started it.
    pub fn on_first_subscriber_connect(&self) -> bool {
        let started = self.start();
        if started {
            info!("First subscriber connected, price stream started");
        }
        started
    }

    /// Start the broadcast loop unless it already runs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut handle = self.loop_handle.lock();
        if handle.is_some() {
            return false;
        }

        let task = BroadcastLoop {
            state: self.state.clone(),
            gateway: self.gateway.clone(),
            sender: self.sender.clone(),
            interval: self.interval,
            metrics: self.metrics.clone(),
        };
        *handle = Some(tokio::spawn(task.run()));
        self.loops_started.fetch_add(1, Ordering::SeqCst);

        info!(
            interval_secs = self.interval.as_secs_f64(),
            gateway = self.gateway.name(),
            "Price broadcast loop spawned"
        );
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PriceUpdate> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of loops ever spawned by this coordinator; never above one
    pub fn loops_started(&self) -> usize {
        self.loops_started.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }
}

struct BroadcastLoop {
    state: Arc<StreamState>,
    gateway: Arc<dyn MarketDataGateway>,
    sender: broadcast::Sender<PriceUpdate>,
    interval: Duration,
    metrics: StreamMetrics,
}

impl BroadcastLoop {
    async fn run(self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    async fn tick(&self) {
        self.metrics.tick();

        let Some(ticker) = self.state.active_ticker() else {
            return;
        };

        match self.gateway.fetch_spot_price(&ticker).await {
            Ok(price) => {
                // No receivers is fine; the update is simply dropped
                let receivers = self.sender.send(PriceUpdate::new(&ticker, price)).unwrap_or(0);
                self.metrics.broadcast(price);
                info!(ticker = %ticker, price, receivers, "Price broadcast");
            }
            Err(e) => {
                self.metrics.fetch_failed();
                warn!(ticker = %ticker, error = %e, "Price stream fetch failed");
            }
        }
    }
}
