//! WebSocket Live Score Server
//!
//! Accepts viewer connections, registers each one with the broadcast
//! scheduler and forwards every payload as a text frame. Runs the tick loop
//! alongside the accept loop.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn, instrument};

use crate::core::rng::entropy_seed;
use crate::game::roster::PairingMode;
use crate::network::protocol::Payload;
use crate::network::scheduler::BroadcastScheduler;
use crate::TICK_PERIOD;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent viewers.
    pub max_connections: usize,
    /// Tick period of the broadcast loop.
    pub tick_period: Duration,
    /// Which pairing strategy builds the courts.
    pub pairing: PairingMode,
    /// Master RNG seed. `None` draws one from the clock at startup.
    pub seed: Option<u64>,
    /// Payloads buffered per viewer before frames are dropped.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            max_connections: 1000,
            tick_period: TICK_PERIOD,
            pairing: PairingMode::Fixed,
            seed: None,
            channel_capacity: 16,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ServerConfig {
    /// Create config from environment variables.
    ///
    /// Unset variables keep their defaults; set but malformed ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup (environment, tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "LIVE_SCORE_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "LIVE_SCORE_TICK_MS")? {
            if ms == 0 {
                return Err(invalid("LIVE_SCORE_TICK_MS", "0", "must be positive"));
            }
            config.tick_period = Duration::from_millis(ms);
        }
        if let Some(mode) = parse_var(&lookup, "LIVE_SCORE_PAIRING")? {
            config.pairing = mode;
        }
        if let Some(seed) = parse_var(&lookup, "LIVE_SCORE_SEED")? {
            config.seed = Some(seed);
        }
        if let Some(max) = parse_var(&lookup, "LIVE_SCORE_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "LIVE_SCORE_CHANNEL_CAPACITY")? {
            if capacity == 0 {
                return Err(invalid("LIVE_SCORE_CHANNEL_CAPACITY", "0", "must be positive"));
            }
            config.channel_capacity = capacity;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(key, &raw, &e.to_string())),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Live score server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// Handshake or frame error on a viewer connection.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// One accepted connection, counted until the connection task ends.
struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    fn acquire(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self { active: active.clone() }
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The live score server.
pub struct LiveScoreServer {
    /// Server configuration.
    config: ServerConfig,
    /// Matches and subscribers.
    scheduler: Arc<BroadcastScheduler>,
    /// Master seed in use.
    seed: u64,
    /// Accepted connections, including those still in the handshake.
    active_connections: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl LiveScoreServer {
    /// Create a server, building the courts from the configured pairing mode.
    pub fn new(config: ServerConfig) -> Self {
        let seed = config.seed.unwrap_or_else(entropy_seed);
        let strategy = config.pairing.strategy();
        let scheduler = BroadcastScheduler::from_strategy(strategy.as_ref(), seed);
        Self::with_scheduler(config, Arc::new(scheduler), seed)
    }

    /// Create a server around an existing scheduler.
    pub fn with_scheduler(
        config: ServerConfig,
        scheduler: Arc<BroadcastScheduler>,
        seed: u64,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            scheduler,
            seed,
            active_connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// The scheduler driving this server.
    pub fn scheduler(&self) -> Arc<BroadcastScheduler> {
        self.scheduler.clone()
    }

    /// Master seed in use.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!("Live score server listening on {}", listener.local_addr()?);

        let scheduler = self.scheduler.clone();
        let period = self.config.tick_period;
        let loop_shutdown = self.shutdown_tx.subscribe();
        let tick_handle = tokio::spawn(async move {
            scheduler.run(period, loop_shutdown).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connection_count() >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Err(e) = tick_handle.await {
            error!("Broadcast loop panicked: {}", e);
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let slot = ConnectionSlot::acquire(&self.active_connections);
        let scheduler = self.scheduler.clone();
        let capacity = self.config.channel_capacity;
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            if let Err(e) = serve_viewer(stream, addr, scheduler, capacity, shutdown_rx).await {
                warn!("Connection {} closed with error: {}", addr, e);
            }
            drop(slot);
            info!("Client {} cleaned up", addr);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Connections currently accepted, handshaking ones included.
    pub fn connection_count(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }
}

/// Run one viewer connection: handshake, register, forward payloads until
/// the viewer leaves or the server shuts down.
async fn serve_viewer(
    stream: TcpStream,
    addr: SocketAddr,
    scheduler: Arc<BroadcastScheduler>,
    capacity: usize,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream).await?;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (payload_tx, mut payload_rx) = mpsc::channel::<Payload>(capacity);

    let subscriber_id = scheduler.register_subscriber(payload_tx).await;

    // Forward payloads to the socket
    let sender_task = tokio::spawn(async move {
        while let Some(payload) = payload_rx.recv().await {
            if ws_sender.send(Message::Text(payload.to_string())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Viewers send nothing meaningful; watch for close and errors.
    let result = loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client {} disconnected", addr);
                        break Ok(());
                    }
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring inbound message from {}", addr);
                    }
                    Some(Err(e)) => break Err(ServerError::from(e)),
                    _ => {}
                }
            }
            _ = shutdown_rx.recv() => break Ok(()),
        }
    };

    // Cleanup
    scheduler.unregister_subscriber(&subscriber_id).await;
    sender_task.abort();

    result
}
