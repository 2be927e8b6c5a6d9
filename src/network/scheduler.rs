//! Broadcast Scheduler
//!
//! Owns every match and the subscriber registry. Each tick advances all
//! matches in court order, encodes the snapshot batch once and fans the same
//! payload out to every subscriber.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use crate::core::rng::{DeterministicRng, derive_match_seed};
use crate::game::roster::{Pairing, PairingStrategy};
use crate::game::state::MatchState;
use crate::game::tick::advance_at;
use crate::network::protocol::{encode_snapshots, MatchSnapshot, Payload, ProtocolError};
use crate::network::registry::{DeliveryReport, SubscriberId, SubscriberRegistry};

/// Summary of one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Matches that finished during this tick.
    pub matches_finished: usize,
    /// Fan-out result.
    pub delivery: DeliveryReport,
    /// Closed subscribers removed after the fan-out.
    pub pruned: usize,
}

/// Periodic match advancement and fan-out.
pub struct BroadcastScheduler {
    /// Matches in court order. Locked for the whole tick.
    matches: Mutex<Vec<MatchState>>,
    /// Active subscribers.
    registry: Arc<SubscriberRegistry>,
    /// Last payload sent, replayed to new subscribers.
    latest: RwLock<Option<Payload>>,
    /// Ticks run so far.
    ticks: AtomicU64,
}

impl BroadcastScheduler {
    /// Create matches from explicit pairings. Match `i` gets id `i` and an
    /// RNG derived from `(master_seed, i)`.
    pub fn new(pairings: Vec<Pairing>, master_seed: u64) -> Self {
        let matches = pairings
            .into_iter()
            .enumerate()
            .map(|(i, pairing)| {
                let id = i as u32;
                let seed = derive_match_seed(master_seed, id);
                MatchState::new(id, pairing.player_a, pairing.player_b, seed)
            })
            .collect();

        Self::with_matches(matches)
    }

    /// Create matches using a pairing strategy seeded from `master_seed`.
    pub fn from_strategy(strategy: &dyn PairingStrategy, master_seed: u64) -> Self {
        let mut rng = DeterministicRng::new(master_seed);
        let pairings = strategy.pairings(&mut rng);
        Self::new(pairings, master_seed)
    }

    /// Wrap already-built matches.
    pub fn with_matches(matches: Vec<MatchState>) -> Self {
        Self {
            matches: Mutex::new(matches),
            registry: Arc::new(SubscriberRegistry::new()),
            latest: RwLock::new(None),
            ticks: AtomicU64::new(0),
        }
    }

    /// Shared handle to the subscriber registry.
    pub fn registry(&self) -> Arc<SubscriberRegistry> {
        self.registry.clone()
    }

    /// Register a subscriber. If a payload has already gone out, the latest
    /// one is queued immediately.
    pub async fn register_subscriber(&self, sender: mpsc::Sender<Payload>) -> SubscriberId {
        // Ticks publish and fan out under the write guard, so this replay
        // never duplicates a broadcast payload.
        let latest = self.latest.read().await;
        let id = self.registry.register(sender).await;

        if let Some(payload) = latest.as_ref() {
            if let Err(e) = self.registry.send_to(&id, payload.clone()).await {
                debug!("Initial snapshot not delivered: {}", e);
            }
        }

        debug!("Subscriber {} registered", id);
        id
    }

    /// Remove a subscriber. No-op if it is already gone.
    pub async fn unregister_subscriber(&self, id: &SubscriberId) -> bool {
        let removed = self.registry.unregister(id).await;
        if removed {
            debug!("Subscriber {} unregistered", id);
        }
        removed
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.registry.len().await
    }

    /// Number of matches.
    pub async fn match_count(&self) -> usize {
        self.matches.lock().await.len()
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Current snapshots without advancing anything.
    pub async fn snapshots(&self) -> Vec<MatchSnapshot> {
        let matches = self.matches.lock().await;
        let now = Utc::now();
        matches.iter().map(|m| MatchSnapshot::capture(m, now)).collect()
    }

    /// Last payload sent, if any.
    pub async fn latest_payload(&self) -> Option<Payload> {
        self.latest.read().await.clone()
    }

    /// Advance every match once and deliver the resulting snapshot batch.
    ///
    /// Delivery failures are reported, never returned as errors. An encoding
    /// error skips the fan-out; the matches stay advanced.
    pub async fn tick(&self) -> Result<TickReport, ProtocolError> {
        let mut matches = self.matches.lock().await;
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let mut report = TickReport { tick, ..Default::default() };

        for state in matches.iter_mut() {
            let outcome = advance_at(state, now);

            #[cfg(feature = "debug-tracing")]
            debug!("Match {} tick {}: {:?}", state.id, tick, outcome);

            if outcome.set_completed {
                debug!(
                    "Match {} set completed: {} ({} vs {})",
                    state.id,
                    state.set_history.join(" "),
                    state.player_a,
                    state.player_b
                );
            }
            if outcome.match_ended {
                report.matches_finished += 1;
                info!(
                    "Match {} finished: {} {}-{} {} [{}]",
                    state.id,
                    state.player_a,
                    state.sets_won[0],
                    state.sets_won[1],
                    state.player_b,
                    state.set_history.join(", ")
                );
            }
        }

        let snapshots: Vec<MatchSnapshot> = matches
            .iter()
            .map(|m| MatchSnapshot::capture(m, now))
            .collect();
        let payload = encode_snapshots(&snapshots)?;

        // Held through the fan-out: a subscriber registering concurrently
        // either gets this payload from the broadcast or from the replay.
        let mut latest = self.latest.write().await;
        *latest = Some(payload.clone());
        report.delivery = self.registry.broadcast(&payload).await;
        drop(latest);

        for failure in &report.delivery.failures {
            debug!("Tick {}: {}", tick, failure);
        }
        if report.delivery.disconnected().next().is_some() {
            report.pruned = self.registry.prune_closed().await;
        }

        Ok(report)
    }

    /// Tick every `period` until `shutdown` fires. Missed ticks are skipped,
    /// not replayed.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, period: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut tick_interval = interval(period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Broadcast loop started ({} ms period)", period.as_millis());

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    match self.tick().await {
                        Ok(report) => {
                            if report.pruned > 0 {
                                debug!(
                                    "Tick {}: pruned {} subscribers",
                                    report.tick, report.pruned
                                );
                            }
                        }
                        Err(e) => error!("Tick failed: {}", e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Broadcast loop stopping");
                    break;
                }
            }
        }
    }
}
