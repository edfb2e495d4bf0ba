//! Turn loop.
//!
//! One agent acts at a time. A timed loop starts a turn on every tick while
//! the simulation is playing and nobody is thinking; the world's busy flag is
//! the only lock between turns.

mod clock;

pub use clock::{tick_interval, SimulationState, MAX_SPEED, MIN_SPEED};

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::brain::ActionDecider;
use crate::errors::{Result, SimError};
use crate::world::{Agent, LogEntry, TurnOutcome, TurnTicket, World, WorldSnapshot};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Releases the turn if the turn future is dropped before finishing.
struct TurnGuard {
    world: Arc<Mutex<World>>,
    ticket: Option<TurnTicket>,
}

impl TurnGuard {
    fn take(&mut self) -> Option<TurnTicket> {
        self.ticket.take()
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            lock(&self.world).abort_turn(ticket);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cheap to clone; every clone drives the same world.
#[derive(Clone)]
pub struct Simulation {
    world: Arc<Mutex<World>>,
    decider: Arc<ActionDecider>,
    rng: Arc<Mutex<StdRng>>,
    playing: Arc<AtomicBool>,
    speed: Arc<watch::Sender<u8>>,
    events: broadcast::Sender<LogEntry>,
}

impl Simulation {
    pub fn new(world: World, decider: ActionDecider) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            world: Arc::new(Mutex::new(world)),
            decider: Arc::new(decider),
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
            playing: Arc::new(AtomicBool::new(false)),
            speed: Arc::new(watch::Sender::new(MIN_SPEED)),
            events,
        }
    }

    /// Deterministic agent selection
    pub fn with_seed(self, seed: u64) -> Self {
        *lock(&self.rng) = StdRng::seed_from_u64(seed);
        self
    }

    pub fn decider(&self) -> &ActionDecider {
        &self.decider
    }

    /// Runs `f` with the world locked. Do not hold on to anything across awaits.
    pub fn with_world<T>(&self, f: impl FnOnce(&World) -> T) -> T {
        f(&lock(&self.world))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.events.subscribe()
    }

    fn publish(&self, entry: &LogEntry) {
        // No subscribers is fine
        let _ = self.events.send(entry.clone());
    }

    pub fn state(&self) -> SimulationState {
        SimulationState {
            is_playing: self.is_playing(),
            speed: self.speed(),
            ticks: self.with_world(World::ticks),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn play(&self) {
        self.playing.store(true, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    pub fn speed(&self) -> u8 {
        *self.speed.borrow()
    }

    /// Clamped to 1..=10; returns the applied speed.
    ///
    /// A running loop restarts its ticker at the new interval right away.
    pub fn set_speed(&self, speed: u8) -> u8 {
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.speed.send_if_modified(|current| {
            let changed = *current != speed;
            *current = speed;
            changed
        });
        speed
    }

    pub fn divine_event(&self, text: &str) -> Result<LogEntry> {
        let entry = lock(&self.world).divine_event(text)?;
        self.publish(&entry);
        Ok(entry)
    }

    pub fn add_agent(&self, name: &str, role: &str, persona: &str) -> Result<Agent> {
        let (agent, entry) = {
            let mut world = lock(&self.world);
            let agent = world.add_agent(name, role, persona)?.clone();
            let entry = world.journal().iter().next_back().cloned();
            (agent, entry)
        };
        if let Some(entry) = entry {
            self.publish(&entry);
        }
        Ok(agent)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.with_world(World::snapshot)
    }

    pub async fn write_snapshot(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| SimError::file_access(path, e))
    }

    /// One complete turn.
    ///
    /// `Ok(None)` when another turn is in flight or nobody is idle.
    pub async fn step(&self) -> Result<Option<TurnOutcome>> {
        let (mut guard, ctx) = {
            let mut world = lock(&self.world);
            let ticket = {
                let mut rng = lock(&self.rng);
                world.begin_turn(&mut *rng)
            };
            let Some(ticket) = ticket else {
                return Ok(None);
            };
            match world.turn_context(&ticket) {
                Ok(ctx) => (
                    TurnGuard {
                        world: Arc::clone(&self.world),
                        ticket: Some(ticket),
                    },
                    ctx,
                ),
                Err(e) => {
                    world.abort_turn(ticket);
                    return Err(e);
                }
            }
        };

        let action = self.decider.decide(&ctx).await;

        let Some(ticket) = guard.take() else {
            return Ok(None);
        };
        let outcome = lock(&self.world).finish_turn(ticket, &action)?;
        self.publish(&outcome.entry);

        Ok(Some(outcome))
    }

    /// Timed loop.
    ///
    /// Stops when `shutdown` resolves or after `max_turns` completed turns.
    /// A turn still in flight at shutdown is cancelled and its agent released.
    /// Returns the number of turns completed by this call.
    pub async fn run<F>(&self, max_turns: Option<u64>, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let start_ticks = self.state().ticks;
        let mut speed_rx = self.speed.subscribe();
        let speed = *speed_rx.borrow_and_update();
        let mut ticker = ticker_for(speed);
        let mut in_flight: Option<JoinHandle<()>> = None;

        tracing::info!(
            "Simulation loop started at {}x ({:?} per tick)",
            speed,
            tick_interval(speed)
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    if let Some(handle) = in_flight.take() {
                        handle.abort();
                        let _ = handle.await;
                    }
                    break;
                }
                Ok(()) = speed_rx.changed() => {
                    let speed = *speed_rx.borrow_and_update();
                    ticker = ticker_for(speed);
                    tracing::debug!("Tick interval now {:?}", tick_interval(speed));
                }
                _ = ticker.tick() => {
                    let done = self.state().ticks - start_ticks;
                    if max_turns.is_some_and(|limit| done >= limit) {
                        break;
                    }

                    if !self.is_playing() || in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
                        continue;
                    }

                    let sim = self.clone();
                    in_flight = Some(tokio::spawn(async move {
                        match sim.step().await {
                            Ok(Some(_)) => {}
                            Ok(None) => tracing::debug!("Nobody idle, tick skipped"),
                            Err(e) => tracing::error!("Turn error: {e}"),
                        }
                    }));
                }
            }
        }

        let completed = self.state().ticks - start_ticks;
        tracing::info!("Simulation loop stopped after {completed} turns");
        completed
    }
}

fn ticker_for(speed: u8) -> tokio::time::Interval {
    let period = tick_interval(speed);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatOptions, ChatResponse, Message, ModelInfo, Provider, ProviderError};
    use crate::world::{Roster, WorldLimits};
    use async_trait::async_trait;
    use tokio_test::{assert_ok, block_on};

    struct Offline;

    #[async_trait]
    impl Provider for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn models(&self) -> Vec<ModelInfo> {
            Vec::new()
        }

        fn default_model(&self) -> &str {
            "none"
        }

        async fn chat(
            &self,
            _messages: &[Message],
            _options: &ChatOptions,
        ) -> std::result::Result<ChatResponse, ProviderError> {
            Err(ProviderError::EmptyResponse)
        }
    }

    fn sim() -> Simulation {
        let world = World::new(Roster::builtin().into_agents(), WorldLimits::default());
        Simulation::new(world, ActionDecider::new(Arc::new(Offline))).with_seed(1)
    }

    #[test]
    fn test_controls() {
        let sim = sim();
        assert_eq!(
            sim.state(),
            SimulationState {
                is_playing: false,
                speed: 1,
                ticks: 0
            }
        );

        sim.play();
        assert_eq!(sim.set_speed(0), 1);
        assert_eq!(sim.set_speed(25), 10);
        assert!(sim.state().is_playing);

        let clone = sim.clone();
        clone.pause();
        assert!(!sim.is_playing());
    }

    #[test]
    fn test_step_with_offline_provider_uses_fallback() {
        let sim = sim();
        let outcome = assert_ok!(block_on(sim.step())).expect("someone acts");

        assert!(outcome.entry.content.contains("(offline недоступен)"));
        assert_eq!(sim.state().ticks, 1);
        assert!(!sim.with_world(World::is_busy));
    }

    #[test]
    fn test_seeded_selection_is_repeatable() {
        let first = block_on(sim().step()).ok().flatten().map(|o| o.agent_id);
        let second = block_on(sim().step()).ok().flatten().map(|o| o.agent_id);
        assert!(first.is_some());
        assert_eq!(first, second);
    }
}
