use crate::application::ports::{EventPublisher, StateStore};
use crate::domain::{Clock, EngineEvent, LogEvent, LogLevel, LogRecord, PriceEvent};
use rand::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Resolution of the uniform draw in [-1, 1]
const PERTURB_STEPS: i64 = 1_000_000;
const PERTURB_SCALE: u32 = 6;
/// Decimal places kept in a price delta
const PRICE_DP: u32 = 8;

const LEVEL_WEIGHTS: [(LogLevel, u32); 3] = [
    (LogLevel::Info, 70),
    (LogLevel::Warn, 20),
    (LogLevel::Error, 10),
];

const INFO_MESSAGES: &[&str] = &[
    "Order book refreshed",
    "Placing limit order at mid price",
    "Order filled successfully",
    "Spread adjusted to target",
    "Inventory within limits",
];

const WARN_MESSAGES: &[&str] = &[
    "Latency above threshold",
    "Order partially filled",
    "Inventory skew detected",
    "Rate limit approaching",
];

const ERROR_MESSAGES: &[&str] = &[
    "Order rejected by exchange",
    "Exchange connection lost",
    "Insufficient balance",
];

/// Simulator tuning
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    /// Time between ticks
    pub interval: Duration,
    /// Maximum relative price move per tick (0.01 = 1%)
    pub volatility: Decimal,
    /// Fixed RNG seed; entropy when unset
    pub seed: Option<u64>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            volatility: dec!(0.01),
            seed: None,
        }
    }
}

impl SimulatorSettings {
    /// Settings for the `n`th session. A fixed seed is offset by `n` so each
    /// session walks its own sequence while runs stay reproducible.
    pub fn for_session(&self, n: u64) -> Self {
        Self {
            seed: self.seed.map(|seed| seed.wrapping_add(n)),
            ..self.clone()
        }
    }
}

/// Move `old` by a uniform factor in `[-volatility, volatility]`
///
/// The delta is truncated toward zero so `|new - old| <= old * volatility`
/// holds exactly.
pub fn perturb<R: Rng + ?Sized>(old: Decimal, volatility: Decimal, rng: &mut R) -> Decimal {
    let steps = rng.gen_range(-PERTURB_STEPS..=PERTURB_STEPS);
    let pct = volatility * Decimal::new(steps, PERTURB_SCALE);
    let delta = (old * pct).round_dp_with_strategy(PRICE_DP, RoundingStrategy::ToZero);
    old + delta
}

/// Synthetic market feed bound to one stream session
///
/// Each tick perturbs every tracked price, publishes one price event per
/// symbol and then exactly one log event.
pub struct MarketSimulator<S, E, C> {
    store: Arc<S>,
    event_publisher: Arc<E>,
    clock: Arc<C>,
    settings: SimulatorSettings,
    rng: StdRng,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl<S, E, C> MarketSimulator<S, E, C>
where
    S: StateStore + 'static,
    E: EventPublisher + 'static,
    C: Clock + 'static,
{
    pub fn new(
        store: Arc<S>,
        event_publisher: Arc<E>,
        clock: Arc<C>,
        settings: SimulatorSettings,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            store,
            event_publisher,
            clock,
            settings,
            rng,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run one perturb-and-emit cycle, returning the number of events published
    pub async fn tick(&mut self) -> usize {
        let mut emitted = 0;
        let volatility = self.settings.volatility;
        let symbols: Vec<String> = self.store.prices().into_keys().collect();

        for symbol in symbols {
            if self.is_cancelled() {
                return emitted;
            }
            let rng = &mut self.rng;
            let Some(price) = self
                .store
                .update_price(&symbol, &mut |old| perturb(old, volatility, &mut *rng))
            else {
                continue;
            };

            tracing::trace!(%symbol, %price, "Simulated price");
            self.event_publisher
                .publish(EngineEvent::Price(PriceEvent { symbol, price }))
                .await;
            emitted += 1;
        }

        if self.is_cancelled() {
            return emitted;
        }

        let record = self.synthetic_log();
        self.store.record_log(record.clone());
        self.event_publisher
            .publish(EngineEvent::Log(LogEvent {
                level: record.level,
                source: record.source,
                msg: record.message,
            }))
            .await;

        emitted + 1
    }

    fn synthetic_log(&mut self) -> LogRecord {
        let level = LEVEL_WEIGHTS
            .choose_weighted(&mut self.rng, |(_, weight)| *weight)
            .map(|(level, _)| *level)
            .unwrap_or(LogLevel::Info);

        let templates = match level {
            LogLevel::Info => INFO_MESSAGES,
            LogLevel::Warn => WARN_MESSAGES,
            LogLevel::Error => ERROR_MESSAGES,
        };
        let message = templates
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("Heartbeat");

        let source = self
            .store
            .strategies()
            .choose(&mut self.rng)
            .map(|strategy| strategy.name.clone())
            .unwrap_or_else(|| "system".to_string());

        LogRecord {
            timestamp: self.clock.now(),
            level,
            source,
            message: message.to_string(),
        }
    }

    /// Start ticking in the background; the first tick fires one interval from now
    pub fn spawn(mut self) -> SimulatorHandle {
        let shutdown = Arc::clone(&self.shutdown);
        let wake = Arc::clone(&self.wake);

        let task = tokio::spawn(async move {
            self.run().await;
        });

        SimulatorHandle {
            shutdown,
            wake,
            task: Some(task),
        }
    }

    async fn run(&mut self) {
        let period = self.settings.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let wake = Arc::clone(&self.wake);

        tracing::debug!(?period, "Market simulator started");
        loop {
            tokio::select! {
                biased;
                _ = wake.notified() => {}
                _ = ticker.tick() => {}
            }
            if self.is_cancelled() {
                break;
            }
            self.tick().await;
        }
        tracing::debug!("Market simulator stopped");
    }
}

/// Owner side of a running simulator
///
/// Dropping the handle signals the task to stop without waiting for it.
pub struct SimulatorHandle {
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl SimulatorHandle {
    /// Stop the simulator and wait for it to finish. Safe to call repeatedly.
    pub async fn cancel(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake.notify_one();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::debug!("Simulator task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{ConnectionRegistry, EventBus, InMemoryStateStore, SimulationClock};
    use serde_json::Value;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    type TestSimulator =
        MarketSimulator<InMemoryStateStore, EventBus<SimulationClock>, SimulationClock>;

    fn setup(settings: SimulatorSettings) -> (TestSimulator, Arc<InMemoryStateStore>, mpsc::Receiver<String>) {
        let clock = Arc::new(SimulationClock::new());
        let store = Arc::new(InMemoryStateStore::new(50));
        store.set_price("BTC/USDT", dec!(52345.00));
        store.set_price("ETH/USDT", dec!(2856.50));

        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, rx) = mpsc::channel(1024);
        registry.add(Uuid::new_v4(), tx);

        let bus = Arc::new(EventBus::new(registry, Arc::clone(&clock)));
        let simulator = MarketSimulator::new(Arc::clone(&store), bus, clock, settings);
        (simulator, store, rx)
    }

    fn seeded(seed: u64) -> SimulatorSettings {
        SimulatorSettings {
            seed: Some(seed),
            ..Default::default()
        }
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            events.push(serde_json::from_str(&raw).unwrap());
        }
        events
    }

    #[test]
    fn test_perturb_stays_within_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        let volatility = dec!(0.01);
        let mut price = dec!(52345.00);

        for _ in 0..10_000 {
            let next = perturb(price, volatility, &mut rng);
            assert!((next - price).abs() <= price * volatility);
            assert!(next > Decimal::ZERO);
            price = next;
        }
    }

    #[test]
    fn test_zero_volatility_keeps_price() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(perturb(dec!(98.5), Decimal::ZERO, &mut rng), dec!(98.5));
    }

    #[tokio::test]
    async fn test_tick_emits_prices_then_one_log() {
        let (mut simulator, store, mut rx) = setup(seeded(42));

        let emitted = simulator.tick().await;
        assert_eq!(emitted, 3);

        let events = drain(&mut rx);
        let kinds: Vec<_> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["price", "price", "log"]);
        assert_eq!(events[0]["symbol"], "BTC/USDT");
        assert_eq!(events[1]["symbol"], "ETH/USDT");

        // No strategies registered
        assert_eq!(events[2]["source"], "system");
        assert_eq!(store.logs().len(), 1);
    }

    #[tokio::test]
    async fn test_tick_updates_store() {
        let (mut simulator, store, mut rx) = setup(seeded(3));

        for _ in 0..50 {
            let before = store.price("BTC/USDT").unwrap();
            simulator.tick().await;
            let after = store.price("BTC/USDT").unwrap();
            assert!((after - before).abs() <= before * dec!(0.01));
        }

        assert_eq!(drain(&mut rx).len(), 150);
        assert_eq!(store.logs().len(), 50);
    }

    #[tokio::test]
    async fn test_same_seed_same_prices() {
        let (mut a, store_a, _rx_a) = setup(seeded(99));
        let (mut b, store_b, _rx_b) = setup(seeded(99));

        for _ in 0..10 {
            a.tick().await;
            b.tick().await;
        }
        assert_eq!(store_a.prices(), store_b.prices());
    }

    #[tokio::test]
    async fn test_sessions_walk_independently() {
        let base = seeded(99);
        assert_eq!(base.for_session(0).seed, Some(99));
        assert_eq!(base.for_session(1).seed, Some(100));
        assert_eq!(SimulatorSettings::default().for_session(4).seed, None);

        let (mut first, store_first, _rx_first) = setup(base.for_session(0));
        let (mut second, store_second, _rx_second) = setup(base.for_session(1));
        for _ in 0..10 {
            first.tick().await;
            second.tick().await;
        }
        assert_ne!(store_first.prices(), store_second.prices());
    }

    #[tokio::test]
    async fn test_no_events_after_cancel() {
        let settings = SimulatorSettings {
            interval: Duration::from_millis(10),
            ..seeded(5)
        };
        let (simulator, _store, mut rx) = setup(settings);

        let mut handle = simulator.spawn();
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.cancel().await;

        assert!(!drain(&mut rx).is_empty());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(drain(&mut rx).is_empty());

        // Idempotent
        handle.cancel().await;
    }

    #[tokio::test]
    async fn test_cancel_before_first_tick() {
        let (simulator, _store, mut rx) = setup(seeded(11));

        let mut handle = simulator.spawn();
        handle.cancel().await;
        assert!(drain(&mut rx).is_empty());
    }
}
