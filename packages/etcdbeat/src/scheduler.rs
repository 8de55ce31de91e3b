use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, error, info};
use strum::IntoEnumIterator;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::{
    auth::AuthGate,
    client::StatsClient,
    config::ResolvedConfig,
    model::{Event, StatsCategory},
    publisher::Publisher,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SystemMessage {
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatState {
    Idle,
    Running,
    Stopped,
}

/// Stops a running `Etcdbeat`. Cheap to clone; only the first `stop` has any effect.
#[derive(Clone)]
pub struct StopHandle {
    system_notifier: broadcast::Sender<SystemMessage>,
    is_stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Signals the poll loop to exit once the current tick completes. The loop closes the publisher on its way out.
    /// Returns `false` when the beat was already stopped.
    pub async fn stop(&self) -> bool {
        if self.is_stopped.swap(true, Ordering::SeqCst) {
            debug!("Stop requested again, ignoring");
            return false;
        }
        // No receiver means the loop has already returned.
        let _ = self.system_notifier.send(SystemMessage::Shutdown);
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.is_stopped.load(Ordering::SeqCst)
    }
}

/// The poll scheduler. Polls every enabled stats category once per period and publishes one event per
/// successful fetch.
pub struct Etcdbeat {
    name: String,
    config: ResolvedConfig,
    client: Box<dyn StatsClient>,
    publisher: Arc<dyn Publisher>,
    auth_gate: AuthGate,
    auth_usable: bool,
    state: BeatState,
    system_rx: broadcast::Receiver<SystemMessage>,
    stop_handle: StopHandle,
}

impl Etcdbeat {
    pub fn new(name: &str, config: ResolvedConfig, client: Box<dyn StatsClient>, publisher: Arc<dyn Publisher>, auth_gate: AuthGate) -> Self {
        let (system_notifier, system_rx) = broadcast::channel(4);
        let stop_handle = StopHandle {
            system_notifier,
            is_stopped: Arc::new(AtomicBool::new(false)),
        };

        Self {
            name: name.to_owned(),
            config,
            client,
            publisher,
            auth_gate,
            auth_usable: false,
            state: BeatState::Idle,
            system_rx,
            stop_handle,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    pub fn state(&self) -> BeatState {
        self.state
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Runs the auth gate (when enabled) and then polls until stopped. A stopped beat cannot be run again.
    pub async fn run(&mut self) {
        if self.state == BeatState::Stopped {
            debug!("{} already stopped", self.name);
            return;
        }
        info!("{} is running! Hit CTRL-C to stop it.", self.name);
        self.state = BeatState::Running;

        if self.config.authentication.enable {
            self.auth_usable = self
                .auth_gate
                .validate_configured(&self.config.host, &self.config.port, &self.config.authentication)
                .await;
        }
        debug!("Init {} with config {:?}", self.name, self.config);

        let period = self.config.period;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.stop_handle.is_stopped() {
            tokio::select! {
                biased;
                msg = self.system_rx.recv() => {
                    match msg {
                        Ok(SystemMessage::Shutdown) | Err(RecvError::Closed) => {
                            info!("Shutdown received");
                            break;
                        }
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
                _ = ticker.tick() => {
                    self.on_tick().await;
                }
            }
        }

        // Closed only after the last tick has published.
        self.publisher.close().await;
        self.state = BeatState::Stopped;
        info!("{} stopped", self.name);
    }

    /// One poll cycle. Skipped entirely while the credentials are known to be rejected.
    pub async fn on_tick(&self) -> usize {
        if self.config.authentication.enable && !self.auth_usable {
            debug!("Username or Password not set.");
            return 0;
        }
        self.statistics_check().await
    }

    /// Fetches every enabled category in order (leader, self, store). A failed category is logged and skipped.
    /// Returns the number of events published.
    pub async fn statistics_check(&self) -> usize {
        let mut sent = 0;

        for category in StatsCategory::iter().filter(|c| self.config.statistics.is_enabled(*c)) {
            let name = category.to_string();
            let stats = match self.client.fetch(category).await {
                Ok(stats) => stats,
                Err(e) => {
                    let kind = e.kind.to_string();
                    error!(category = name.as_str(), kind = kind.as_str(); "Error reading {} stats: {}", category, e);
                    continue;
                }
            };

            match self.publisher.publish_event(Event::new(&self.name, stats)).await {
                Ok(()) => {
                    sent += 1;
                    info!(category = name.as_str(); "{} stats: event sent", category);
                }
                Err(e) => error!(category = name.as_str(); "Failed to publish {} stats: {}", category, e),
            }
        }

        sent
    }
}
