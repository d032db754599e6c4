//! Network lifecycle controller.
//!
//! Station-mode connect with bounded retries, access-point provisioning
//! fallback, and persisted-credential recovery. The state machine itself is
//! the pure [`next_state`] function over `(state, event)` pairs; the
//! [`NetworkController`] layers timing, the blink indicator, and driver
//! calls on top of it.

use rover_core::{Actuator, CredentialStore, Light, StatusDisplay, WifiCredentials};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Network lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// Nothing attempted yet.
    Disconnected,
    /// A station-mode association attempt is in flight.
    Connecting,
    /// Joined the configured network. The acceptor runs only here.
    StationConnected,
    /// Running the local access point and captive portal.
    ApProvisioning,
}

/// Events fed to the transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Begin the first connection attempt.
    Start,
    /// The station association succeeded.
    ConnectSucceeded,
    /// One attempt ran out its wall-clock budget.
    AttemptTimedOut {
        /// Whether this was the last allowed attempt.
        attempts_exhausted: bool,
    },
    /// The provisioning portal saved a new credential pair.
    CredentialsUpdated,
}

/// Pure lifecycle transition function, independent of timing side effects.
pub fn next_state(state: NetworkState, event: NetworkEvent) -> NetworkState {
    use NetworkEvent::*;
    use NetworkState::*;

    match (state, event) {
        (Disconnected, Start) => Connecting,
        (Connecting, ConnectSucceeded) => StationConnected,
        (Connecting, AttemptTimedOut { attempts_exhausted: false }) => Connecting,
        (Connecting, AttemptTimedOut { attempts_exhausted: true }) => ApProvisioning,
        (ApProvisioning, ConnectSucceeded) => StationConnected,
        // Saving credentials keeps the portal up until they actually connect.
        (ApProvisioning, CredentialsUpdated) => ApProvisioning,
        (state, _) => state,
    }
}

/// Errors surfaced by the WiFi driver.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("wifi driver error: {0}")]
    Driver(String),

    #[error(transparent)]
    Credential(#[from] rover_core::CredentialError),
}

/// Platform WiFi driver. All calls are non-blocking: `begin_station`
/// starts an association attempt, `is_connected` polls its outcome.
pub trait WifiDriver: Send {
    /// Begin (or restart) a station-mode association attempt.
    fn begin_station(&mut self, credentials: &WifiCredentials) -> Result<(), NetError>;

    /// Whether the station interface currently has an association and lease.
    fn is_connected(&self) -> bool;

    /// The station interface address, once connected.
    fn local_ip(&self) -> Option<String>;

    /// Bring up the provisioning access point.
    fn start_access_point(&mut self, ssid: &str) -> Result<(), NetError>;

    /// Tear down the access point. A no-op if none is active.
    fn stop_access_point(&mut self) -> Result<(), NetError>;
}

/// Timing and identity knobs for the controller.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Wall-clock budget per station attempt.
    pub connect_timeout: Duration,
    /// Attempts before falling back to provisioning.
    pub max_attempts: u32,
    /// Tail-light blink period while connecting.
    pub blink_interval: Duration,
    /// SSID of the provisioning access point.
    pub ap_ssid: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_attempts: 5,
            blink_interval: Duration::from_millis(500),
            ap_ssid: "Rover32_Setup".to_string(),
        }
    }
}

impl NetConfig {
    /// Derive the network knobs from the device configuration.
    pub fn from_device(config: &rover_core::DeviceConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            max_attempts: config.max_connection_attempts,
            ap_ssid: config.ap_ssid.clone(),
            ..Default::default()
        }
    }
}

/// Transitions the caller must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Station mode is up. Start the acceptor.
    Connected { ip: String },
    /// Attempts exhausted; the access point is up. Start the portal.
    EnteredProvisioning,
}

/// Drives the lifecycle state machine against a [`WifiDriver`].
///
/// Call [`tick`](Self::tick) on a short fixed interval; the controller
/// never blocks. Credentials live behind a shared lock so the provisioning
/// portal can swap them in while the controller keeps polling.
pub struct NetworkController<W> {
    driver: W,
    store: Arc<dyn CredentialStore>,
    display: Arc<dyn StatusDisplay>,
    actuator: Arc<dyn Actuator>,
    config: NetConfig,
    credentials: Arc<RwLock<WifiCredentials>>,
    applied_credentials: WifiCredentials,
    state: NetworkState,
    attempt: u32,
    attempt_deadline: Option<Instant>,
    last_blink: Option<Instant>,
    blink_on: bool,
}

impl<W: WifiDriver> NetworkController<W> {
    /// Create a controller. Persisted credentials, when present and valid,
    /// take precedence over the compiled-in `defaults`.
    pub fn new(
        driver: W,
        store: Arc<dyn CredentialStore>,
        display: Arc<dyn StatusDisplay>,
        actuator: Arc<dyn Actuator>,
        config: NetConfig,
        defaults: WifiCredentials,
    ) -> Self {
        let initial = match store.load() {
            Ok(Some(saved)) => {
                info!(ssid = %saved.ssid, "using persisted WiFi credentials");
                saved
            }
            Ok(None) => defaults,
            Err(e) => {
                warn!("credential load failed, using defaults: {}", e);
                defaults
            }
        };

        Self {
            driver,
            store,
            display,
            actuator,
            config,
            applied_credentials: initial.clone(),
            credentials: Arc::new(RwLock::new(initial)),
            state: NetworkState::Disconnected,
            attempt: 0,
            attempt_deadline: None,
            last_blink: None,
            blink_on: false,
        }
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    /// Shared handle to the in-memory credentials, for the portal.
    pub fn credentials(&self) -> Arc<RwLock<WifiCredentials>> {
        Arc::clone(&self.credentials)
    }

    /// Advance the lifecycle. Pass the current instant; the controller
    /// keeps no clock of its own.
    pub fn tick(&mut self, now: Instant) -> Result<Option<LifecycleEvent>, NetError> {
        match self.state {
            NetworkState::Disconnected => {
                self.state = next_state(self.state, NetworkEvent::Start);
                self.begin_attempt(now)?;
                Ok(None)
            }
            NetworkState::Connecting => self.tick_connecting(now),
            NetworkState::ApProvisioning => self.tick_provisioning(now),
            NetworkState::StationConnected => Ok(None),
        }
    }

    fn tick_connecting(&mut self, now: Instant) -> Result<Option<LifecycleEvent>, NetError> {
        if self.driver.is_connected() {
            return Ok(Some(self.finish_connect()?));
        }

        let deadline = self.attempt_deadline.unwrap_or(now);
        if now >= deadline {
            let exhausted = self.attempt >= self.config.max_attempts;
            self.state = next_state(
                self.state,
                NetworkEvent::AttemptTimedOut {
                    attempts_exhausted: exhausted,
                },
            );
            if exhausted {
                warn!(
                    attempts = self.attempt,
                    "station attempts exhausted, starting provisioning AP"
                );
                self.actuator.set_light(Light::Tail, false);
                self.driver.start_access_point(&self.config.ap_ssid)?;
                self.display.show(&format!(
                    "WiFi setup mode\nConnect to:\n{}",
                    self.config.ap_ssid
                ));
                return Ok(Some(LifecycleEvent::EnteredProvisioning));
            }
            self.begin_attempt(now)?;
            return Ok(None);
        }

        // Blink the tail light so the attempt is visibly alive.
        let due = match self.last_blink {
            Some(last) => now.duration_since(last) >= self.config.blink_interval,
            None => true,
        };
        if due {
            self.blink_on = !self.blink_on;
            self.actuator.set_light(Light::Tail, self.blink_on);
            self.last_blink = Some(now);
        }
        Ok(None)
    }

    fn tick_provisioning(&mut self, _now: Instant) -> Result<Option<LifecycleEvent>, NetError> {
        // The portal may have saved new credentials; apply them once and
        // let the association proceed asynchronously under the AP.
        let current = self
            .credentials
            .read()
            .map(|c| c.clone())
            .unwrap_or_default();
        if current != self.applied_credentials && !current.ssid.is_empty() {
            info!(ssid = %current.ssid, "applying credentials from portal");
            self.applied_credentials = current.clone();
            self.driver.begin_station(&current)?;
            self.state = next_state(self.state, NetworkEvent::CredentialsUpdated);
        }

        if self.driver.is_connected() {
            return Ok(Some(self.finish_connect()?));
        }
        Ok(None)
    }

    fn begin_attempt(&mut self, now: Instant) -> Result<(), NetError> {
        self.attempt += 1;
        let credentials = self
            .credentials
            .read()
            .map(|c| c.clone())
            .unwrap_or_default();
        info!(
            attempt = self.attempt,
            max = self.config.max_attempts,
            ssid = %credentials.ssid,
            "starting station connection attempt"
        );
        self.display.show(&format!(
            "Connecting to WiFi:\n{}\nAttempt {}",
            credentials.ssid, self.attempt
        ));
        self.applied_credentials = credentials.clone();
        self.driver.begin_station(&credentials)?;
        self.attempt_deadline = Some(now + self.config.connect_timeout);
        Ok(())
    }

    fn finish_connect(&mut self) -> Result<LifecycleEvent, NetError> {
        let ip = self.driver.local_ip().unwrap_or_default();
        let was_provisioning = self.state == NetworkState::ApProvisioning;
        self.state = next_state(self.state, NetworkEvent::ConnectSucceeded);
        if was_provisioning {
            info!("connected with portal credentials, tearing down AP");
        }
        self.driver.stop_access_point()?;
        self.actuator.set_light(Light::Tail, true);
        self.display.show_status(&ip);
        info!(%ip, "station connected");
        Ok(LifecycleEvent::Connected { ip })
    }
}
