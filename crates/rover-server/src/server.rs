//! Connection acceptor and server loop.
//!
//! One select-driven task accepts on the streaming and control listeners
//! and, on a fixed short tick, sweeps liveness and pumps the command
//! channel. The camera path runs independently through the
//! [`FrameBroadcaster`] handle; the two paths share only the slot tables.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{error, info};

use rover_core::{Actuator, DeviceConfig, Light, StatusDisplay};

use crate::broadcast::FrameBroadcaster;
use crate::control::{CommandChannel, ControlClient};
use crate::slots::SlotTable;

/// Configuration for the rover session server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Device name, used in log and display messages.
    pub name: String,
    /// Address the streaming listener binds to.
    pub stream_addr: SocketAddr,
    /// Address the control listener binds to.
    pub control_addr: SocketAddr,
    /// Maximum simultaneous clients per port.
    pub max_clients: usize,
    /// Liveness-sweep and command-pump interval.
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "Rover32".to_string(),
            stream_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            control_addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
            max_clients: 5,
            tick_interval: Duration::from_millis(10),
        }
    }
}

impl ServerConfig {
    /// Derive the server knobs from the device configuration.
    pub fn from_device(device: &DeviceConfig) -> Self {
        Self {
            name: device.name.clone(),
            stream_addr: SocketAddr::from(([0, 0, 0, 0], device.stream_port)),
            control_addr: SocketAddr::from(([0, 0, 0, 0], device.control_port)),
            max_clients: device.max_clients,
            ..Default::default()
        }
    }
}

/// The rover session server.
///
/// Construct it, hand the [`FrameBroadcaster`] to the camera task, then
/// `run()` once the network lifecycle reports station connectivity.
pub struct RoverServer {
    config: ServerConfig,
    stream_slots: Arc<Mutex<SlotTable<TcpStream>>>,
    control_slots: Arc<Mutex<SlotTable<ControlClient>>>,
    channel: CommandChannel,
    actuator: Arc<dyn Actuator>,
    display: Arc<dyn StatusDisplay>,
}

impl RoverServer {
    /// Create a server with empty slot tables.
    pub fn new(
        config: ServerConfig,
        actuator: Arc<dyn Actuator>,
        display: Arc<dyn StatusDisplay>,
    ) -> Self {
        let stream_slots = Arc::new(Mutex::new(SlotTable::new(config.max_clients)));
        let control_slots = Arc::new(Mutex::new(SlotTable::new(config.max_clients)));
        let channel = CommandChannel::new(
            Arc::clone(&control_slots),
            Arc::clone(&actuator),
            Arc::clone(&display),
        );
        Self {
            config,
            stream_slots,
            control_slots,
            channel,
            actuator,
            display,
        }
    }

    /// Handle for the camera task to push frames through.
    pub fn broadcaster(&self) -> FrameBroadcaster {
        FrameBroadcaster::new(Arc::clone(&self.stream_slots))
    }

    /// Run the acceptor and command channel until the task is dropped.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let stream_listener = TcpListener::bind(self.config.stream_addr).await?;
        let control_listener = TcpListener::bind(self.config.control_addr).await?;
        info!(
            stream = %self.config.stream_addr,
            control = %self.config.control_addr,
            "TCP servers started"
        );
        self.display.show_status("TCP ready");

        let mut tick = tokio::time::interval(self.config.tick_interval);
        let mut had_control_clients = false;

        loop {
            tokio::select! {
                result = stream_listener.accept() => match result {
                    Ok((stream, addr)) => self.accept_stream(stream, addr).await,
                    // No retry here: the next pending connection is picked
                    // up on the next loop iteration.
                    Err(e) => error!("stream accept failed: {}", e),
                },
                result = control_listener.accept() => match result {
                    Ok((stream, addr)) => self.accept_control(stream, addr).await,
                    Err(e) => error!("control accept failed: {}", e),
                },
                _ = tick.tick() => {
                    self.sweep_stream_slots().await;
                    let live = self.channel.pump().await;
                    if live > 0 {
                        had_control_clients = true;
                    } else if had_control_clients {
                        had_control_clients = false;
                        self.on_no_clients();
                    }
                }
            }
        }
    }

    async fn accept_stream(&self, stream: TcpStream, addr: SocketAddr) {
        // Frames should leave as soon as they are written; Nagle only adds
        // latency to a one-way video stream.
        let _ = stream.set_nodelay(true);
        let mut slots = self.stream_slots.lock().await;
        // Reclaim stale slots first so a dead viewer's slot is reusable.
        sweep_table(&mut slots);
        match slots.acquire(stream) {
            Ok(index) => info!(%addr, slot = index, "new stream client"),
            Err(rejected) => {
                info!(%addr, "no free stream slots, rejecting");
                drop(rejected);
            }
        }
    }

    async fn accept_control(&self, stream: TcpStream, addr: SocketAddr) {
        // Reclaim slots whose peer has gone before deciding whether this
        // connection fits. Pumping the channel keeps the reclamation from
        // swallowing command bytes: final buffered lines are dispatched,
        // then the dead slot is released.
        self.channel.pump().await;
        let mut slots = self.control_slots.lock().await;
        match slots.acquire(ControlClient::new(stream)) {
            Ok(index) => {
                info!(%addr, slot = index, "new control client");
                self.display.show_large("Client connected");
                self.actuator.set_light(Light::Stop, true);
            }
            Err(rejected) => {
                info!(%addr, "no free control slots, rejecting");
                drop(rejected);
            }
        }
    }

    async fn sweep_stream_slots(&self) {
        let mut slots = self.stream_slots.lock().await;
        sweep_table(&mut slots);
    }

    /// The last control client is gone: show the address again and light
    /// up standby. Fires once per transition, not once per dead slot.
    fn on_no_clients(&self) {
        info!("no control clients connected, standing by");
        self.display.show_status("No clients connected");
        self.actuator.set_light(Light::Tail, true);
        self.actuator.set_light(Light::Stop, false);
    }
}

/// Release every streaming slot whose peer has disconnected.
fn sweep_table(slots: &mut SlotTable<TcpStream>) {
    for index in slots.live_indices() {
        let Some(stream) = slots.get_mut(index) else {
            continue;
        };
        if stream_peer_gone(stream) {
            info!(slot = index, "stream client disconnected");
            slots.release(index);
        }
    }
}

/// Probe a streaming socket without blocking. Viewers never send
/// meaningful data, so anything read is drained and ignored; EOF or a hard
/// error means the peer is gone.
fn stream_peer_gone(stream: &TcpStream) -> bool {
    let mut probe = [0u8; 32];
    loop {
        match stream.try_read(&mut probe) {
            Ok(0) => return true,
            Ok(_) => continue,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return false,
            Err(_) => return true,
        }
    }
}
