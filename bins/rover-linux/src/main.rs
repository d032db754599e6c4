//! Rover session manager on a Linux host.
//!
//! Runs the real network lifecycle, session server and provisioning portal
//! against simulated peripherals: motors and lights log their actuation,
//! the display logs its text, the camera synthesizes JPEG-framed buffers,
//! and "WiFi" is the host's own networking (any non-empty SSID associates
//! immediately).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rover_core::{
    Actuator, CredentialStore, DeviceConfig, DriftMode, DriveDirection, Frame, FrameSource,
    Light, PixelFormat, StatusDisplay, WifiCredentials,
};
use rover_net::{
    BlobCredentialStore, BlobRegion, LifecycleEvent, NetConfig, NetError, NetworkController,
    WifiDriver,
};
use rover_server::{FrameBroadcaster, RoverServer, ServerConfig};
use rover_web::{create_router, PortalState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,rover_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Rover32 starting...");

    let device = load_device_config()?;

    let actuator: Arc<dyn Actuator> = Arc::new(LogActuator);
    let display: Arc<dyn StatusDisplay> = Arc::new(LogDisplay);
    display.show_large(&device.name);

    let store: Arc<dyn CredentialStore> = Arc::new(BlobCredentialStore::new(FileBlob::new(
        credential_path(),
    )));

    let mut controller = NetworkController::new(
        HostWifiDriver::default(),
        Arc::clone(&store),
        Arc::clone(&display),
        Arc::clone(&actuator),
        NetConfig::from_device(&device),
        device.sta_credentials.clone(),
    );
    let shared_credentials = controller.credentials();

    // Drive the lifecycle until station mode is up. Provisioning keeps the
    // loop alive: the portal swaps credentials in and a later tick connects.
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut portal_started = false;
    let ip = loop {
        ticker.tick().await;
        match controller.tick(Instant::now())? {
            Some(LifecycleEvent::Connected { ip }) => break ip,
            Some(LifecycleEvent::EnteredProvisioning) if !portal_started => {
                portal_started = true;
                let state = PortalState::new(
                    Arc::clone(&shared_credentials),
                    Arc::clone(&store),
                    Arc::clone(&display),
                );
                tokio::spawn(async move {
                    if let Err(e) = run_portal(state).await {
                        tracing::error!("portal error: {}", e);
                    }
                });
            }
            _ => {}
        }
    };

    let server = RoverServer::new(
        ServerConfig::from_device(&device),
        Arc::clone(&actuator),
        Arc::clone(&display),
    );
    let broadcaster = server.broadcaster();

    let camera_handle = tokio::spawn(async move {
        stream_camera(broadcaster).await;
    });

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("server error: {}", e);
        }
    });

    tracing::info!("🚙 Rover32 ready!");
    tracing::info!("   Stream:  tcp://{}:{}", ip, device.stream_port);
    tracing::info!("   Control: tcp://{}:{}", ip, device.control_port);
    tracing::info!("");
    tracing::info!("Try these commands:");
    tracing::info!("   nc {} {}   # then type: go, stop, steer:90", ip, device.control_port);
    tracing::info!("   nc {} {} | xxd | head", ip, device.stream_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = server_handle => {
            tracing::warn!("Server stopped");
        }
        _ = camera_handle => {
            tracing::warn!("Camera stopped");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Load the device config, in order of preference: the JSON file named by
/// `ROVER_CONFIG`, then defaults. `ROVER_SSID`/`ROVER_PASSWORD` override
/// the compiled-in station credentials either way.
fn load_device_config() -> anyhow::Result<DeviceConfig> {
    let mut device = match std::env::var("ROVER_CONFIG") {
        Ok(path) => {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        }
        Err(_) => DeviceConfig::default(),
    };

    if let Ok(ssid) = std::env::var("ROVER_SSID") {
        let password = std::env::var("ROVER_PASSWORD").unwrap_or_default();
        device.sta_credentials = WifiCredentials::new(ssid, password);
    }
    Ok(device)
}

fn credential_path() -> PathBuf {
    std::env::var("ROVER_CRED_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp/rover32-credentials.bin"))
}

/// Serve the provisioning portal. Port 80 needs privileges on a host, so
/// the simulation uses 8080.
async fn run_portal(state: PortalState) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("Setup portal listening on http://0.0.0.0:8080");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Capture loop: one synthetic frame every 100ms (about the reference
/// camera's rate).
async fn stream_camera(broadcaster: FrameBroadcaster) {
    let mut camera = SyntheticCamera::default();
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
        interval.tick().await;
        if let Some(frame) = camera.capture() {
            broadcaster.broadcast(&frame).await;
        }
    }
}

// ----------------------------------------------------------------------
// Simulated peripherals
// ----------------------------------------------------------------------

/// Motors, servo and lights that log instead of actuating.
struct LogActuator;

impl Actuator for LogActuator {
    fn drive(&self, direction: DriveDirection, speed: u8) {
        tracing::info!(?direction, speed, "motors: drive");
    }

    fn stop(&self) {
        tracing::info!("motors: stop");
    }

    fn drift(&self, mode: DriftMode) {
        tracing::info!(?mode, "motors: drift");
    }

    fn steer(&self, angle: u8) {
        tracing::info!(angle, "servo: steer");
    }

    fn set_light(&self, light: Light, on: bool) {
        tracing::info!(?light, on, "light");
    }
}

/// OLED stand-in.
struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show(&self, text: &str) {
        tracing::info!(text, "display");
    }

    fn show_large(&self, text: &str) {
        tracing::info!(text, "display (large)");
    }

    fn show_status(&self, ip_or_message: &str) {
        tracing::info!(status = ip_or_message, "display");
    }
}

/// "WiFi" on a host that already has networking: any non-empty SSID
/// associates on the next poll. An empty SSID never associates, which
/// exercises the retry and provisioning path end to end.
#[derive(Default)]
struct HostWifiDriver {
    associated: bool,
    ap_ssid: Option<String>,
}

impl WifiDriver for HostWifiDriver {
    fn begin_station(&mut self, credentials: &WifiCredentials) -> Result<(), NetError> {
        self.associated = !credentials.ssid.is_empty();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.associated
    }

    fn local_ip(&self) -> Option<String> {
        self.associated.then(|| "127.0.0.1".to_string())
    }

    fn start_access_point(&mut self, ssid: &str) -> Result<(), NetError> {
        tracing::info!(ssid, "simulated access point up");
        self.ap_ssid = Some(ssid.to_string());
        Ok(())
    }

    fn stop_access_point(&mut self) -> Result<(), NetError> {
        if self.ap_ssid.take().is_some() {
            tracing::info!("simulated access point down");
        }
        Ok(())
    }
}

/// Credential blob region in a plain file.
struct FileBlob {
    path: PathBuf,
}

impl FileBlob {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl BlobRegion for FileBlob {
    fn read(&self) -> Result<Vec<u8>, rover_core::CredentialError> {
        match std::fs::read(&self.path) {
            Ok(data) => Ok(data),
            // Never written: decodes as "no stored credential".
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(rover_core::CredentialError::Read(e.to_string())),
        }
    }

    fn write(&self, data: &[u8]) -> Result<(), rover_core::CredentialError> {
        std::fs::write(&self.path, data)
            .map_err(|e| rover_core::CredentialError::Write(e.to_string()))
    }
}

/// Frame source producing JPEG-delimited filler of varying size.
#[derive(Default)]
struct SyntheticCamera {
    buffer: Vec<u8>,
    seq: u32,
}

impl FrameSource for SyntheticCamera {
    fn capture(&mut self) -> Option<Frame<'_>> {
        self.seq = self.seq.wrapping_add(1);
        self.buffer.clear();
        self.buffer.extend_from_slice(&[0xFF, 0xD8]); // SOI
        let body = 512 + (self.seq as usize % 1024);
        self.buffer.resize(2 + body, 0x55);
        self.buffer.extend_from_slice(&[0xFF, 0xD9]); // EOI
        Some(Frame::new(&self.buffer, PixelFormat::Jpeg))
    }
}
