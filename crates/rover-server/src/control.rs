//! Control-port command channel.
//!
//! Each live control slot carries a line buffer fed by non-blocking reads
//! once per tick. Complete lines are parsed into [`Command`]s and
//! dispatched to the actuator; unrecognized text is logged and ignored and
//! never closes the connection.

use rover_core::{
    Actuator, DriveDirection, Light, StatusDisplay, DRIVE_SPEED_FULL, DRIVE_SPEED_REVERSE,
    DRIVE_SPEED_SLOW,
};
use rover_protocol::{parse_command, Command};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::slots::SlotTable;

/// Longest accepted command line. Anything longer without a newline is
/// discarded rather than buffered without bound.
pub const MAX_LINE_LEN: usize = 256;

/// One control connection: socket plus partial-line buffer.
pub struct ControlClient {
    stream: TcpStream,
    line_buf: Vec<u8>,
}

impl ControlClient {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            line_buf: Vec::new(),
        }
    }
}

/// Reads command lines from every live control slot and dispatches them.
pub struct CommandChannel {
    slots: Arc<Mutex<SlotTable<ControlClient>>>,
    actuator: Arc<dyn Actuator>,
    display: Arc<dyn StatusDisplay>,
}

impl CommandChannel {
    pub(crate) fn new(
        slots: Arc<Mutex<SlotTable<ControlClient>>>,
        actuator: Arc<dyn Actuator>,
        display: Arc<dyn StatusDisplay>,
    ) -> Self {
        Self {
            slots,
            actuator,
            display,
        }
    }

    /// Drain buffered input from every live control slot, dispatching each
    /// complete line. Slots whose peer has gone are released in place,
    /// after any lines that arrived before the close have been dispatched.
    /// Returns the live control-slot count after the sweep.
    pub async fn pump(&self) -> usize {
        let mut slots = self.slots.lock().await;
        for index in slots.live_indices() {
            let Some(client) = slots.get_mut(index) else {
                continue;
            };
            let (lines, gone) = read_available(client);
            for line in lines {
                self.dispatch(&line);
            }
            if let Some(reason) = gone {
                info!(slot = index, "control client disconnected ({})", reason);
                slots.release(index);
            }
        }
        slots.live_count()
    }

    /// Parse and act on one command line.
    fn dispatch(&self, line: &str) {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("ignoring control input: {}", e);
                return;
            }
        };

        debug!(?command, "command received");
        self.display.show("Command received");
        // Any recognized command clears the standby indicator; `stop`
        // re-raises it below.
        self.actuator.set_light(Light::Stop, false);

        match command {
            Command::Forward => self.actuator.drive(DriveDirection::Forward, DRIVE_SPEED_FULL),
            Command::ForwardSlow => self.actuator.drive(DriveDirection::Forward, DRIVE_SPEED_SLOW),
            Command::Reverse => self
                .actuator
                .drive(DriveDirection::Reverse, DRIVE_SPEED_REVERSE),
            Command::Stop => {
                self.actuator.stop();
                self.display.show_large("Rover32");
                self.actuator.set_light(Light::Stop, true);
            }
            Command::Drift(mode) => self.actuator.drift(mode),
            Command::Headlights(on) => self.actuator.set_light(Light::Head, on),
            Command::Steer(angle) => self.actuator.steer(angle),
        }
    }
}

/// Non-blocking read into the client's line buffer, returning every
/// complete line plus a reason if the peer is gone.
///
/// EOF does not discard input: a client may send a final command (often
/// `stop`) and close in the same instant, and that command must still be
/// dispatched before the slot is released.
fn read_available(client: &mut ControlClient) -> (Vec<String>, Option<&'static str>) {
    let mut gone = None;
    let mut chunk = [0u8; 128];
    loop {
        match client.stream.try_read(&mut chunk) {
            Ok(0) => {
                gone = Some("peer closed");
                break;
            }
            Ok(n) => client.line_buf.extend_from_slice(&chunk[..n]),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(_) => {
                gone = Some("read error");
                break;
            }
        }
    }

    let mut lines = Vec::new();
    while let Some(pos) = client.line_buf.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = client.line_buf.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&raw).into_owned());
    }

    if client.line_buf.len() > MAX_LINE_LEN {
        warn!("discarding overlong control line without newline");
        client.line_buf.clear();
    }
    (lines, gone)
}
