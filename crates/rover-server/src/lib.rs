//! # rover-server
//!
//! The rover's networked session manager: a fixed-capacity broadcast
//! server for camera frames plus a text command channel.
//!
//! This crate provides:
//! - [`SlotTable`]: owned, bounds-checked connection slots with hard
//!   backpressure (excess clients are dropped, never queued)
//! - [`RoverServer`]: the connection acceptor and command channel,
//!   select-driven on two TCP listeners and a liveness tick
//! - [`FrameBroadcaster`]: best-effort frame fan-out to all live viewers
//!
//! The server is started once the network lifecycle controller reports
//! `StationConnected`; see `rover-net`.

pub mod broadcast;
pub mod control;
pub mod server;
pub mod slots;

pub use broadcast::{FrameBroadcaster, WRITE_CHUNK};
pub use control::{CommandChannel, ControlClient, MAX_LINE_LEN};
pub use server::{RoverServer, ServerConfig};
pub use slots::SlotTable;
