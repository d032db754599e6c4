//! # rover-net
//!
//! WiFi connectivity lifecycle for the rover.
//!
//! This crate provides:
//! - The four-state network lifecycle (`Disconnected`, `Connecting`,
//!   `StationConnected`, `ApProvisioning`) as a pure transition function
//! - [`NetworkController`], which drives the state machine against a
//!   platform [`WifiDriver`] with bounded, blink-indicated attempts
//! - The length-prefixed credential blob codec and [`BlobCredentialStore`]
//!
//! Timing enters only through the `Instant` passed to
//! [`NetworkController::tick`], so the whole lifecycle is testable with a
//! mock driver and a synthetic clock.

pub mod credentials;
pub mod lifecycle;

pub use credentials::{
    decode_credentials, encode_credentials, BlobCredentialStore, BlobRegion, MemoryBlob,
    CRED_BLOB_LEN, MAX_PASSWORD_LEN, MAX_SSID_LEN,
};
pub use lifecycle::{
    next_state, LifecycleEvent, NetConfig, NetError, NetworkController, NetworkEvent,
    NetworkState, WifiDriver,
};
