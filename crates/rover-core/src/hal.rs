//! Peripheral sink traits.
//!
//! The session manager core talks to hardware only through these traits:
//! the camera is a frame producer, motors/servo/lights are an actuation
//! sink, the OLED is a status sink, and credential storage is a key-value
//! blob store for two short strings. Platform crates (Linux simulation,
//! ESP32 drivers) provide the implementations.

use crate::config::WifiCredentials;
use crate::frame::Frame;
use thiserror::Error;

/// Drive direction for the two DC motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveDirection {
    Forward,
    Reverse,
}

/// Drift spin direction. Both motors run full power against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftMode {
    Clockwise,
    CounterClockwise,
}

/// Addressable light groups on the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    Head,
    Tail,
    /// Standby/stop indicator, raised while no command is driving the rover.
    Stop,
}

/// Full drive speed (PWM duty).
pub const DRIVE_SPEED_FULL: u8 = 255;
/// Reduced forward speed for the `goSlow` command.
pub const DRIVE_SPEED_SLOW: u8 = 100;
/// Reverse speed.
pub const DRIVE_SPEED_REVERSE: u8 = 150;

/// Motor, steering and light actuation. Fire-and-forget: no return value
/// is consulted, a failed actuation is the implementation's problem.
pub trait Actuator: Send + Sync {
    /// Run both motors in the given direction at the given PWM duty.
    fn drive(&self, direction: DriveDirection, speed: u8);

    /// Stop both motors.
    fn stop(&self);

    /// Spin in place.
    fn drift(&self, mode: DriftMode);

    /// Set the steering servo angle in degrees. Callers pass angles already
    /// clamped to the mechanically safe range.
    fn steer(&self, angle: u8);

    /// Turn a light group on or off.
    fn set_light(&self, light: Light, on: bool);
}

/// Small-display status renderer. Fire-and-forget status text.
pub trait StatusDisplay: Send + Sync {
    /// Show a short multi-line status message.
    fn show(&self, text: &str);

    /// Show a single line in large type.
    fn show_large(&self, text: &str);

    /// Show the device address or a connectivity message.
    fn show_status(&self, ip_or_message: &str);
}

/// Camera frame producer.
///
/// `capture` lends the internal frame buffer out for the duration of the
/// returned borrow; the producer may not capture again while a frame is
/// lent out, which the `&mut self` receiver enforces.
pub trait FrameSource: Send {
    /// Capture the next frame, or `None` when no frame is ready.
    fn capture(&mut self) -> Option<Frame<'_>>;
}

/// Errors from the credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential storage read failed: {0}")]
    Read(String),

    #[error("credential storage write failed: {0}")]
    Write(String),

    #[error("stored credential data is invalid: {0}")]
    InvalidData(String),
}

/// Persisted storage for one SSID/passphrase pair.
pub trait CredentialStore: Send + Sync {
    /// Load the stored credentials. `Ok(None)` means nothing (valid) is
    /// stored and the caller should fall back to compiled-in defaults.
    fn load(&self) -> Result<Option<WifiCredentials>, CredentialError>;

    /// Persist new credentials, replacing any stored pair.
    fn save(&self, credentials: &WifiCredentials) -> Result<(), CredentialError>;
}
