//! # rover-core
//!
//! Core rover data types and hardware-facing traits.
//!
//! This crate provides:
//! - Camera frame types (`Frame`, `PixelFormat`)
//! - Device configuration (`DeviceConfig`, `WifiCredentials`)
//! - Peripheral sink traits (`Actuator`, `StatusDisplay`, `FrameSource`,
//!   `CredentialStore`)
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! making it usable on both Linux (tokio) and ESP32 (esp-idf) targets.

pub mod config;
pub mod frame;
pub mod hal;

pub use config::{DeviceConfig, WifiCredentials};
pub use frame::{Frame, PixelFormat};
pub use hal::{
    Actuator, CredentialError, CredentialStore, DriftMode, DriveDirection, FrameSource, Light,
    StatusDisplay, DRIVE_SPEED_FULL, DRIVE_SPEED_REVERSE, DRIVE_SPEED_SLOW,
};

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    // Downstream crates import the speed constants from the crate root.
    #[test]
    fn drive_speeds_are_exported_at_the_root() {
        assert_eq!(crate::DRIVE_SPEED_FULL, 255);
        assert_eq!(crate::DRIVE_SPEED_SLOW, 100);
        assert_eq!(crate::DRIVE_SPEED_REVERSE, 150);
    }
}
