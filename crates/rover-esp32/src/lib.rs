//! ESP32 platform drivers for the rover.
//!
//! This crate provides the on-device implementations of the traits the
//! platform-agnostic crates are written against:
//! - [`wifi::EspWifiDriver`] - non-blocking station/AP control for the
//!   network lifecycle controller in `rover-net`
//! - [`nvs::NvsBlobRegion`] - credential blob storage in NVS flash
//!
//! # Architecture
//!
//! Nothing here contains policy: retry counts, timeouts and the
//! provisioning fallback all live in `rover-net`. This crate only maps
//! trait calls onto ESP-IDF.
//!
//! # Example
//!
//! ```ignore
//! use rover_esp32::nvs::NvsBlobRegion;
//! use rover_esp32::wifi::EspWifiDriver;
//! use rover_net::BlobCredentialStore;
//!
//! let driver = EspWifiDriver::new(peripherals.modem, sysloop)?;
//! let store = BlobCredentialStore::new(NvsBlobRegion::new(nvs_partition)?);
//! ```

pub mod nvs;
pub mod wifi;
