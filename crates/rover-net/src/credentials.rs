//! Credential persistence.
//!
//! Credentials are stored as two length-prefixed byte strings in a fixed
//! 98-byte blob region:
//!
//! ```text
//! [ssid_len: u8][ssid: 32 bytes][pass_len: u8][password: 64 bytes]
//! ```
//!
//! A stored length of 0 or >= the field maximum decodes as "no stored
//! credential", failing safe to the compiled-in defaults. The same layout
//! is used on every platform; only the backing region differs (file on
//! Linux, NVS blob on ESP32, memory in tests).

use rover_core::{CredentialError, CredentialStore, WifiCredentials};
use std::sync::RwLock;

/// Maximum SSID length in bytes (exclusive: a stored length must be less).
pub const MAX_SSID_LEN: usize = 32;
/// Maximum passphrase length in bytes (exclusive).
pub const MAX_PASSWORD_LEN: usize = 64;
/// Total blob region size.
pub const CRED_BLOB_LEN: usize = 2 + MAX_SSID_LEN + MAX_PASSWORD_LEN;

const SSID_LEN_OFFSET: usize = 0;
const SSID_OFFSET: usize = 1;
const PASS_LEN_OFFSET: usize = 1 + MAX_SSID_LEN;
const PASS_OFFSET: usize = 2 + MAX_SSID_LEN;

/// Encode credentials into a fresh blob.
pub fn encode_credentials(
    credentials: &WifiCredentials,
) -> Result<[u8; CRED_BLOB_LEN], CredentialError> {
    let ssid = credentials.ssid.as_bytes();
    let password = credentials.password.as_bytes();
    if ssid.len() >= MAX_SSID_LEN {
        return Err(CredentialError::InvalidData(format!(
            "ssid of {} bytes exceeds the {} byte field",
            ssid.len(),
            MAX_SSID_LEN
        )));
    }
    if password.len() >= MAX_PASSWORD_LEN {
        return Err(CredentialError::InvalidData(format!(
            "password of {} bytes exceeds the {} byte field",
            password.len(),
            MAX_PASSWORD_LEN
        )));
    }

    let mut blob = [0u8; CRED_BLOB_LEN];
    blob[SSID_LEN_OFFSET] = ssid.len() as u8;
    blob[SSID_OFFSET..SSID_OFFSET + ssid.len()].copy_from_slice(ssid);
    blob[PASS_LEN_OFFSET] = password.len() as u8;
    blob[PASS_OFFSET..PASS_OFFSET + password.len()].copy_from_slice(password);
    Ok(blob)
}

/// Decode a blob region. Returns `None` when nothing valid is stored:
/// a short region, an SSID length of 0 or >= the maximum, or bytes that
/// are not UTF-8.
pub fn decode_credentials(blob: &[u8]) -> Option<WifiCredentials> {
    if blob.len() < CRED_BLOB_LEN {
        return None;
    }

    let ssid_len = blob[SSID_LEN_OFFSET] as usize;
    if ssid_len == 0 || ssid_len >= MAX_SSID_LEN {
        return None;
    }
    let ssid = std::str::from_utf8(&blob[SSID_OFFSET..SSID_OFFSET + ssid_len]).ok()?;

    // An out-of-range password length degrades to an open-network pair
    // rather than discarding a valid SSID.
    let pass_len = blob[PASS_LEN_OFFSET] as usize;
    let password = if pass_len > 0 && pass_len < MAX_PASSWORD_LEN {
        std::str::from_utf8(&blob[PASS_OFFSET..PASS_OFFSET + pass_len]).ok()?
    } else {
        ""
    };

    Some(WifiCredentials::new(ssid, password))
}

/// A raw fixed-size byte region the credential blob lives in.
pub trait BlobRegion: Send + Sync {
    /// Read the whole region. A fresh (never-written) region may be empty.
    fn read(&self) -> Result<Vec<u8>, CredentialError>;

    /// Overwrite the whole region.
    fn write(&self, data: &[u8]) -> Result<(), CredentialError>;
}

/// [`CredentialStore`] over any [`BlobRegion`].
pub struct BlobCredentialStore<B> {
    region: B,
}

impl<B: BlobRegion> BlobCredentialStore<B> {
    pub fn new(region: B) -> Self {
        Self { region }
    }
}

impl<B: BlobRegion> CredentialStore for BlobCredentialStore<B> {
    fn load(&self) -> Result<Option<WifiCredentials>, CredentialError> {
        let blob = self.region.read()?;
        Ok(decode_credentials(&blob))
    }

    fn save(&self, credentials: &WifiCredentials) -> Result<(), CredentialError> {
        let blob = encode_credentials(credentials)?;
        self.region.write(&blob)
    }
}

/// In-memory blob region for tests and host-side simulation.
#[derive(Default)]
pub struct MemoryBlob {
    data: RwLock<Vec<u8>>,
}

impl MemoryBlob {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobRegion for MemoryBlob {
    fn read(&self) -> Result<Vec<u8>, CredentialError> {
        Ok(self.data.read().map_err(poisoned)?.clone())
    }

    fn write(&self, data: &[u8]) -> Result<(), CredentialError> {
        *self.data.write().map_err(poisoned)? = data.to_vec();
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> CredentialError {
    CredentialError::Read("blob lock poisoned".to_string())
}
