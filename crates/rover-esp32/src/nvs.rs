//! NVS (Non-Volatile Storage) credential region for ESP32.
//!
//! Stores the fixed-layout credential blob from `rover-net` under a single
//! NVS key, so a factory-fresh device reads as "nothing stored" and falls
//! back to its compiled-in defaults.

use std::sync::Mutex;

use anyhow::Result;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use rover_core::CredentialError;
use rover_net::{BlobRegion, CRED_BLOB_LEN};

const NAMESPACE: &str = "rover";
const BLOB_KEY: &str = "wifi_cred";

/// [`BlobRegion`] backed by a key in the default NVS partition.
pub struct NvsBlobRegion {
    nvs: Mutex<EspNvs<NvsDefault>>,
}

impl NvsBlobRegion {
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self> {
        let nvs = EspNvs::new(partition, NAMESPACE, true)?;
        Ok(Self {
            nvs: Mutex::new(nvs),
        })
    }
}

impl BlobRegion for NvsBlobRegion {
    fn read(&self) -> Result<Vec<u8>, CredentialError> {
        let nvs = self
            .nvs
            .lock()
            .map_err(|_| CredentialError::Read("nvs lock poisoned".to_string()))?;
        let mut buf = vec![0u8; CRED_BLOB_LEN];
        match nvs.get_blob(BLOB_KEY, &mut buf) {
            Ok(Some(data)) => Ok(data.to_vec()),
            // Key never written: decodes as "no stored credential".
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(CredentialError::Read(e.to_string())),
        }
    }

    fn write(&self, data: &[u8]) -> Result<(), CredentialError> {
        let mut nvs = self
            .nvs
            .lock()
            .map_err(|_| CredentialError::Write("nvs lock poisoned".to_string()))?;
        nvs.set_blob(BLOB_KEY, data)
            .map_err(|e| CredentialError::Write(e.to_string()))
    }
}
