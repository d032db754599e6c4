//! WiFi driver for ESP32.
//!
//! Maps the non-blocking [`WifiDriver`] trait onto `EspWifi`. Association
//! runs asynchronously inside ESP-IDF; the lifecycle controller polls
//! `is_connected` on its tick. While the provisioning access point is up
//! the interface runs in mixed (AP + STA) mode so portal credentials can
//! be tried without dropping connected phones.

use anyhow::Result;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::peripheral,
    wifi::{
        AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
    },
};
use log::info;

use rover_core::WifiCredentials;
use rover_net::{NetError, WifiDriver};

/// [`WifiDriver`] over the ESP32 modem.
pub struct EspWifiDriver {
    wifi: EspWifi<'static>,
    sta_config: Option<ClientConfiguration>,
    ap_config: Option<AccessPointConfiguration>,
}

impl EspWifiDriver {
    pub fn new(
        modem: impl peripheral::Peripheral<P = esp_idf_svc::hal::modem::Modem> + 'static,
        sysloop: EspSystemEventLoop,
    ) -> Result<Self> {
        let wifi = EspWifi::new(modem, sysloop, None)?;
        Ok(Self {
            wifi,
            sta_config: None,
            ap_config: None,
        })
    }

    /// Push the current station/AP pair down to the interface and make
    /// sure it is started.
    fn apply(&mut self) -> Result<(), NetError> {
        let configuration = match (&self.sta_config, &self.ap_config) {
            (Some(sta), Some(ap)) => Configuration::Mixed(sta.clone(), ap.clone()),
            (Some(sta), None) => Configuration::Client(sta.clone()),
            (None, Some(ap)) => Configuration::AccessPoint(ap.clone()),
            (None, None) => return Ok(()),
        };
        self.wifi.set_configuration(&configuration).map_err(driver)?;
        if !self.wifi.is_started().map_err(driver)? {
            self.wifi.start().map_err(driver)?;
        }
        Ok(())
    }
}

impl WifiDriver for EspWifiDriver {
    fn begin_station(&mut self, credentials: &WifiCredentials) -> Result<(), NetError> {
        let auth_method = if credentials.password.is_empty() {
            info!("WiFi password is empty, using open network");
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        self.sta_config = Some(ClientConfiguration {
            ssid: credentials
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| NetError::Driver("SSID too long".to_string()))?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| NetError::Driver("password too long".to_string()))?,
            auth_method,
            ..Default::default()
        });
        self.apply()?;

        info!("Connecting to '{}'...", credentials.ssid);
        self.wifi.connect().map_err(driver)
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn local_ip(&self) -> Option<String> {
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip.to_string())
    }

    fn start_access_point(&mut self, ssid: &str) -> Result<(), NetError> {
        info!("Starting setup access point '{}'", ssid);
        self.ap_config = Some(AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| NetError::Driver("AP SSID too long".to_string()))?,
            auth_method: AuthMethod::None,
            ..Default::default()
        });
        self.apply()
    }

    fn stop_access_point(&mut self) -> Result<(), NetError> {
        if self.ap_config.take().is_some() {
            info!("Stopping setup access point");
            self.apply()?;
        }
        Ok(())
    }
}

fn driver(e: impl std::fmt::Display) -> NetError {
    NetError::Driver(e.to_string())
}
