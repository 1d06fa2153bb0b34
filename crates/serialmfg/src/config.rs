//! Client configuration.
//!
//! One immutable `ClientConfig` per client. There is no process-wide
//! mutable state: rotating credentials means building a new
//! `SerialClient`, so an in-flight submission can never race a key
//! change.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// The vendor's hosted API.
pub const DEFAULT_BASE_URL: &str = "https://api.serial.io";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable configuration for a [`SerialClient`](crate::SerialClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub api_key: SecretString,
    /// Default station id attached to created process entries when the
    /// caller doesn't pass one explicitly.
    pub station_id: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config pointing at the hosted API with default timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            api_key: SecretString::from(api_key.into()),
            station_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point at a different deployment (e.g. a staging environment).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, Error> {
        self.base_url = Url::parse(base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL {base_url:?}: {e}"),
        })?;
        Ok(self)
    }

    pub fn with_station_id(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = Some(station_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a config from the environment: `SERIAL_API_KEY` (required),
    /// `SERIAL_BASE_URL` and `SERIAL_STATION_ID` (optional).
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("SERIAL_API_KEY").map_err(|_| Error::Config {
            message: "SERIAL_API_KEY is not set".into(),
        })?;

        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("SERIAL_BASE_URL") {
            config = config.with_base_url(&url)?;
        }
        if let Ok(station) = std::env::var("SERIAL_STATION_ID") {
            config = config.with_station_id(station);
        }
        Ok(config)
    }
}
