// Transport configuration for building reqwest::Client instances.
//
// The Serial API is a hosted HTTPS service, so there are no TLS knobs
// here -- just the timeout and the authenticated-client builder used
// by `ApiClient::from_api_key`.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;

/// Transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a plain `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("serialmfg-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(crate::error::Error::Transport)
    }

    /// Build a `reqwest::Client` with a bearer-token default header.
    ///
    /// The header value is marked sensitive so it never shows up in logs.
    pub fn build_authenticated_client(
        &self,
        api_key: &secrecy::SecretString,
    ) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| crate::error::Error::InvalidApiKeyValue {
                message: e.to_string(),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("serialmfg-rs/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
