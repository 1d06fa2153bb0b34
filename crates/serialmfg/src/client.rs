//! The `SerialClient` facade.

use std::sync::Arc;

use serialmfg_api::{ApiClient, TransportConfig};

use crate::catalog::{Datasets, PartNumbers};
use crate::config::ClientConfig;
use crate::entries::ProcessEntries;
use crate::error::Error;
use crate::instances::ComponentInstances;
use crate::operators::Operators;

/// Entry point for all Serial API operations.
///
/// Holds the authenticated HTTP client and the default station id.
/// Cheap accessors return borrowed resource handles; handles that
/// outlive a call site (`ProcessEntry`, `ComponentInstance`) share the
/// underlying client via `Arc`.
pub struct SerialClient {
    api: Arc<ApiClient>,
    station_id: Option<String>,
}

impl SerialClient {
    /// Build an authenticated client from config.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = TransportConfig {
            timeout: config.timeout,
        };
        let api = ApiClient::from_api_key(config.base_url.as_str(), &config.api_key, &transport)?;
        Ok(Self {
            api: Arc::new(api),
            station_id: config.station_id,
        })
    }

    /// Wrap a pre-built raw client (useful in tests, where auth headers
    /// are managed by the caller).
    pub fn with_api_client(api: ApiClient, station_id: Option<String>) -> Self {
        Self {
            api: Arc::new(api),
            station_id,
        }
    }

    /// Default station id attached to created process entries.
    pub fn station_id(&self) -> Option<&str> {
        self.station_id.as_deref()
    }

    /// The raw endpoint client (escape hatch).
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub(crate) fn api_arc(&self) -> Arc<ApiClient> {
        Arc::clone(&self.api)
    }

    // ── Resource handles ─────────────────────────────────────────────

    pub fn instances(&self) -> ComponentInstances<'_> {
        ComponentInstances::new(self)
    }

    pub fn entries(&self) -> ProcessEntries<'_> {
        ProcessEntries::new(self)
    }

    pub fn datasets(&self) -> Datasets<'_> {
        Datasets::new(&self.api)
    }

    pub fn part_numbers(&self) -> PartNumbers<'_> {
        PartNumbers::new(&self.api)
    }

    pub fn operators(&self) -> Operators<'_> {
        Operators::new(self)
    }
}
