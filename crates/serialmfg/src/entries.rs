//! Process entry lifecycle: creation, lookup, listing.

use serialmfg_api::types::CreateProcessEntryRequest;
use tracing::debug;
use uuid::Uuid;

use crate::catalog;
use crate::client::SerialClient;
use crate::entry::ProcessEntry;
use crate::error::Error;
use crate::instances::ComponentInstance;

/// Process entry data methods.
pub struct ProcessEntries<'c> {
    client: &'c SerialClient,
}

impl<'c> ProcessEntries<'c> {
    pub(crate) fn new(client: &'c SerialClient) -> Self {
        Self { client }
    }

    /// Start building a new entry for `process_id`. Exactly one of the
    /// component-instance setters must be supplied before
    /// [`CreateEntryBuilder::send`].
    pub fn create(&self, process_id: Uuid) -> CreateEntryBuilder<'c> {
        CreateEntryBuilder {
            client: self.client,
            process_id,
            component_instance_id: None,
            instance_handle_id: None,
            component_instance_identifier: None,
            station_id: None,
            timestamp: None,
        }
    }

    /// Fetch an entry by id. [`Error::ProcessEntryNotFound`] on an
    /// empty result.
    pub async fn get(&self, id: Uuid) -> Result<ProcessEntry, Error> {
        let mut entries = self
            .client
            .api()
            .list_process_entries(&[("id", id.to_string())])
            .await?;
        if entries.is_empty() {
            return Err(Error::ProcessEntryNotFound { id: id.to_string() });
        }
        Ok(ProcessEntry::new(
            self.client.api_arc(),
            entries.swap_remove(0),
        ))
    }

    /// List entries matching caller-supplied query params (thin
    /// pass-through).
    pub async fn list(&self, params: &[(&str, String)]) -> Result<Vec<ProcessEntry>, Error> {
        let entries = self.client.api().list_process_entries(params).await?;
        Ok(entries
            .into_iter()
            .map(|data| ProcessEntry::new(self.client.api_arc(), data))
            .collect())
    }
}

/// Builder for `POST /processes/entries`.
pub struct CreateEntryBuilder<'c> {
    client: &'c SerialClient,
    process_id: Uuid,
    component_instance_id: Option<Uuid>,
    instance_handle_id: Option<Uuid>,
    component_instance_identifier: Option<String>,
    station_id: Option<String>,
    timestamp: Option<String>,
}

impl CreateEntryBuilder<'_> {
    /// Target an already-fetched instance.
    pub fn component_instance(mut self, instance: &ComponentInstance) -> Self {
        self.instance_handle_id = Some(instance.id());
        self
    }

    /// Target an instance by remote id. Takes precedence over the other
    /// two setters.
    pub fn component_instance_id(mut self, id: Uuid) -> Self {
        self.component_instance_id = Some(id);
        self
    }

    /// Target an instance by user-facing identifier; resolved with an
    /// extra lookup at send time.
    pub fn component_instance_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.component_instance_identifier = Some(identifier.into());
        self
    }

    /// Override the client's default station id.
    pub fn station_id(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = Some(station_id.into());
        self
    }

    /// Override the server-side timestamp. Must be ISO 8601.
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Create the entry.
    ///
    /// Local preconditions (an instance argument is present, the
    /// timestamp parses) are checked before any request is issued.
    pub async fn send(self) -> Result<ProcessEntry, Error> {
        if let Some(ref timestamp) = self.timestamp {
            if !is_iso_timestamp(timestamp) {
                return Err(Error::InvalidArgument {
                    message: format!("timestamp {timestamp:?} is not ISO 8601"),
                });
            }
        }

        let component_instance_id = if let Some(id) = self.component_instance_id {
            id
        } else if let Some(id) = self.instance_handle_id {
            id
        } else if let Some(ref identifier) = self.component_instance_identifier {
            catalog::instance_by_identifier(self.client.api(), identifier)
                .await?
                .id
        } else {
            return Err(Error::InvalidArgument {
                message: "a component instance id, instance, or identifier is required".into(),
            });
        };

        let station_id = self
            .station_id
            .or_else(|| self.client.station_id().map(str::to_owned));

        debug!(process_id = %self.process_id, %component_instance_id, "creating process entry");
        let data = self
            .client
            .api()
            .create_process_entry(&CreateProcessEntryRequest {
                component_instance_id,
                process_id: self.process_id,
                station_id,
                timestamp: self.timestamp,
            })
            .await?;
        Ok(ProcessEntry::new(self.client.api_arc(), data))
    }
}

/// ISO 8601 acceptance, matching what the server takes: an RFC 3339
/// date-time with offset, a naive date-time, or a bare date.
fn is_iso_timestamp(timestamp: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(timestamp).is_ok()
        || chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::NaiveDate::parse_from_str(timestamp, "%Y-%m-%d").is_ok()
}
