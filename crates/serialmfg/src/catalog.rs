//! Catalog resolution: datasets, part numbers, component types, and
//! component-instance lookup by identifier.
//!
//! Everything here is keyed by human-readable names. Get-or-create
//! follows a conflict-tolerant ladder: get, then create, and if the
//! create loses a race to a concurrent creator (HTTP 409), one more
//! get. Only when both legs miss does the caller see [`Error::RaceLost`].

use serialmfg_api::ApiClient;
use serialmfg_api::types::{
    ComponentInstanceResponse, ComponentResponse, CreateDatasetRequest, CreatePartNumberRequest,
    DataType, DatasetResponse, PartNumberResponse,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;

// ── Shared lookups ───────────────────────────────────────────────────

/// Resolve a component type by its user-facing name.
pub(crate) async fn component_by_name(
    api: &ApiClient,
    name: &str,
) -> Result<ComponentResponse, Error> {
    let mut components = api.list_components(&[("name", name.to_owned())]).await?;
    if components.is_empty() {
        return Err(Error::ComponentNotFound { name: name.into() });
    }
    Ok(components.swap_remove(0))
}

/// Resolve a component instance by its user-facing identifier.
///
/// Zero matches is `ComponentInstanceNotFound`; more than one is a
/// data-integrity fault surfaced as `AmbiguousIdentifier`.
pub(crate) async fn instance_by_identifier(
    api: &ApiClient,
    identifier: &str,
) -> Result<ComponentInstanceResponse, Error> {
    let mut instances = api
        .list_component_instances(&[("identifier", identifier.to_owned())])
        .await?;
    match instances.len() {
        0 => Err(Error::ComponentInstanceNotFound {
            identifier: identifier.into(),
        }),
        1 => Ok(instances.swap_remove(0)),
        count => Err(Error::AmbiguousIdentifier {
            identifier: identifier.into(),
            count,
        }),
    }
}

// ── Datasets ─────────────────────────────────────────────────────────

/// Optional dataset creation metadata (numerical datasets).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSpec {
    pub usl: Option<f64>,
    pub lsl: Option<f64>,
    pub unit: Option<String>,
}

/// Dataset lookup and creation, scoped to a process.
pub struct Datasets<'c> {
    api: &'c ApiClient,
}

impl<'c> Datasets<'c> {
    pub(crate) fn new(api: &'c ApiClient) -> Self {
        Self { api }
    }

    /// Exact-match lookup by (name, type, process).
    pub async fn get(
        &self,
        name: &str,
        data_type: DataType,
        process_id: Uuid,
    ) -> Result<DatasetResponse, Error> {
        let mut datasets = self
            .api
            .list_datasets(&[
                ("name", name.to_owned()),
                ("type", data_type.as_str().to_owned()),
                ("process_id", process_id.to_string()),
            ])
            .await?;
        if datasets.is_empty() {
            return Err(Error::DatasetNotFound {
                name: name.into(),
                data_type,
            });
        }
        Ok(datasets.swap_remove(0))
    }

    /// Create a dataset; `spec` fields are forwarded verbatim and
    /// omitted from the body when absent.
    pub async fn create(
        &self,
        name: &str,
        data_type: DataType,
        process_id: Uuid,
        spec: &DatasetSpec,
    ) -> Result<DatasetResponse, Error> {
        debug!(name, %data_type, %process_id, "creating dataset");
        let dataset = self
            .api
            .create_dataset(&CreateDatasetRequest {
                name: name.to_owned(),
                data_type,
                process_id,
                usl: spec.usl,
                lsl: spec.lsl,
                unit: spec.unit.clone(),
            })
            .await?;
        Ok(dataset)
    }

    /// Get, falling back to create on a miss.
    ///
    /// Concurrent first-time callers can race the create; a 409 from the
    /// server means someone else won, so the get is retried once before
    /// giving up with `RaceLost`.
    pub async fn get_or_create(
        &self,
        name: &str,
        data_type: DataType,
        process_id: Uuid,
        spec: &DatasetSpec,
    ) -> Result<DatasetResponse, Error> {
        match self.get(name, data_type, process_id).await {
            Ok(dataset) => return Ok(dataset),
            Err(Error::DatasetNotFound { .. }) => {}
            Err(other) => return Err(other),
        }

        match self.create(name, data_type, process_id, spec).await {
            Ok(dataset) => Ok(dataset),
            Err(Error::Api {
                status: Some(409), ..
            }) => {
                debug!(name, %data_type, "dataset create conflicted, retrying get");
                match self.get(name, data_type, process_id).await {
                    Ok(dataset) => Ok(dataset),
                    Err(Error::DatasetNotFound { .. }) => Err(Error::RaceLost {
                        kind: "dataset",
                        name: name.into(),
                    }),
                    Err(other) => Err(other),
                }
            }
            Err(other) => Err(other),
        }
    }
}

// ── Part numbers ─────────────────────────────────────────────────────

/// Part-number lookup and creation.
pub struct PartNumbers<'c> {
    api: &'c ApiClient,
}

impl<'c> PartNumbers<'c> {
    pub(crate) fn new(api: &'c ApiClient) -> Self {
        Self { api }
    }

    /// Look up a part number. When the bare string matches several
    /// records, a component id is required to pick one.
    pub async fn get(
        &self,
        part_number: &str,
        component_id: Option<Uuid>,
    ) -> Result<PartNumberResponse, Error> {
        let mut records = self
            .api
            .list_part_numbers(&[("part_number", part_number.to_owned())])
            .await?;

        if records.is_empty() {
            return Err(Error::PartNumberNotFound {
                part_number: part_number.into(),
            });
        }

        if let Some(component_id) = component_id {
            if let Some(pos) = records
                .iter()
                .position(|r| r.component_id == Some(component_id))
            {
                return Ok(records.swap_remove(pos));
            }
        }

        if records.len() > 1 {
            return Err(Error::AmbiguousPartNumber {
                part_number: part_number.into(),
            });
        }
        Ok(records.swap_remove(0))
    }

    pub async fn create(
        &self,
        part_number: &str,
        component_id: Uuid,
        description: Option<&str>,
    ) -> Result<PartNumberResponse, Error> {
        debug!(part_number, %component_id, "creating part number");
        let record = self
            .api
            .create_part_number(&CreatePartNumberRequest {
                part_number: part_number.to_owned(),
                component_id,
                description: description.map(str::to_owned),
            })
            .await?;
        Ok(record)
    }

    /// Same ladder as [`Datasets::get_or_create`].
    pub async fn get_or_create(
        &self,
        part_number: &str,
        component_id: Uuid,
        description: Option<&str>,
    ) -> Result<PartNumberResponse, Error> {
        match self.get(part_number, Some(component_id)).await {
            Ok(record) => return Ok(record),
            Err(Error::PartNumberNotFound { .. }) => {}
            Err(other) => return Err(other),
        }

        match self.create(part_number, component_id, description).await {
            Ok(record) => Ok(record),
            Err(Error::Api {
                status: Some(409), ..
            }) => {
                debug!(part_number, "part number create conflicted, retrying get");
                match self.get(part_number, Some(component_id)).await {
                    Ok(record) => Ok(record),
                    Err(Error::PartNumberNotFound { .. }) => Err(Error::RaceLost {
                        kind: "part number",
                        name: part_number.into(),
                    }),
                    Err(other) => Err(other),
                }
            }
            Err(other) => Err(other),
        }
    }
}
