//! Component instance lifecycle: lookup, creation, listing, and direct
//! link creation.

use std::sync::Arc;

use serialmfg_api::ApiClient;
use serialmfg_api::types::{
    ComponentInstanceResponse, CreateComponentInstanceRequest, CreateLinkRequest, DataType,
    NewLinkResponse,
};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::{self, Datasets, PartNumbers};
use crate::client::SerialClient;
use crate::entry::ProcessEntry;
use crate::error::Error;

/// A component instance fetched from the server, bound to the client
/// that fetched it.
#[derive(Debug)]
pub struct ComponentInstance {
    api: Arc<ApiClient>,
    /// The instance as last seen from the server.
    pub data: ComponentInstanceResponse,
}

impl ComponentInstance {
    pub(crate) fn new(api: Arc<ApiClient>, data: ComponentInstanceResponse) -> Self {
        Self { api, data }
    }

    pub fn id(&self) -> Uuid {
        self.data.id
    }

    /// The user-facing serial / lot code.
    pub fn identifier(&self) -> &str {
        &self.data.identifier
    }

    /// Create a link from this instance to a child, scoped to `entry`,
    /// immediately (not queued).
    ///
    /// The link dataset must already exist for the entry's process --
    /// unlike the entry-level queue, this does not create it lazily.
    pub async fn add_link(
        &self,
        link_name: &str,
        child_identifier: &str,
        break_prior_links: bool,
        entry: &ProcessEntry,
    ) -> Result<NewLinkResponse, Error> {
        debug!(link_name, child_identifier, "adding link");

        let child = catalog::instance_by_identifier(&self.api, child_identifier).await?;
        let dataset = Datasets::new(&self.api)
            .get(link_name, DataType::Link, entry.process_id())
            .await?;

        let link = self
            .api
            .create_link(&CreateLinkRequest {
                parent_component_instance_id: self.data.id,
                child_component_instance_id: child.id,
                dataset_id: dataset.id,
                process_entry_id: entry.id(),
                break_prior_links,
            })
            .await?;
        Ok(link)
    }
}

/// Component instance data methods.
pub struct ComponentInstances<'c> {
    client: &'c SerialClient,
}

impl<'c> ComponentInstances<'c> {
    pub(crate) fn new(client: &'c SerialClient) -> Self {
        Self { client }
    }

    /// Exact-match lookup by user-facing identifier. Zero matches is
    /// [`Error::ComponentInstanceNotFound`]; duplicates are surfaced as
    /// [`Error::AmbiguousIdentifier`].
    pub async fn get(&self, identifier: &str) -> Result<ComponentInstance, Error> {
        let data = catalog::instance_by_identifier(self.client.api(), identifier).await?;
        Ok(ComponentInstance::new(self.client.api_arc(), data))
    }

    /// Lookup by remote id.
    pub async fn get_by_id(&self, id: Uuid) -> Result<ComponentInstance, Error> {
        let mut instances = self
            .client
            .api()
            .list_component_instances(&[("id", id.to_string())])
            .await?;
        if instances.is_empty() {
            return Err(Error::ComponentInstanceNotFound {
                identifier: id.to_string(),
            });
        }
        Ok(ComponentInstance::new(
            self.client.api_arc(),
            instances.swap_remove(0),
        ))
    }

    /// Create an instance of the component named `component_name`.
    ///
    /// The component name is resolved to a component id first; a part
    /// number, if given, is looked up or created under that component.
    /// An identifier conflict bubbles up from the server as
    /// `Error::Api { status: 409, .. }`.
    pub async fn create(
        &self,
        identifier: &str,
        component_name: &str,
        part_number: Option<&str>,
    ) -> Result<ComponentInstance, Error> {
        debug!(identifier, component_name, "creating component instance");

        let component = catalog::component_by_name(self.client.api(), component_name).await?;

        let part_number_id = match part_number {
            Some(part_number) => Some(
                PartNumbers::new(self.client.api())
                    .get_or_create(part_number, component.id, None)
                    .await?
                    .id,
            ),
            None => None,
        };

        let data = self
            .client
            .api()
            .create_component_instance(&CreateComponentInstanceRequest {
                component_id: component.id,
                identifier: identifier.to_owned(),
                part_number_id,
            })
            .await?;
        Ok(ComponentInstance::new(self.client.api_arc(), data))
    }

    /// List instances matching caller-supplied query params (thin
    /// pass-through).
    pub async fn list(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<ComponentInstance>, Error> {
        let instances = self.client.api().list_component_instances(params).await?;
        Ok(instances
            .into_iter()
            .map(|data| ComponentInstance::new(self.client.api_arc(), data))
            .collect())
    }
}
