//! Operator lookup.

use serialmfg_api::types::OperatorResponse;

use crate::client::SerialClient;
use crate::error::Error;

/// Filter for [`Operators::get`]. Unset fields are not sent.
#[derive(Debug, Clone, Default)]
pub struct OperatorFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub pin: Option<String>,
}

/// Operator data methods.
pub struct Operators<'c> {
    client: &'c SerialClient,
}

impl<'c> Operators<'c> {
    pub(crate) fn new(client: &'c SerialClient) -> Self {
        Self { client }
    }

    /// Find exactly one operator by name and/or pin.
    pub async fn get(&self, filter: &OperatorFilter) -> Result<OperatorResponse, Error> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(ref first_name) = filter.first_name {
            params.push(("first_name", first_name.clone()));
        }
        if let Some(ref last_name) = filter.last_name {
            params.push(("last_name", last_name.clone()));
        }
        if let Some(ref pin) = filter.pin {
            params.push(("pin", pin.clone()));
        }

        let mut operators = self.client.api().list_operators(&params).await?;
        match operators.len() {
            0 => Err(Error::OperatorNotFound),
            1 => Ok(operators.swap_remove(0)),
            count => Err(Error::AmbiguousOperator { count }),
        }
    }
}
