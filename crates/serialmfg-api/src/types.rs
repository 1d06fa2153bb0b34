//! Wire types for the Serial API.
//!
//! Responses use snake_case field names on the wire, so no serde renaming
//! is needed beyond the `type` keyword. Unmodeled fields are collected in
//! flattened `extra` maps so new server fields never break deserialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ── Data types ───────────────────────────────────────────────────────

/// The type of a dataset and of the values attached to it.
///
/// Dataset identity is (name, type) scoped to a process: the same name
/// under a different type is a distinct dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Text,
    Numerical,
    File,
    Image,
    Boolean,
    Link,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Numerical => "NUMERICAL",
            Self::File => "FILE",
            Self::Image => "IMAGE",
            Self::Boolean => "BOOLEAN",
            Self::Link => "LINK",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Component instances ──────────────────────────────────────────────

/// A physical serialized unit — from `GET /components/instances`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstanceResponse {
    pub id: Uuid,
    /// User-facing serial / lot code.
    pub identifier: String,
    pub component_id: Uuid,
    pub part_number_id: Option<Uuid>,
    /// One of: `PLANNED`, `WIP`, `COMPLETE`, `DEFECTIVE`.
    pub status: Option<String>,
    /// ISO 8601 date-time.
    pub created_at: Option<String>,
    /// ISO 8601 date-time.
    pub last_updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Component type overview — from `GET /components`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body for `PUT /components/instances`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateComponentInstanceRequest {
    pub component_id: Uuid,
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_number_id: Option<Uuid>,
}

// ── Part numbers ─────────────────────────────────────────────────────

/// Part number record — from `GET /part-numbers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartNumberResponse {
    pub id: Uuid,
    pub part_number: String,
    pub component_id: Option<Uuid>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body for `POST /part-numbers`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePartNumberRequest {
    pub part_number: String,
    pub component_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Datasets ─────────────────────────────────────────────────────────

/// A named, typed data slot scoped to a process — from `GET /datasets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub process_id: Option<Uuid>,
    /// Upper specification limit (numerical datasets).
    pub usl: Option<f64>,
    /// Lower specification limit (numerical datasets).
    pub lsl: Option<f64>,
    pub unit: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body for `PUT /datasets`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDatasetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub process_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lsl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

// ── Process entries ──────────────────────────────────────────────────

/// One traversal of a component instance through a process — from
/// `GET /processes/entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntryResponse {
    pub id: Uuid,
    pub process_id: Uuid,
    /// The owning component instance id (the API's wire name).
    pub unique_identifier_id: Uuid,
    pub station_id: Option<String>,
    /// Seconds elapsed since the previous cycle finished.
    pub cycle_time: Option<f64>,
    pub is_pass: Option<bool>,
    #[serde(default)]
    pub is_complete: bool,
    /// ISO 8601 date-time.
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body for `POST /processes/entries`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProcessEntryRequest {
    pub component_instance_id: Uuid,
    pub process_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Body for `PATCH /processes/entries/{id}` — the completion update.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessEntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pass: Option<bool>,
    pub is_complete: bool,
}

/// Body for `PUT /processes/entries/{id}` — one typed data attachment.
///
/// Internally tagged on `type`, matching the wire shape the server
/// expects for each data kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryData {
    Text {
        dataset_id: Uuid,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        expected_value: Option<String>,
    },
    Numerical {
        dataset_id: Uuid,
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        usl: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lsl: Option<f64>,
    },
    File {
        dataset_id: Uuid,
        file_id: String,
        file_name: String,
    },
    Image {
        dataset_id: Uuid,
        file_id: String,
        file_name: String,
    },
    Boolean {
        dataset_id: Uuid,
        value: bool,
        expected_value: bool,
    },
}

impl EntryData {
    /// The dataset this attachment targets.
    pub fn dataset_id(&self) -> Uuid {
        match self {
            Self::Text { dataset_id, .. }
            | Self::Numerical { dataset_id, .. }
            | Self::File { dataset_id, .. }
            | Self::Image { dataset_id, .. }
            | Self::Boolean { dataset_id, .. } => *dataset_id,
        }
    }
}

// ── Component instance links ─────────────────────────────────────────

/// Body for `PUT /components/instances/links`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateLinkRequest {
    pub parent_component_instance_id: Uuid,
    pub child_component_instance_id: Uuid,
    pub dataset_id: Uuid,
    pub process_entry_id: Uuid,
    pub break_prior_links: bool,
}

/// A parent-child edge between two component instances, scoped to a
/// process entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstanceLinkResponse {
    pub id: Uuid,
    pub parent_component_instance_id: Uuid,
    pub child_component_instance_id: Uuid,
    pub dataset_id: Option<Uuid>,
    pub process_entry_id: Option<Uuid>,
    /// ISO 8601 date-time.
    pub created_at: Option<String>,
    /// Set when the link has been broken.
    pub removed_at: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Envelope returned by link creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLinkResponse {
    pub new_link: ComponentInstanceLinkResponse,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── Files ────────────────────────────────────────────────────────────

/// Storage object returned by `POST /files`. The `name` is the file id
/// referenced by file/image data attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub name: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ── Operators ────────────────────────────────────────────────────────

/// Operator record — from `GET /operators`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorResponse {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}
