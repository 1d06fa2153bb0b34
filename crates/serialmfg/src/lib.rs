// serialmfg: High-level async SDK for the Serial manufacturing API.
//
// A test station authenticates with an API key, looks up or creates
// component instances, opens process entries against them, queues typed
// measurement data, and submits. All network traffic goes through the
// raw client in the `serialmfg-api` crate.

pub mod catalog;
pub mod client;
pub mod config;
pub mod entries;
pub mod entry;
pub mod error;
pub mod instances;
pub mod operators;

// ── Primary re-exports ──────────────────────────────────────────────
pub use catalog::{DatasetSpec, Datasets, PartNumbers};
pub use client::SerialClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use entries::{CreateEntryBuilder, ProcessEntries};
pub use entry::{ItemState, ProcessEntry, QueuedItem};
pub use error::{Error, ItemFailure};
pub use instances::{ComponentInstance, ComponentInstances};
pub use operators::{OperatorFilter, Operators};

// Re-export the raw API crate for callers that need the wire layer.
pub use serialmfg_api as api;
pub use serialmfg_api::types::DataType;
