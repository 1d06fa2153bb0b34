//! Process-entry data submission pipeline.
//!
//! `add_*` calls only enqueue -- no network traffic happens until
//! [`ProcessEntry::submit`], which flushes the five typed queues
//! concurrently, resolving each named dataset once, fanning item writes
//! out through a bounded pool, and aggregating per-item failures.
//!
//! Failed items stay queued (tagged with their cause) so a retried
//! submit re-attempts exactly what is missing; succeeded items leave
//! the queue and are never re-sent.

use std::collections::HashMap;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use serialmfg_api::ApiClient;
use serialmfg_api::client::detect_image;
use serialmfg_api::types::{
    CreateLinkRequest, DataType, EntryData, ProcessEntryPatch, ProcessEntryResponse,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::{self, DatasetSpec, Datasets};
use crate::error::{Error, ItemFailure};

/// Upper bound on in-flight writes per sub-flush. The API treats each
/// attachment as an independent append, so ordering is not preserved.
const MAX_CONCURRENT_WRITES: usize = 8;

// ── Queue state ──────────────────────────────────────────────────────

/// Submission state of a queued data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    /// Queued, not yet attempted by a submit.
    Pending,
    /// Attempted and failed; will be re-attempted by the next submit.
    Failed(String),
}

/// Read-only snapshot of one queued data item, for caller inspection
/// after a partial failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedItem {
    pub data_type: DataType,
    pub dataset_name: String,
    pub state: ItemState,
}

// Internal queue entries, one struct per data kind.

#[derive(Debug, Clone)]
struct TextItem {
    dataset_name: String,
    value: String,
    expected_value: Option<String>,
    state: ItemState,
}

#[derive(Debug, Clone)]
struct NumericalItem {
    dataset_name: String,
    value: f64,
    usl: Option<f64>,
    lsl: Option<f64>,
    unit: Option<String>,
    state: ItemState,
}

#[derive(Debug, Clone)]
struct FileItem {
    dataset_name: String,
    path: PathBuf,
    file_name: Option<String>,
    state: ItemState,
}

#[derive(Debug, Clone)]
struct BooleanItem {
    dataset_name: String,
    value: bool,
    expected_value: bool,
    state: ItemState,
}

#[derive(Debug, Clone)]
struct LinkItem {
    dataset_name: String,
    child_identifier: String,
    break_prior_links: bool,
    state: ItemState,
}

trait Queued {
    fn dataset_name(&self) -> &str;
    fn set_state(&mut self, state: ItemState);
}

macro_rules! impl_queued {
    ($($ty:ty),+) => {$(
        impl Queued for $ty {
            fn dataset_name(&self) -> &str {
                &self.dataset_name
            }
            fn set_state(&mut self, state: ItemState) {
                self.state = state;
            }
        }
    )+};
}

impl_queued!(TextItem, NumericalItem, FileItem, BooleanItem, LinkItem);

// ── Process entry handle ─────────────────────────────────────────────

/// One traversal of a component instance through a process, plus the
/// client-side queues of data waiting to be attached to it.
#[derive(Debug)]
pub struct ProcessEntry {
    api: Arc<ApiClient>,
    /// The entry as last seen from the server.
    pub data: ProcessEntryResponse,
    text_queue: Vec<TextItem>,
    numerical_queue: Vec<NumericalItem>,
    file_queue: Vec<FileItem>,
    boolean_queue: Vec<BooleanItem>,
    link_queue: Vec<LinkItem>,
}

impl ProcessEntry {
    pub(crate) fn new(api: Arc<ApiClient>, data: ProcessEntryResponse) -> Self {
        Self {
            api,
            data,
            text_queue: Vec::new(),
            numerical_queue: Vec::new(),
            file_queue: Vec::new(),
            boolean_queue: Vec::new(),
            link_queue: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.data.id
    }

    pub fn process_id(&self) -> Uuid {
        self.data.process_id
    }

    /// The component instance this entry belongs to.
    pub fn component_instance_id(&self) -> Uuid {
        self.data.unique_identifier_id
    }

    pub fn is_complete(&self) -> bool {
        self.data.is_complete
    }

    // ── Queuing (no network traffic) ─────────────────────────────────

    /// Queue a text value. If `expected_value` is given, matching values
    /// count as a passing result.
    pub fn add_text(
        &mut self,
        dataset_name: impl Into<String>,
        value: impl Into<String>,
        expected_value: Option<String>,
    ) {
        self.text_queue.push(TextItem {
            dataset_name: dataset_name.into(),
            value: value.into(),
            expected_value,
            state: ItemState::Pending,
        });
    }

    /// Queue a numerical value. `usl`/`lsl` override the dataset's spec
    /// limits for this entry; `unit` is used if the dataset gets created.
    pub fn add_number(
        &mut self,
        dataset_name: impl Into<String>,
        value: f64,
        usl: Option<f64>,
        lsl: Option<f64>,
        unit: Option<&str>,
    ) {
        self.numerical_queue.push(NumericalItem {
            dataset_name: dataset_name.into(),
            value,
            usl,
            lsl,
            unit: unit.map(str::to_owned),
            state: ItemState::Pending,
        });
    }

    /// Queue a file upload. `file_name` overrides the name shown in the
    /// UI; it defaults to the path's final component. Files with an
    /// `image/*` MIME type are routed to an IMAGE dataset.
    pub fn add_file(
        &mut self,
        dataset_name: impl Into<String>,
        path: impl Into<PathBuf>,
        file_name: Option<&str>,
    ) {
        self.file_queue.push(FileItem {
            dataset_name: dataset_name.into(),
            path: path.into(),
            file_name: file_name.map(str::to_owned),
            state: ItemState::Pending,
        });
    }

    /// Queue an image upload.
    #[deprecated(note = "use add_file; image MIME types are detected automatically")]
    pub fn add_image(
        &mut self,
        dataset_name: impl Into<String>,
        path: impl Into<PathBuf>,
        file_name: Option<&str>,
    ) {
        self.add_file(dataset_name, path, file_name);
    }

    /// Queue a boolean value checked against `expected_value`.
    pub fn add_boolean(
        &mut self,
        dataset_name: impl Into<String>,
        value: bool,
        expected_value: bool,
    ) {
        self.boolean_queue.push(BooleanItem {
            dataset_name: dataset_name.into(),
            value,
            expected_value,
            state: ItemState::Pending,
        });
    }

    /// Queue a link from this entry's component instance to the child
    /// identified by `child_identifier`. `break_prior_links` marks any
    /// existing links from the parent as broken.
    pub fn add_link(
        &mut self,
        dataset_name: impl Into<String>,
        child_identifier: impl Into<String>,
        break_prior_links: bool,
    ) {
        self.link_queue.push(LinkItem {
            dataset_name: dataset_name.into(),
            child_identifier: child_identifier.into(),
            break_prior_links,
            state: ItemState::Pending,
        });
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Snapshot of every queued item and its state.
    pub fn pending_data(&self) -> Vec<QueuedItem> {
        let snapshot = |data_type: DataType, name: &str, state: &ItemState| QueuedItem {
            data_type,
            dataset_name: name.to_owned(),
            state: state.clone(),
        };
        let mut items = Vec::new();
        items.extend(
            self.text_queue
                .iter()
                .map(|i| snapshot(DataType::Text, &i.dataset_name, &i.state)),
        );
        items.extend(
            self.numerical_queue
                .iter()
                .map(|i| snapshot(DataType::Numerical, &i.dataset_name, &i.state)),
        );
        items.extend(
            self.file_queue
                .iter()
                .map(|i| snapshot(DataType::File, &i.dataset_name, &i.state)),
        );
        items.extend(
            self.boolean_queue
                .iter()
                .map(|i| snapshot(DataType::Boolean, &i.dataset_name, &i.state)),
        );
        items.extend(
            self.link_queue
                .iter()
                .map(|i| snapshot(DataType::Link, &i.dataset_name, &i.state)),
        );
        items
    }

    pub fn has_pending_data(&self) -> bool {
        !(self.text_queue.is_empty()
            && self.numerical_queue.is_empty()
            && self.file_queue.is_empty()
            && self.boolean_queue.is_empty()
            && self.link_queue.is_empty())
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Flush every queued item, then mark the entry complete.
    ///
    /// The five data-kind flushes run concurrently; items within a
    /// flush are independent appends and fan out through a bounded
    /// pool. Every queued item is attempted exactly once per call --
    /// one bad item never aborts its siblings. If any item fails, the
    /// aggregated [`Error::Submission`] is returned, the failed items
    /// stay queued, and the entry is left open.
    ///
    /// On a clean flush the entry is PATCHed with `cycle_time`,
    /// `is_pass`, and `is_complete = true`, and the updated entry is
    /// returned. Submitting an already-complete entry fails with
    /// [`Error::AlreadyCompleted`] before any request.
    pub async fn submit(
        &mut self,
        cycle_time: Option<f64>,
        is_pass: Option<bool>,
    ) -> Result<ProcessEntryResponse, Error> {
        if self.data.is_complete {
            return Err(Error::AlreadyCompleted {
                id: self.data.id.to_string(),
            });
        }

        let failures = self.flush().await;
        if !failures.is_empty() {
            return Err(Error::Submission { failures });
        }

        debug!(entry_id = %self.data.id, "flush clean, completing entry");
        self.data = self
            .api
            .patch_process_entry(
                &self.data.id,
                &ProcessEntryPatch {
                    cycle_time,
                    is_pass,
                    is_complete: true,
                },
            )
            .await?;
        Ok(self.data.clone())
    }

    /// Drain all five queues, attempt every item, and put the failed
    /// ones back tagged with their cause.
    async fn flush(&mut self) -> Vec<ItemFailure> {
        let ctx = FlushContext {
            api: &self.api,
            process_id: self.data.process_id,
            entry_id: self.data.id,
            parent_instance_id: self.data.unique_identifier_id,
        };

        let text = mem::take(&mut self.text_queue);
        let numerical = mem::take(&mut self.numerical_queue);
        let file = mem::take(&mut self.file_queue);
        let boolean = mem::take(&mut self.boolean_queue);
        let link = mem::take(&mut self.link_queue);

        let (text, numerical, file, boolean, link) = tokio::join!(
            flush_text(&ctx, text),
            flush_numerical(&ctx, numerical),
            flush_files(&ctx, file),
            flush_boolean(&ctx, boolean),
            flush_links(&ctx, link),
        );

        let mut failures = Vec::new();
        let (retained, mut f) = text;
        self.text_queue = retained;
        failures.append(&mut f);
        let (retained, mut f) = numerical;
        self.numerical_queue = retained;
        failures.append(&mut f);
        let (retained, mut f) = file;
        self.file_queue = retained;
        failures.append(&mut f);
        let (retained, mut f) = boolean;
        self.boolean_queue = retained;
        failures.append(&mut f);
        let (retained, mut f) = link;
        self.link_queue = retained;
        failures.append(&mut f);
        failures
    }
}

// ── Flush machinery ──────────────────────────────────────────────────

struct FlushContext<'c> {
    api: &'c ApiClient,
    process_id: Uuid,
    entry_id: Uuid,
    parent_instance_id: Uuid,
}

type ResolvedDatasets = HashMap<(String, DataType), Result<Uuid, String>>;

/// Resolve each distinct (name, type) once, concurrently. Resolution
/// failures are recorded per key so every item targeting that dataset
/// fails with the same cause.
async fn resolve_datasets(
    ctx: &FlushContext<'_>,
    wanted: Vec<(String, DataType, DatasetSpec)>,
) -> ResolvedDatasets {
    let datasets = Datasets::new(ctx.api);
    let futs = wanted.into_iter().map(|(name, data_type, spec)| {
        let datasets = &datasets;
        async move {
            let outcome = datasets
                .get_or_create(&name, data_type, ctx.process_id, &spec)
                .await
                .map(|d| d.id)
                .map_err(|e| e.to_string());
            ((name, data_type), outcome)
        }
    });
    futures_util::future::join_all(futs).await.into_iter().collect()
}

/// Split attempted items into retained failures + failure reports.
fn collect_outcomes<T: Queued>(
    data_type: DataType,
    results: Vec<(T, Result<(), String>)>,
) -> (Vec<T>, Vec<ItemFailure>) {
    let mut retained = Vec::new();
    let mut failures = Vec::new();
    for (mut item, outcome) in results {
        if let Err(message) = outcome {
            warn!(
                dataset = item.dataset_name(),
                %data_type,
                error = %message,
                "data item failed"
            );
            failures.push(ItemFailure {
                dataset_name: item.dataset_name().to_owned(),
                data_type,
                message: message.clone(),
            });
            item.set_state(ItemState::Failed(message));
            retained.push(item);
        }
    }
    (retained, failures)
}

/// Distinct dataset keys in queue order; the first item's spec wins for
/// creation.
fn distinct_keys<T: Queued>(
    items: &[T],
    data_type: DataType,
    spec_for: impl Fn(&T) -> DatasetSpec,
) -> Vec<(String, DataType, DatasetSpec)> {
    let mut wanted: Vec<(String, DataType, DatasetSpec)> = Vec::new();
    for item in items {
        if !wanted.iter().any(|(name, _, _)| name == item.dataset_name()) {
            wanted.push((item.dataset_name().to_owned(), data_type, spec_for(item)));
        }
    }
    wanted
}

fn lookup(resolved: &ResolvedDatasets, name: &str, data_type: DataType) -> Result<Uuid, String> {
    match resolved.get(&(name.to_owned(), data_type)) {
        Some(Ok(id)) => Ok(*id),
        Some(Err(message)) => Err(message.clone()),
        None => Err(format!("dataset {name:?} was never resolved")),
    }
}

async fn flush_text(
    ctx: &FlushContext<'_>,
    items: Vec<TextItem>,
) -> (Vec<TextItem>, Vec<ItemFailure>) {
    if items.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let wanted = distinct_keys(&items, DataType::Text, |_| DatasetSpec::default());
    let resolved = resolve_datasets(ctx, wanted).await;

    let results = stream::iter(items.into_iter().map(|item| {
        let resolved = &resolved;
        async move {
            let outcome = match lookup(resolved, &item.dataset_name, DataType::Text) {
                Ok(dataset_id) => {
                    let body = EntryData::Text {
                        dataset_id,
                        value: item.value.clone(),
                        expected_value: item.expected_value.clone(),
                    };
                    ctx.api
                        .put_entry_data(&ctx.entry_id, &body)
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                }
                Err(message) => Err(message),
            };
            (item, outcome)
        }
    }))
    .buffer_unordered(MAX_CONCURRENT_WRITES)
    .collect::<Vec<_>>()
    .await;

    collect_outcomes(DataType::Text, results)
}

async fn flush_numerical(
    ctx: &FlushContext<'_>,
    items: Vec<NumericalItem>,
) -> (Vec<NumericalItem>, Vec<ItemFailure>) {
    if items.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let wanted = distinct_keys(&items, DataType::Numerical, |item| DatasetSpec {
        usl: item.usl,
        lsl: item.lsl,
        unit: item.unit.clone(),
    });
    let resolved = resolve_datasets(ctx, wanted).await;

    let results = stream::iter(items.into_iter().map(|item| {
        let resolved = &resolved;
        async move {
            let outcome = match lookup(resolved, &item.dataset_name, DataType::Numerical) {
                Ok(dataset_id) => {
                    let body = EntryData::Numerical {
                        dataset_id,
                        value: item.value,
                        usl: item.usl,
                        lsl: item.lsl,
                    };
                    ctx.api
                        .put_entry_data(&ctx.entry_id, &body)
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                }
                Err(message) => Err(message),
            };
            (item, outcome)
        }
    }))
    .buffer_unordered(MAX_CONCURRENT_WRITES)
    .collect::<Vec<_>>()
    .await;

    collect_outcomes(DataType::Numerical, results)
}

async fn flush_files(
    ctx: &FlushContext<'_>,
    items: Vec<FileItem>,
) -> (Vec<FileItem>, Vec<ItemFailure>) {
    if items.is_empty() {
        return (Vec::new(), Vec::new());
    }
    // The dataset type depends on the path: image/* extensions go to an
    // IMAGE dataset, everything else to FILE. Detection is path-based,
    // so the keys are known before any upload happens.
    let mut wanted: Vec<(String, DataType, DatasetSpec)> = Vec::new();
    for item in &items {
        let data_type = file_data_type(item);
        if !wanted
            .iter()
            .any(|(name, dt, _)| name == &item.dataset_name && *dt == data_type)
        {
            wanted.push((item.dataset_name.clone(), data_type, DatasetSpec::default()));
        }
    }
    let resolved = resolve_datasets(ctx, wanted).await;

    let results = stream::iter(items.into_iter().map(|item| {
        let resolved = &resolved;
        async move {
            let data_type = file_data_type(&item);
            let outcome = match lookup(resolved, &item.dataset_name, data_type) {
                Ok(dataset_id) => write_file_item(ctx, &item, data_type, dataset_id).await,
                Err(message) => Err(message),
            };
            (item, outcome)
        }
    }))
    .buffer_unordered(MAX_CONCURRENT_WRITES)
    .collect::<Vec<_>>()
    .await;

    // Report image items under their routed type for accurate failures.
    let mut retained = Vec::new();
    let mut failures = Vec::new();
    for (mut item, outcome) in results {
        if let Err(message) = outcome {
            let data_type = file_data_type(&item);
            warn!(
                dataset = %item.dataset_name,
                %data_type,
                error = %message,
                "data item failed"
            );
            failures.push(ItemFailure {
                dataset_name: item.dataset_name.clone(),
                data_type,
                message: message.clone(),
            });
            item.state = ItemState::Failed(message);
            retained.push(item);
        }
    }
    (retained, failures)
}

fn file_data_type(item: &FileItem) -> DataType {
    if detect_image(&item.path) {
        DataType::Image
    } else {
        DataType::File
    }
}

async fn write_file_item(
    ctx: &FlushContext<'_>,
    item: &FileItem,
    data_type: DataType,
    dataset_id: Uuid,
) -> Result<(), String> {
    let file_name = item.file_name.clone().unwrap_or_else(|| {
        item.path
            .file_name()
            .map_or_else(|| item.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    });

    let uploaded = ctx
        .api
        .upload_file(&item.path, &file_name)
        .await
        .map_err(|e| e.to_string())?;

    let body = match data_type {
        DataType::Image => EntryData::Image {
            dataset_id,
            file_id: uploaded.name,
            file_name,
        },
        _ => EntryData::File {
            dataset_id,
            file_id: uploaded.name,
            file_name,
        },
    };
    ctx.api
        .put_entry_data(&ctx.entry_id, &body)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

async fn flush_boolean(
    ctx: &FlushContext<'_>,
    items: Vec<BooleanItem>,
) -> (Vec<BooleanItem>, Vec<ItemFailure>) {
    if items.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let wanted = distinct_keys(&items, DataType::Boolean, |_| DatasetSpec::default());
    let resolved = resolve_datasets(ctx, wanted).await;

    let results = stream::iter(items.into_iter().map(|item| {
        let resolved = &resolved;
        async move {
            let outcome = match lookup(resolved, &item.dataset_name, DataType::Boolean) {
                Ok(dataset_id) => {
                    let body = EntryData::Boolean {
                        dataset_id,
                        value: item.value,
                        expected_value: item.expected_value,
                    };
                    ctx.api
                        .put_entry_data(&ctx.entry_id, &body)
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                }
                Err(message) => Err(message),
            };
            (item, outcome)
        }
    }))
    .buffer_unordered(MAX_CONCURRENT_WRITES)
    .collect::<Vec<_>>()
    .await;

    collect_outcomes(DataType::Boolean, results)
}

async fn flush_links(
    ctx: &FlushContext<'_>,
    items: Vec<LinkItem>,
) -> (Vec<LinkItem>, Vec<ItemFailure>) {
    if items.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let wanted = distinct_keys(&items, DataType::Link, |_| DatasetSpec::default());
    let resolved = resolve_datasets(ctx, wanted).await;

    let results = stream::iter(items.into_iter().map(|item| {
        let resolved = &resolved;
        async move {
            let outcome = match lookup(resolved, &item.dataset_name, DataType::Link) {
                Ok(dataset_id) => write_link_item(ctx, &item, dataset_id).await,
                Err(message) => Err(message),
            };
            (item, outcome)
        }
    }))
    .buffer_unordered(MAX_CONCURRENT_WRITES)
    .collect::<Vec<_>>()
    .await;

    collect_outcomes(DataType::Link, results)
}

async fn write_link_item(
    ctx: &FlushContext<'_>,
    item: &LinkItem,
    dataset_id: Uuid,
) -> Result<(), String> {
    let child = catalog::instance_by_identifier(ctx.api, &item.child_identifier)
        .await
        .map_err(|e| e.to_string())?;

    ctx.api
        .create_link(&CreateLinkRequest {
            parent_component_instance_id: ctx.parent_instance_id,
            child_component_instance_id: child.id,
            dataset_id,
            process_entry_id: ctx.entry_id,
            break_prior_links: item.break_prior_links,
        })
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}
