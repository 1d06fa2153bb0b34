// Hand-crafted async HTTP client for the Serial API.
//
// Auth: `Authorization: Bearer <api key>` default header.
// All endpoints speak JSON except `POST /files`, which is multipart.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types::{
    ComponentInstanceResponse, ComponentResponse, CreateComponentInstanceRequest,
    CreateDatasetRequest, CreateLinkRequest, CreatePartNumberRequest, CreateProcessEntryRequest,
    DatasetResponse, EntryData, FileUploadResponse, NewLinkResponse, OperatorResponse,
    PartNumberResponse, ProcessEntryPatch, ProcessEntryResponse,
};

// ── Error response shape from the Serial API ─────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── MIME helpers ─────────────────────────────────────────────────────

/// Whether the path's extension maps to an `image/*` MIME type.
///
/// Used to route file uploads to IMAGE-typed datasets. Extension-based
/// only -- the file contents are never sniffed.
pub fn detect_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE)
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Serial API.
///
/// One typed method per endpoint; list endpoints return plain arrays
/// (the Serial API has no pagination envelope). Not retried internally --
/// callers decide retry and aggregation policy.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects the bearer token as a sensitive default header on every
    /// request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_authenticated_client(api_key)?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
        })
    }

    /// Parse the base URL and guarantee a trailing slash so relative
    /// joins behave.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// Join a relative path (e.g. `"processes/entries"`) onto the base URL.
    fn url(&self, path: &str) -> Url {
        // base_url always ends with `/`, so joining relative paths works.
        self.base_url
            .join(path)
            .expect("path should be valid relative URL")
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("PATCH {url}");

        let resp = self.http.patch(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::InvalidApiKey;
        }

        let raw = resp.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Component instances ──────────────────────────────────────────

    pub async fn list_component_instances(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<ComponentInstanceResponse>, Error> {
        self.get_with_params("components/instances", params).await
    }

    pub async fn create_component_instance(
        &self,
        body: &CreateComponentInstanceRequest,
    ) -> Result<ComponentInstanceResponse, Error> {
        self.put("components/instances", body).await
    }

    // ── Component types ──────────────────────────────────────────────

    pub async fn list_components(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<ComponentResponse>, Error> {
        self.get_with_params("components", params).await
    }

    // ── Part numbers ─────────────────────────────────────────────────

    pub async fn list_part_numbers(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<PartNumberResponse>, Error> {
        self.get_with_params("part-numbers", params).await
    }

    pub async fn create_part_number(
        &self,
        body: &CreatePartNumberRequest,
    ) -> Result<PartNumberResponse, Error> {
        self.post("part-numbers", body).await
    }

    // ── Datasets ─────────────────────────────────────────────────────

    pub async fn list_datasets(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<DatasetResponse>, Error> {
        self.get_with_params("datasets", params).await
    }

    pub async fn create_dataset(
        &self,
        body: &CreateDatasetRequest,
    ) -> Result<DatasetResponse, Error> {
        self.put("datasets", body).await
    }

    // ── Process entries ──────────────────────────────────────────────

    pub async fn list_process_entries(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<ProcessEntryResponse>, Error> {
        self.get_with_params("processes/entries", params).await
    }

    pub async fn create_process_entry(
        &self,
        body: &CreateProcessEntryRequest,
    ) -> Result<ProcessEntryResponse, Error> {
        self.post("processes/entries", body).await
    }

    /// Attach one typed data value to an entry. The response shape varies
    /// by data kind, so it is returned as opaque JSON.
    pub async fn put_entry_data(
        &self,
        entry_id: &Uuid,
        body: &EntryData,
    ) -> Result<serde_json::Value, Error> {
        self.put(&format!("processes/entries/{entry_id}"), body)
            .await
    }

    /// Update entry status fields; this is the completion call.
    pub async fn patch_process_entry(
        &self,
        entry_id: &Uuid,
        body: &ProcessEntryPatch,
    ) -> Result<ProcessEntryResponse, Error> {
        self.patch(&format!("processes/entries/{entry_id}"), body)
            .await
    }

    // ── Component instance links ─────────────────────────────────────

    pub async fn create_link(&self, body: &CreateLinkRequest) -> Result<NewLinkResponse, Error> {
        self.put("components/instances/links", body).await
    }

    // ── Files ────────────────────────────────────────────────────────

    /// Upload a local file as multipart form data, returning the storage
    /// object whose `name` is the file id. Unreadable paths surface the
    /// underlying io error.
    pub async fn upload_file(
        &self,
        path: &Path,
        file_name: &str,
    ) -> Result<FileUploadResponse, Error> {
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str(mime.essence_str())
            .map_err(Error::Transport)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.url("files");
        debug!("POST {url} (multipart, file_name={file_name})");

        let resp = self.http.post(url).multipart(form).send().await?;
        self.handle_response(resp).await
    }

    // ── Operators ────────────────────────────────────────────────────

    pub async fn list_operators(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<OperatorResponse>, Error> {
        self.get_with_params("operators", params).await
    }
}
