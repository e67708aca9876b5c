//! REST client for the Supabase project behind the dataset.
//!
//! Every request carries the anon key twice, as `apikey` and as a bearer
//! token. Table reads embed the district via PostgREST resource embedding
//! (`districts(*)`) and ask the server for the documented order.

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use ivd_core::coverage::CoverageAggregate;
use ivd_core::district::District;
use ivd_core::store::{DatasetStore, StoreError};
use ivd_core::submission::{NewSubmission, StatusChange, Submission};
use ivd_core::types::EntityId;

use crate::config::SupabaseConfig;

/// Cache lifetime sent with uploaded objects, in seconds.
const UPLOAD_CACHE_SECONDS: u32 = 3600;

/// Errors from the Supabase REST layer.
#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Supabase returned a non-2xx status code.
    #[error("Supabase API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Settings are missing or unusable.
    #[error("Supabase configuration error: {0}")]
    Config(String),
}

/// [`DatasetStore`] backed by a Supabase project.
pub struct SupabaseStore {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, config: SupabaseConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// `GET /rest/v1/districts`, ordered by state then district name.
    pub async fn fetch_districts(&self) -> Result<Vec<District>, SupabaseError> {
        let url = self.table_url(
            "districts",
            &[("select", "*"), ("order", "state.asc,district_name.asc")],
        )?;
        let response = self.request(Method::GET, url).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /rest/v1/submissions` with the district embedded, newest first.
    pub async fn fetch_submissions(&self) -> Result<Vec<Submission>, SupabaseError> {
        let url = self.table_url(
            "submissions",
            &[("select", "*,districts(*)"), ("order", "submitted_at.desc")],
        )?;
        let response = self.request(Method::GET, url).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /rest/v1/coverage_stats` with the district embedded, largest
    /// total first.
    pub async fn fetch_coverage(&self) -> Result<Vec<CoverageAggregate>, SupabaseError> {
        let url = self.table_url(
            "coverage_stats",
            &[("select", "*,districts(*)"), ("order", "total_submissions.desc")],
        )?;
        let response = self.request(Method::GET, url).send().await?;
        Self::parse_response(response).await
    }

    /// `POST /rest/v1/submissions`.
    pub async fn insert_row(&self, record: &NewSubmission) -> Result<(), SupabaseError> {
        let url = self.table_url("submissions", &[])?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `PATCH /rest/v1/submissions?id=eq.{id}&status=eq.pending`.
    ///
    /// Returns the rows that were changed; empty when the submission does
    /// not exist or was already reviewed.
    pub async fn patch_pending_status(
        &self,
        id: EntityId,
        change: &StatusChange,
    ) -> Result<Vec<Submission>, SupabaseError> {
        let id_filter = format!("eq.{id}");
        let url = self.table_url(
            "submissions",
            &[("id", id_filter.as_str()), ("status", "eq.pending")],
        )?;
        let response = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(change)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /storage/v1/object/{bucket}/{path}`. Existing objects are never
    /// overwritten.
    pub async fn upload_object(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), SupabaseError> {
        let url = self.object_url(&["object"], path)?;
        let response = self
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(
                reqwest::header::CACHE_CONTROL,
                format!("max-age={UPLOAD_CACHE_SECONDS}"),
            )
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `DELETE /storage/v1/object/{bucket}/{path}`.
    pub async fn delete_object(&self, path: &str) -> Result<(), SupabaseError> {
        let url = self.object_url(&["object"], path)?;
        let response = self.request(Method::DELETE, url).send().await?;
        Self::check_status(response).await
    }

    /// `{base}/storage/v1/object/public/{bucket}/{path}`, percent-encoded.
    pub fn public_url(&self, path: &str) -> Result<Url, SupabaseError> {
        self.object_url(&["object", "public"], path)
    }

    // ---- private helpers ----

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, SupabaseError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                SupabaseError::Config(format!(
                    "'{}' cannot be used as a base URL",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn table_url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url, SupabaseError> {
        let mut url = self.endpoint(["rest", "v1", table])?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn object_url(&self, kind: &[&str], path: &str) -> Result<Url, SupabaseError> {
        let segments = ["storage", "v1"]
            .into_iter()
            .chain(kind.iter().copied())
            .chain(std::iter::once(self.config.bucket.as_str()))
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`SupabaseError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SupabaseError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SupabaseError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SupabaseError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), SupabaseError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DatasetStore for SupabaseStore {
    async fn list_districts(&self) -> Result<Vec<District>, StoreError> {
        self.fetch_districts().await.map_err(|e| StoreError::Load {
            resource: "districts",
            reason: e.to_string(),
        })
    }

    async fn list_submissions(&self) -> Result<Vec<Submission>, StoreError> {
        self.fetch_submissions().await.map_err(|e| StoreError::Load {
            resource: "submissions",
            reason: e.to_string(),
        })
    }

    async fn list_coverage(&self) -> Result<Vec<CoverageAggregate>, StoreError> {
        self.fetch_coverage().await.map_err(|e| StoreError::Load {
            resource: "coverage",
            reason: e.to_string(),
        })
    }

    async fn upload_blob(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        tracing::debug!(path, content_type, size = bytes.len(), "Uploading image");
        self.upload_object(path, content_type, bytes)
            .await
            .map_err(|e| StoreError::Upload {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    fn resolve_public_address(&self, path: &str) -> String {
        match self.public_url(path) {
            Ok(url) => url.into(),
            Err(e) => {
                tracing::warn!(path, error = %e, "Falling back to unencoded public URL");
                format!(
                    "{}/storage/v1/object/public/{}/{path}",
                    self.config.base_url.as_str().trim_end_matches('/'),
                    self.config.bucket
                )
            }
        }
    }

    async fn insert_submission(&self, record: &NewSubmission) -> Result<(), StoreError> {
        self.insert_row(record)
            .await
            .map_err(|e| StoreError::Insert {
                reason: e.to_string(),
            })
    }

    async fn update_submission_status(
        &self,
        id: EntityId,
        change: &StatusChange,
    ) -> Result<(), StoreError> {
        let updated = self
            .patch_pending_status(id, change)
            .await
            .map_err(|e| StoreError::Update {
                id,
                reason: e.to_string(),
            })?;
        if updated.is_empty() {
            return Err(StoreError::Update {
                id,
                reason: "no pending submission matched".to_string(),
            });
        }
        Ok(())
    }

    async fn remove_blob(&self, path: &str) -> Result<(), StoreError> {
        self.delete_object(path)
            .await
            .map_err(|e| StoreError::Remove {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}
