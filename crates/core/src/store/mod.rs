//! Data-access contract consumed from the managed backend.
//!
//! Both flows talk to durable state only through [`DatasetStore`]. The
//! production implementation lives in `ivd-supabase`; [`memory::InMemoryStore`]
//! backs local runs and tests.

pub mod memory;

use async_trait::async_trait;

use crate::coverage::CoverageAggregate;
use crate::district::District;
use crate::submission::{NewSubmission, StatusChange, Submission};
use crate::types::EntityId;

/// Failures of the data-access contract, one variant per kind of call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Fetching districts, submissions or coverage failed.
    #[error("Failed to load {resource}: {reason}")]
    Load {
        resource: &'static str,
        reason: String,
    },

    /// Writing an image blob failed; nothing was stored.
    #[error("Failed to upload '{path}': {reason}")]
    Upload { path: String, reason: String },

    /// Writing a submission record failed.
    #[error("Failed to insert submission: {reason}")]
    Insert { reason: String },

    /// Changing a submission's review status failed.
    #[error("Failed to update submission {id}: {reason}")]
    Update { id: EntityId, reason: String },

    /// Deleting a blob failed.
    #[error("Failed to remove '{path}': {reason}")]
    Remove { path: String, reason: String },
}

/// Operations the flows need from the backend.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// All districts, ordered by state then district name.
    async fn list_districts(&self) -> Result<Vec<District>, StoreError>;

    /// All submissions with their district embedded, newest first.
    async fn list_submissions(&self) -> Result<Vec<Submission>, StoreError>;

    /// All coverage aggregates with their district embedded, largest first.
    async fn list_coverage(&self) -> Result<Vec<CoverageAggregate>, StoreError>;

    async fn upload_blob(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError>;

    /// Public URL of the blob stored at `path`.
    fn resolve_public_address(&self, path: &str) -> String;

    async fn insert_submission(&self, record: &NewSubmission) -> Result<(), StoreError>;

    async fn update_submission_status(
        &self,
        id: EntityId,
        change: &StatusChange,
    ) -> Result<(), StoreError>;

    async fn remove_blob(&self, path: &str) -> Result<(), StoreError>;
}
