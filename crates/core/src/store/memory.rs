//! In-process [`DatasetStore`] used for local runs and tests.
//!
//! Mirrors the backend's observable behaviour: districts are reference data,
//! inserts are validated and stamped, status updates only succeed on pending
//! rows, and coverage aggregates are recomputed from the submissions on every
//! read. Individual call kinds can be made to fail through [`Faults`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::{DatasetStore, StoreError};
use crate::coverage::CoverageAggregate;
use crate::district::District;
use crate::submission::{NewSubmission, StatusChange, Submission, SubmissionStatus};
use crate::types::EntityId;

/// Bucket name used in the addresses this store hands out.
pub const DEFAULT_BUCKET: &str = "submission-images";

/// Switches that make the matching store calls fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    pub loads: bool,
    pub uploads: bool,
    pub inserts: bool,
    pub updates: bool,
    pub removals: bool,
}

/// A blob held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    districts: Vec<District>,
    submissions: Vec<Submission>,
    blobs: BTreeMap<String, StoredBlob>,
    faults: Faults,
}

#[derive(Debug)]
pub struct InMemoryStore {
    bucket: String,
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryStore {
    pub fn new(districts: Vec<District>) -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            inner: Mutex::new(Inner {
                districts,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    /// Add a row directly, bypassing insert validation.
    pub fn seed_submission(&self, submission: Submission) {
        self.lock().submissions.push(submission);
    }

    pub fn submission_count(&self) -> usize {
        self.lock().submissions.len()
    }

    pub fn submission(&self, id: EntityId) -> Option<Submission> {
        self.lock().submissions.iter().find(|s| s.id == id).cloned()
    }

    pub fn blob_paths(&self) -> Vec<String> {
        self.lock().blobs.keys().cloned().collect()
    }

    pub fn blob(&self, path: &str) -> Option<StoredBlob> {
        self.lock().blobs.get(path).cloned()
    }

    /// Blobs no submission points at.
    pub fn orphaned_blob_paths(&self) -> Vec<String> {
        let inner = self.lock();
        inner
            .blobs
            .keys()
            .filter(|path| {
                let url = self.address(path);
                !inner.submissions.iter().any(|s| s.image_url == url)
            })
            .cloned()
            .collect()
    }

    fn address(&self, path: &str) -> String {
        format!("memory://{}/{path}", self.bucket)
    }
}

impl Inner {
    fn district(&self, id: EntityId) -> Option<&District> {
        self.districts.iter().find(|d| d.id == id)
    }

    fn with_district(&self, submission: &Submission) -> Submission {
        let mut joined = submission.clone();
        joined.district = self.district(submission.district_id).cloned();
        joined
    }
}

#[async_trait]
impl DatasetStore for InMemoryStore {
    async fn list_districts(&self) -> Result<Vec<District>, StoreError> {
        let inner = self.lock();
        if inner.faults.loads {
            return Err(StoreError::Load {
                resource: "districts",
                reason: "injected fault".to_string(),
            });
        }
        let mut districts = inner.districts.clone();
        districts.sort_by(|a, b| {
            a.state
                .cmp(&b.state)
                .then_with(|| a.district_name.cmp(&b.district_name))
        });
        Ok(districts)
    }

    async fn list_submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let inner = self.lock();
        if inner.faults.loads {
            return Err(StoreError::Load {
                resource: "submissions",
                reason: "injected fault".to_string(),
            });
        }
        let mut submissions: Vec<Submission> = inner
            .submissions
            .iter()
            .map(|s| inner.with_district(s))
            .collect();
        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(submissions)
    }

    async fn list_coverage(&self) -> Result<Vec<CoverageAggregate>, StoreError> {
        let inner = self.lock();
        if inner.faults.loads {
            return Err(StoreError::Load {
                resource: "coverage",
                reason: "injected fault".to_string(),
            });
        }

        let mut by_district: BTreeMap<EntityId, CoverageAggregate> = BTreeMap::new();
        for submission in &inner.submissions {
            let entry = by_district
                .entry(submission.district_id)
                .or_insert_with(|| CoverageAggregate {
                    id: submission.district_id,
                    district_id: submission.district_id,
                    total_submissions: 0,
                    pending_count: 0,
                    approved_count: 0,
                    rejected_count: 0,
                    district: inner.district(submission.district_id).cloned(),
                });
            entry.total_submissions += 1;
            match submission.status {
                SubmissionStatus::Pending => entry.pending_count += 1,
                SubmissionStatus::Approved => entry.approved_count += 1,
                SubmissionStatus::Rejected => entry.rejected_count += 1,
            }
        }

        let mut coverage: Vec<CoverageAggregate> = by_district.into_values().collect();
        coverage.sort_by(|a, b| b.total_submissions.cmp(&a.total_submissions));
        Ok(coverage)
    }

    async fn upload_blob(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.faults.uploads {
            return Err(StoreError::Upload {
                path: path.to_string(),
                reason: "injected fault".to_string(),
            });
        }
        if inner.blobs.contains_key(path) {
            return Err(StoreError::Upload {
                path: path.to_string(),
                reason: "The resource already exists".to_string(),
            });
        }
        inner.blobs.insert(
            path.to_string(),
            StoredBlob {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(())
    }

    fn resolve_public_address(&self, path: &str) -> String {
        self.address(path)
    }

    async fn insert_submission(&self, record: &NewSubmission) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.faults.inserts {
            return Err(StoreError::Insert {
                reason: "injected fault".to_string(),
            });
        }
        record.check().map_err(|e| StoreError::Insert {
            reason: e.to_string(),
        })?;
        if inner.district(record.district_id).is_none() {
            return Err(StoreError::Insert {
                reason: format!("district {} does not exist", record.district_id),
            });
        }

        inner.submissions.push(Submission {
            id: Uuid::new_v4(),
            district_id: record.district_id,
            image_url: record.image_url.clone(),
            description: record.description.clone(),
            contributor_name: record.contributor_name.clone(),
            contributor_contact: record.contributor_contact.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            status: record.status,
            submitted_at: chrono::Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            admin_notes: None,
            district: None,
        });
        Ok(())
    }

    async fn update_submission_status(
        &self,
        id: EntityId,
        change: &StatusChange,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.faults.updates {
            return Err(StoreError::Update {
                id,
                reason: "injected fault".to_string(),
            });
        }
        let submission = inner
            .submissions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::Update {
                id,
                reason: "no such submission".to_string(),
            })?;
        submission
            .status
            .validate_transition(change.status)
            .map_err(|e| StoreError::Update {
                id,
                reason: e.to_string(),
            })?;

        submission.status = change.status;
        submission.reviewed_at = Some(change.reviewed_at);
        submission.reviewed_by = Some(change.reviewed_by.clone());
        submission.admin_notes = change.admin_notes.clone();
        Ok(())
    }

    async fn remove_blob(&self, path: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.faults.removals {
            return Err(StoreError::Remove {
                path: path.to_string(),
                reason: "injected fault".to_string(),
            });
        }
        inner.blobs.remove(path).map(|_| ()).ok_or_else(|| StoreError::Remove {
            path: path.to_string(),
            reason: "Object not found".to_string(),
        })
    }
}
