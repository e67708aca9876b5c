//! Ledger of uploaded blobs that never got a submission record.
//!
//! A blob becomes orphaned when its upload succeeded but the following
//! insert failed. Entries stay here until [`OrphanLedger::reconcile`] is
//! triggered by hand; nothing sweeps them automatically.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;

use ivd_core::store::{DatasetStore, StoreError};
use ivd_core::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedBlob {
    pub path: String,
    /// Why the insert failed.
    pub reason: String,
    pub recorded_at: Timestamp,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub removed: Vec<String>,
    /// Paths whose removal failed; they remain in the ledger.
    pub failed: Vec<String>,
}

#[derive(Debug, Default)]
pub struct OrphanLedger {
    entries: Mutex<Vec<OrphanedBlob>>,
}

impl OrphanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: &str, cause: &StoreError) {
        tracing::warn!(path, error = %cause, "Uploaded image left without a submission");
        self.lock().push(OrphanedBlob {
            path: path.to_string(),
            reason: cause.to_string(),
            recorded_at: Utc::now(),
        });
    }

    pub fn entries(&self) -> Vec<OrphanedBlob> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every recorded blob from the store. Entries whose removal
    /// fails are kept for the next pass.
    pub async fn reconcile(&self, store: &dyn DatasetStore) -> ReconcileReport {
        let pending: Vec<String> = self.lock().iter().map(|o| o.path.clone()).collect();
        let mut report = ReconcileReport::default();

        for path in pending {
            match store.remove_blob(&path).await {
                Ok(()) => report.removed.push(path),
                Err(e) => {
                    tracing::error!(path, error = %e, "Failed to remove orphaned image");
                    report.failed.push(path);
                }
            }
        }

        self.lock().retain(|o| !report.removed.contains(&o.path));
        tracing::info!(
            removed = report.removed.len(),
            remaining = report.failed.len(),
            "Orphan reconciliation finished"
        );
        report
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OrphanedBlob>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
