//! Submission review console for administrators.
//!
//! Holds the last loaded submissions and coverage rows, derives the
//! filtered view from an immutable [`FilterCriteria`], and records
//! approve/reject decisions on pending submissions.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use ivd_core::coverage::{progress_percent, CoverageAggregate};
use ivd_core::review::{distinct_states, FilterCriteria, SubmissionTally};
use ivd_core::store::{DatasetStore, StoreError};
use ivd_core::submission::{ReviewDecision, StatusChange, Submission, SubmissionStatus};
use ivd_core::types::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Submission {0} not found")]
    NotFound(EntityId),

    #[error("Submission {id} was already {}", status.as_str())]
    NotPending {
        id: EntityId,
        status: SubmissionStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A coverage aggregate with its quota progress worked out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageRow {
    #[serde(flatten)]
    pub aggregate: CoverageAggregate,
    pub progress_percent: f64,
    pub progress_label: String,
}

impl From<&CoverageAggregate> for CoverageRow {
    fn from(aggregate: &CoverageAggregate) -> Self {
        Self {
            aggregate: aggregate.clone(),
            progress_percent: progress_percent(aggregate.approved_count),
            progress_label: aggregate.progress_label(),
        }
    }
}

pub struct ReviewConsole {
    store: Arc<dyn DatasetStore>,
    reviewer: String,
    submissions: Vec<Submission>,
    coverage: Vec<CoverageAggregate>,
    criteria: FilterCriteria,
}

impl ReviewConsole {
    /// A console with nothing loaded yet; decisions are recorded as
    /// `reviewer`.
    pub fn new(store: Arc<dyn DatasetStore>, reviewer: impl Into<String>) -> Self {
        Self {
            store,
            reviewer: reviewer.into(),
            submissions: Vec::new(),
            coverage: Vec::new(),
            criteria: FilterCriteria::default(),
        }
    }

    /// Create and load.
    pub async fn open(store: Arc<dyn DatasetStore>, reviewer: impl Into<String>) -> Self {
        let mut console = Self::new(store, reviewer);
        console.reload().await;
        console
    }

    pub fn reviewer(&self) -> &str {
        &self.reviewer
    }

    /// Fetch submissions and coverage again. Either load failing leaves
    /// that list empty.
    pub async fn reload(&mut self) {
        let (submissions, coverage) =
            tokio::join!(self.store.list_submissions(), self.store.list_coverage());

        self.submissions = submissions.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Submissions unavailable");
            Vec::new()
        });
        self.coverage = coverage.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Coverage unavailable");
            Vec::new()
        });

        tracing::debug!(
            submissions = self.submissions.len(),
            coverage_rows = self.coverage.len(),
            "Review console loaded"
        );
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn coverage(&self) -> &[CoverageAggregate] {
        &self.coverage
    }

    pub fn coverage_rows(&self) -> Vec<CoverageRow> {
        self.coverage.iter().map(CoverageRow::from).collect()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    /// Submissions passing the current criteria, newest first.
    pub fn visible(&self) -> Vec<&Submission> {
        self.criteria.apply(&self.submissions)
    }

    pub fn tally(&self) -> SubmissionTally {
        SubmissionTally::of(&self.submissions)
    }

    /// States offered in the state filter.
    pub fn states(&self) -> Vec<String> {
        distinct_states(&self.submissions)
    }

    pub fn select(&self, id: EntityId) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.id == id)
    }

    /// Approve or reject a pending submission, then reload everything.
    ///
    /// Blank notes are stored as null. A failed write is returned to the
    /// caller and nothing is reloaded.
    pub async fn review(
        &mut self,
        id: EntityId,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<(), ReviewError> {
        let submission = self.select(id).ok_or(ReviewError::NotFound(id))?;
        if !submission.is_pending() {
            return Err(ReviewError::NotPending {
                id,
                status: submission.status,
            });
        }

        let change = StatusChange::new(decision, Utc::now(), self.reviewer.as_str(), notes);
        if let Err(e) = self.store.update_submission_status(id, &change).await {
            tracing::error!(submission_id = %id, error = %e, "Review decision not recorded");
            return Err(e.into());
        }

        tracing::info!(
            submission_id = %id,
            status = change.status.as_str(),
            reviewer = %self.reviewer,
            "Submission reviewed"
        );

        self.reload().await;
        Ok(())
    }
}
