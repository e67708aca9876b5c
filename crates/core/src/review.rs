//! Review-console filtering over loaded submissions.
//!
//! [`FilterCriteria`] is an immutable value: every change produces a new
//! criteria and the visible list is recomputed from scratch with
//! [`FilterCriteria::apply`]. The status, state and search predicates are
//! intersected.

use serde::{Deserialize, Serialize};

use crate::submission::{Submission, SubmissionStatus};

/* --------------------------------------------------------------------------
Criteria
-------------------------------------------------------------------------- */

/// Status dropdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(SubmissionStatus),
}

impl StatusFilter {
    /// Parse the dropdown value; `"all"` and empty mean no restriction.
    pub fn parse(value: &str) -> Result<Self, crate::error::CoreError> {
        match value.trim() {
            "" | "all" => Ok(Self::All),
            other => SubmissionStatus::from_str_db(other).map(Self::Only),
        }
    }

    pub fn matches(self, status: SubmissionStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

/// State dropdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StateFilter {
    #[default]
    All,
    Only(String),
}

impl StateFilter {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "all" => Self::All,
            other => Self::Only(other.to_string()),
        }
    }

    pub fn matches(&self, state: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => state == Some(wanted.as_str()),
        }
    }
}

/// The console's current filter selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    status: StatusFilter,
    state: StateFilter,
    search: String,
}

impl FilterCriteria {
    pub fn new(status: StatusFilter, state: StateFilter, search: impl Into<String>) -> Self {
        Self {
            status,
            state,
            search: search.into(),
        }
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn state(&self) -> &StateFilter {
        &self.state
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn with_status(&self, status: StatusFilter) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn with_state(&self, state: StateFilter) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn with_search(&self, search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..self.clone()
        }
    }

    /// Case-insensitive substring match over description, contributor name
    /// or district name. An empty search matches everything.
    pub fn matches_search(&self, submission: &Submission) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let hit = |text: &str| text.to_lowercase().contains(&needle);
        hit(&submission.description)
            || hit(&submission.contributor_name)
            || submission.district_name().is_some_and(hit)
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        self.status.matches(submission.status)
            && self.state.matches(submission.state_name())
            && self.matches_search(submission)
    }

    /// The visible subset, keeping the input order.
    pub fn apply<'a>(&self, submissions: &'a [Submission]) -> Vec<&'a Submission> {
        submissions.iter().filter(|s| self.matches(s)).collect()
    }
}

/* --------------------------------------------------------------------------
Derived views
-------------------------------------------------------------------------- */

/// Header counts over every loaded submission, independent of filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionTally {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl SubmissionTally {
    pub fn of(submissions: &[Submission]) -> Self {
        submissions
            .iter()
            .fold(Self::default(), |mut tally, submission| {
                tally.total += 1;
                match submission.status {
                    SubmissionStatus::Pending => tally.pending += 1,
                    SubmissionStatus::Approved => tally.approved += 1,
                    SubmissionStatus::Rejected => tally.rejected += 1,
                }
                tally
            })
    }
}

/// Distinct states among the submissions, in order of first appearance.
pub fn distinct_states(submissions: &[Submission]) -> Vec<String> {
    let mut states: Vec<String> = Vec::new();
    for state in submissions.iter().filter_map(Submission::state_name) {
        if !states.iter().any(|s| s == state) {
            states.push(state.to_string());
        }
    }
    states
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
