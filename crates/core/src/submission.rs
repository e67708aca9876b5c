//! Submission records, their review lifecycle, and the insert/update DTOs.
//!
//! A submission is created once by the contribution flow (always `pending`)
//! and changed at most once by the review console (`pending` to `approved`
//! or `rejected`). Neither flow deletes submissions.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::district::District;
use crate::error::CoreError;
use crate::geo::Coordinates;
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Shortest accepted description, in characters.
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Longest accepted description, in characters. Input beyond this is cut off.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Reviewer identity written when none is configured.
pub const DEFAULT_REVIEWER: &str = "admin";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Review lifecycle of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    /// Parse a status string as stored by the backend.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Invalid submission status '{s}'. Must be one of: pending, approved, rejected"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// Approved and rejected submissions never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }

    pub fn validate_transition(&self, next: SubmissionStatus) -> Result<(), CoreError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Cannot move a submission from '{}' to '{}'",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

/// The two actions an administrator can take on a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn target_status(self) -> SubmissionStatus {
        match self {
            Self::Approve => SubmissionStatus::Approved,
            Self::Reject => SubmissionStatus::Rejected,
        }
    }
}

// ---------------------------------------------------------------------------
// Rows and DTOs
// ---------------------------------------------------------------------------

/// A row from the `submissions` table with its district embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: EntityId,
    pub district_id: EntityId,
    pub image_url: String,
    pub description: String,
    pub contributor_name: String,
    pub contributor_contact: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: SubmissionStatus,
    pub submitted_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<String>,
    pub admin_notes: Option<String>,
    #[serde(rename = "districts", default)]
    pub district: Option<District>,
}

impl Submission {
    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    pub fn state_name(&self) -> Option<&str> {
        self.district.as_ref().map(|d| d.state.as_str())
    }

    pub fn district_name(&self) -> Option<&str> {
        self.district.as_ref().map(|d| d.district_name.as_str())
    }
}

/// DTO for inserting a new submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewSubmission {
    pub district_id: EntityId,
    #[validate(length(min = 1))]
    pub image_url: String,
    #[validate(length(min = 10, max = 500))]
    pub description: String,
    #[validate(length(min = 1))]
    pub contributor_name: String,
    pub contributor_contact: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: SubmissionStatus,
}

impl NewSubmission {
    /// Creation preconditions: description length, a non-blank contributor
    /// name, in-range coordinates and a `pending` status.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            Coordinates::new(latitude, longitude)?;
        } else if self.latitude.is_some() || self.longitude.is_some() {
            return Err(CoreError::Validation(
                "Latitude and longitude must be given together".to_string(),
            ));
        }
        if self.contributor_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "Contributor name must not be blank".to_string(),
            ));
        }
        if self.status != SubmissionStatus::Pending {
            return Err(CoreError::Validation(format!(
                "New submissions must be pending, got '{}'",
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

/// DTO for the single review write a submission receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: SubmissionStatus,
    pub reviewed_at: Timestamp,
    pub reviewed_by: String,
    pub admin_notes: Option<String>,
}

impl StatusChange {
    /// Build the write for `decision`; blank notes are stored as null.
    pub fn new(
        decision: ReviewDecision,
        reviewed_at: Timestamp,
        reviewer: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            status: decision.target_status(),
            reviewed_at,
            reviewed_by: reviewer.into(),
            admin_notes: notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

/// Character count used for the description limits.
pub fn description_len(text: &str) -> usize {
    text.chars().count()
}

/// Whether `text` satisfies the description length bounds.
pub fn description_in_bounds(text: &str) -> bool {
    (MIN_DESCRIPTION_CHARS..=MAX_DESCRIPTION_CHARS).contains(&description_len(text))
}

/// Cut `text` down to [`MAX_DESCRIPTION_CHARS`] characters.
pub fn truncate_description(text: &str) -> String {
    text.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn new_submission() -> NewSubmission {
        NewSubmission {
            district_id: Uuid::new_v4(),
            image_url: "https://example.test/a.png".to_string(),
            description: "Durga Puja".to_string(),
            contributor_name: "Asha".to_string(),
            contributor_contact: None,
            latitude: None,
            longitude: None,
            status: SubmissionStatus::Pending,
        }
    }

    // -- SubmissionStatus --

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in SubmissionStatus::ALL {
            assert_eq!(SubmissionStatus::from_str_db(status.as_str()).unwrap(), status);
        }
        assert!(SubmissionStatus::from_str_db("flagged").is_err());
    }

    #[test]
    fn only_pending_transitions_are_allowed() {
        use SubmissionStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        for terminal in [Approved, Rejected] {
            assert!(terminal.is_terminal());
            for next in SubmissionStatus::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert_matches!(Approved.validate_transition(Rejected), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::Approved).unwrap(),
            "\"approved\""
        );
    }

    #[test]
    fn decision_targets() {
        assert_eq!(ReviewDecision::Approve.target_status(), SubmissionStatus::Approved);
        assert_eq!(ReviewDecision::Reject.target_status(), SubmissionStatus::Rejected);
    }

    // -- NewSubmission --

    #[test]
    fn ten_char_description_passes() {
        assert!(new_submission().check().is_ok());
    }

    #[test]
    fn short_description_fails() {
        let mut s = new_submission();
        s.description = "Durga Puj".to_string();
        assert_matches!(s.check(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn long_description_fails() {
        let mut s = new_submission();
        s.description = "x".repeat(501);
        assert!(s.check().is_err());
        s.description = "x".repeat(500);
        assert!(s.check().is_ok());
    }

    #[test]
    fn blank_name_fails() {
        let mut s = new_submission();
        s.contributor_name = "   ".to_string();
        assert!(s.check().is_err());
    }

    #[test]
    fn non_pending_insert_fails() {
        let mut s = new_submission();
        s.status = SubmissionStatus::Approved;
        assert!(s.check().is_err());
    }

    #[test]
    fn out_of_range_latitude_fails() {
        let mut s = new_submission();
        s.latitude = Some(120.0);
        s.longitude = Some(10.0);
        assert!(s.check().is_err());
    }

    // -- Submission --

    #[test]
    fn deserializes_backend_row_with_embedded_district() {
        let district_id = Uuid::new_v4();
        let row = serde_json::json!({
            "id": Uuid::new_v4(),
            "district_id": district_id,
            "image_url": "https://example.test/a.png",
            "description": "Onam boat race",
            "contributor_name": "Asha",
            "contributor_contact": null,
            "latitude": 9.93,
            "longitude": 76.26,
            "status": "pending",
            "submitted_at": "2024-09-01T10:00:00.123456+00:00",
            "reviewed_at": null,
            "reviewed_by": null,
            "admin_notes": null,
            "districts": {
                "id": district_id,
                "state": "Kerala",
                "district_name": "Ernakulam",
                "created_at": "2024-01-01T00:00:00+00:00"
            }
        });
        let submission: Submission = serde_json::from_value(row).unwrap();
        assert!(submission.is_pending());
        assert_eq!(submission.state_name(), Some("Kerala"));
        assert_eq!(submission.district_name(), Some("Ernakulam"));
        assert!(submission.coordinates().is_some());
    }

    // -- StatusChange --

    #[test]
    fn blank_notes_become_null() {
        let change = StatusChange::new(
            ReviewDecision::Reject,
            chrono::Utc::now(),
            DEFAULT_REVIEWER,
            Some("  ".to_string()),
        );
        assert_eq!(change.status, SubmissionStatus::Rejected);
        assert_eq!(change.reviewed_by, "admin");
        assert!(change.admin_notes.is_none());
    }

    // -- description helpers --

    #[test]
    fn description_bounds() {
        assert!(!description_in_bounds(&"a".repeat(9)));
        assert!(description_in_bounds(&"a".repeat(10)));
        assert!(description_in_bounds(&"a".repeat(500)));
        assert!(!description_in_bounds(&"a".repeat(501)));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // Ten Devanagari characters, thirty bytes.
        let text = "दुर्गापूजाउत्सव".chars().take(10).collect::<String>();
        assert_eq!(description_len(&text), 10);
        assert!(description_in_bounds(&text));
    }

    #[test]
    fn truncation_keeps_first_500_chars() {
        let text = "é".repeat(600);
        assert_eq!(description_len(&truncate_description(&text)), 500);
    }
}
