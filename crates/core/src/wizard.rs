//! Contribution wizard state machine.
//!
//! The wizard walks a contributor through four input steps in strict order:
//! location, image, description, contributor details. Each [`WizardState`]
//! variant carries the form of its own step plus the typed values confirmed
//! in earlier steps, so a field can only be edited while its step is active.
//!
//! Forward transitions are guarded; a failing guard leaves the state alone
//! (the "Continue" affordance is simply disabled). Back is always allowed
//! from an input step and loses nothing: forms of later steps are parked in
//! [`Wizard`] while the contributor revisits earlier ones.

use crate::district::{District, DistrictCatalog};
use crate::error::CoreError;
use crate::geo::Coordinates;
use crate::image_file::ImageFile;
use crate::submission::{
    description_in_bounds, truncate_description, NewSubmission, SubmissionStatus,
};
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Where the wizard currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectingLocation,
    CapturingImage,
    Describing,
    IdentifyingContributor,
    Submitting,
    Submitted,
}

/// Number of input steps shown in the progress indicator.
pub const INPUT_STEPS: u8 = 4;

impl WizardStep {
    /// 1-based position in the progress indicator. The submit states stay
    /// on the last input step.
    pub fn position(self) -> u8 {
        match self {
            Self::SelectingLocation => 1,
            Self::CapturingImage => 2,
            Self::Describing => 3,
            Self::IdentifyingContributor | Self::Submitting | Self::Submitted => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SelectingLocation => "Select Location",
            Self::CapturingImage => "Upload Image",
            Self::Describing => "Add Description",
            Self::IdentifyingContributor => "Your Details",
            Self::Submitting => "Submitting",
            Self::Submitted => "Submitted",
        }
    }

    pub fn is_input_step(self) -> bool {
        !matches!(self, Self::Submitting | Self::Submitted)
    }
}

// ---------------------------------------------------------------------------
// Step forms and confirmed values
// ---------------------------------------------------------------------------

/// Step 1 input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationForm {
    pub state: Option<String>,
    pub district: Option<District>,
}

/// Step 2 input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageForm {
    pub image: Option<ImageFile>,
    pub coordinates: Option<Coordinates>,
}

/// Step 3 input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptionForm {
    pub text: String,
}

/// Step 4 input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributorForm {
    pub name: String,
    pub contact: String,
}

/// The image confirmed when leaving step 2.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub image: ImageFile,
    pub coordinates: Option<Coordinates>,
}

/// Everything needed to create a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionDraft {
    pub district: District,
    pub image: CapturedImage,
    pub description: String,
    pub contributor_name: String,
    pub contributor_contact: Option<String>,
}

impl ContributionDraft {
    /// The insert record for this draft once its image lives at `image_url`.
    pub fn to_record(&self, image_url: String) -> NewSubmission {
        NewSubmission {
            district_id: self.district.id,
            image_url,
            description: self.description.clone(),
            contributor_name: self.contributor_name.clone(),
            contributor_contact: self.contributor_contact.clone(),
            latitude: self.image.coordinates.map(|c| c.latitude),
            longitude: self.image.coordinates.map(|c| c.longitude),
            status: SubmissionStatus::Pending,
        }
    }
}

/// What the contributor is shown after a successful submit.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubmissionReceipt {
    pub district: District,
    pub storage_path: String,
    pub image_url: String,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum WizardState {
    SelectingLocation(LocationForm),
    CapturingImage {
        district: District,
        form: ImageForm,
    },
    Describing {
        district: District,
        image: CapturedImage,
        form: DescriptionForm,
    },
    IdentifyingContributor {
        district: District,
        image: CapturedImage,
        description: String,
        form: ContributorForm,
    },
    Submitting(ContributionDraft),
    Submitted(SubmissionReceipt),
}

impl Default for WizardState {
    fn default() -> Self {
        Self::SelectingLocation(LocationForm::default())
    }
}

/// Forms of steps ahead of the current one, kept for when the contributor
/// moves forward again.
#[derive(Debug, Clone, Default, PartialEq)]
struct ParkedForms {
    image: Option<ImageForm>,
    description: Option<DescriptionForm>,
    contributor: Option<ContributorForm>,
}

impl WizardState {
    pub fn step(&self) -> WizardStep {
        match self {
            Self::SelectingLocation(_) => WizardStep::SelectingLocation,
            Self::CapturingImage { .. } => WizardStep::CapturingImage,
            Self::Describing { .. } => WizardStep::Describing,
            Self::IdentifyingContributor { .. } => WizardStep::IdentifyingContributor,
            Self::Submitting(_) => WizardStep::Submitting,
            Self::Submitted(_) => WizardStep::Submitted,
        }
    }

    /// The guard for leaving the current step forwards.
    pub fn guard_holds(&self) -> bool {
        match self {
            Self::SelectingLocation(form) => form.state.is_some() && form.district.is_some(),
            Self::CapturingImage { form, .. } => form.image.is_some(),
            Self::Describing { form, .. } => description_in_bounds(&form.text),
            Self::IdentifyingContributor { form, .. } => !form.name.trim().is_empty(),
            Self::Submitting(_) | Self::Submitted(_) => false,
        }
    }

    /// Move one step forward, or hand the state back unchanged when the
    /// current step's guard does not hold.
    fn forward(self, parked: &mut ParkedForms) -> Result<Self, Self> {
        match self {
            Self::SelectingLocation(LocationForm {
                state: Some(_),
                district: Some(district),
            }) => Ok(Self::CapturingImage {
                district,
                form: parked.image.take().unwrap_or_default(),
            }),
            Self::CapturingImage {
                district,
                form:
                    ImageForm {
                        image: Some(image),
                        coordinates,
                    },
            } => Ok(Self::Describing {
                district,
                image: CapturedImage { image, coordinates },
                form: parked.description.take().unwrap_or_default(),
            }),
            Self::Describing {
                district,
                image,
                form,
            } if description_in_bounds(&form.text) => Ok(Self::IdentifyingContributor {
                district,
                image,
                description: form.text,
                form: parked.contributor.take().unwrap_or_default(),
            }),
            Self::IdentifyingContributor {
                district,
                image,
                description,
                form,
            } if !form.name.trim().is_empty() => {
                let contact = form.contact.trim();
                Ok(Self::Submitting(ContributionDraft {
                    district,
                    image,
                    description,
                    contributor_name: form.name.trim().to_string(),
                    contributor_contact: (!contact.is_empty()).then(|| contact.to_string()),
                }))
            }
            other => Err(other),
        }
    }

    /// Move one step back, parking the current step's form.
    fn backward(self, parked: &mut ParkedForms) -> Result<Self, Self> {
        match self {
            Self::CapturingImage { district, form } => {
                parked.image = Some(form);
                Ok(Self::SelectingLocation(LocationForm {
                    state: Some(district.state.clone()),
                    district: Some(district),
                }))
            }
            Self::Describing {
                district,
                image,
                form,
            } => {
                parked.description = Some(form);
                Ok(Self::CapturingImage {
                    district,
                    form: ImageForm {
                        image: Some(image.image),
                        coordinates: image.coordinates,
                    },
                })
            }
            Self::IdentifyingContributor {
                district,
                image,
                description,
                form,
            } => {
                parked.contributor = Some(form);
                Ok(Self::Describing {
                    district,
                    image,
                    form: DescriptionForm { text: description },
                })
            }
            other => Err(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

/// One contributor's pass through the wizard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wizard {
    state: WizardState,
    parked: ParkedForms,
    last_error: Option<String>,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> WizardStep {
        self.state.step()
    }

    /// Error from the last failed submit, shown until the next attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether "Continue" (or "Submit" on the last step) is enabled.
    pub fn can_advance(&self) -> bool {
        self.state.guard_holds()
    }

    /// Whether "Back" is enabled.
    pub fn can_go_back(&self) -> bool {
        matches!(
            self.state,
            WizardState::CapturingImage { .. }
                | WizardState::Describing { .. }
                | WizardState::IdentifyingContributor { .. }
        )
    }

    /// Step forward if the current guard holds. Returns whether it moved.
    pub fn advance(&mut self) -> bool {
        let current = std::mem::take(&mut self.state);
        match current.forward(&mut self.parked) {
            Ok(next) => {
                self.state = next;
                true
            }
            Err(unchanged) => {
                self.state = unchanged;
                false
            }
        }
    }

    /// Step back, keeping everything entered so far. Returns whether it moved.
    pub fn back(&mut self) -> bool {
        let current = std::mem::take(&mut self.state);
        match current.backward(&mut self.parked) {
            Ok(previous) => {
                self.state = previous;
                true
            }
            Err(unchanged) => {
                self.state = unchanged;
                false
            }
        }
    }

    /// Start over with every field cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // -- step 1 --

    /// Choose a state (or none). Any chosen district is always cleared.
    pub fn select_state(
        &mut self,
        state: Option<&str>,
        catalog: &DistrictCatalog,
    ) -> Result<(), CoreError> {
        let form = self.location_form("select a state")?;
        if let Some(state) = state {
            if !catalog.has_state(state) {
                return Err(CoreError::Validation(format!("Unknown state '{state}'")));
            }
        }
        form.state = state.map(str::to_string);
        form.district = None;
        Ok(())
    }

    /// Choose a district of the currently selected state (or none).
    pub fn select_district(
        &mut self,
        district_id: Option<EntityId>,
        catalog: &DistrictCatalog,
    ) -> Result<(), CoreError> {
        let form = self.location_form("select a district")?;
        let Some(district_id) = district_id else {
            form.district = None;
            return Ok(());
        };
        let state = form.state.as_deref().ok_or_else(|| {
            CoreError::Validation("Select a state before choosing a district".to_string())
        })?;
        let district = catalog
            .districts_for_state(Some(state))
            .into_iter()
            .find(|d| d.id == district_id)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "District {district_id} is not part of state '{state}'"
                ))
            })?;
        form.district = Some(district.clone());
        Ok(())
    }

    // -- step 2 --

    pub fn choose_image(&mut self, image: ImageFile) -> Result<(), CoreError> {
        self.image_form("choose an image")?.image = Some(image);
        Ok(())
    }

    /// Drop the chosen image ("Change").
    pub fn clear_image(&mut self) -> Result<(), CoreError> {
        self.image_form("change the image")?.image = None;
        Ok(())
    }

    /// Attach GPS coordinates; only offered while capturing the image.
    pub fn record_location(&mut self, coordinates: Coordinates) -> Result<(), CoreError> {
        self.image_form("capture a location")?.coordinates = Some(coordinates);
        Ok(())
    }

    // -- step 3 --

    /// Replace the description; input past the character limit is cut off.
    pub fn set_description(&mut self, text: &str) -> Result<(), CoreError> {
        match &mut self.state {
            WizardState::Describing { form, .. } => {
                form.text = truncate_description(text);
                Ok(())
            }
            other => Err(wrong_step("edit the description", WizardStep::Describing, other.step())),
        }
    }

    // -- step 4 --

    pub fn set_contributor_name(&mut self, name: &str) -> Result<(), CoreError> {
        self.contributor_form("enter a name")?.name = name.to_string();
        Ok(())
    }

    pub fn set_contributor_contact(&mut self, contact: &str) -> Result<(), CoreError> {
        self.contributor_form("enter contact details")?.contact = contact.to_string();
        Ok(())
    }

    // -- submit --

    /// Re-check the last guard and enter `Submitting`, returning the draft
    /// to upload. Anything else is rejected without touching the state.
    pub fn begin_submit(&mut self) -> Result<ContributionDraft, CoreError> {
        match &self.state {
            WizardState::Submitting(_) => {
                return Err(CoreError::Conflict(
                    "A submission is already in progress".to_string(),
                ))
            }
            WizardState::IdentifyingContributor { .. } => {}
            other => {
                return Err(wrong_step(
                    "submit",
                    WizardStep::IdentifyingContributor,
                    other.step(),
                ))
            }
        }
        if !self.advance() {
            return Err(CoreError::Validation(
                "Please fill all required fields".to_string(),
            ));
        }
        self.last_error = None;
        match &self.state {
            WizardState::Submitting(draft) => Ok(draft.clone()),
            other => Err(CoreError::Internal(format!(
                "Submit left the wizard in {:?}",
                other.step()
            ))),
        }
    }

    /// Return to the contributor step with every field intact and `message`
    /// surfaced.
    pub fn fail_submit(&mut self, message: impl Into<String>) {
        if let WizardState::Submitting(draft) = std::mem::take(&mut self.state) {
            self.state = WizardState::IdentifyingContributor {
                district: draft.district,
                image: draft.image,
                description: draft.description,
                form: ContributorForm {
                    name: draft.contributor_name,
                    contact: draft.contributor_contact.unwrap_or_default(),
                },
            };
            self.last_error = Some(message.into());
        } else {
            tracing::warn!("fail_submit called outside of a submission");
        }
    }

    /// Enter `Submitted`. Parked forms are dropped; nothing carries over.
    pub fn complete_submit(&mut self, receipt: SubmissionReceipt) {
        if matches!(self.state, WizardState::Submitting(_)) {
            self.state = WizardState::Submitted(receipt);
            self.parked = ParkedForms::default();
            self.last_error = None;
        } else {
            tracing::warn!(step = ?self.step(), "complete_submit called outside of a submission");
        }
    }

    // -- helpers --

    fn location_form(&mut self, action: &str) -> Result<&mut LocationForm, CoreError> {
        match &mut self.state {
            WizardState::SelectingLocation(form) => Ok(form),
            other => Err(wrong_step(action, WizardStep::SelectingLocation, other.step())),
        }
    }

    fn image_form(&mut self, action: &str) -> Result<&mut ImageForm, CoreError> {
        match &mut self.state {
            WizardState::CapturingImage { form, .. } => Ok(form),
            other => Err(wrong_step(action, WizardStep::CapturingImage, other.step())),
        }
    }

    fn contributor_form(&mut self, action: &str) -> Result<&mut ContributorForm, CoreError> {
        match &mut self.state {
            WizardState::IdentifyingContributor { form, .. } => Ok(form),
            other => Err(wrong_step(
                action,
                WizardStep::IdentifyingContributor,
                other.step(),
            )),
        }
    }
}

fn wrong_step(action: &str, expected: WizardStep, actual: WizardStep) -> CoreError {
    CoreError::Validation(format!(
        "Cannot {action} during '{}'; only during '{}'",
        actual.label(),
        expected.label()
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
