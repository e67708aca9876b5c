//! One contributor's session: the wizard plus the I/O around it.
//!
//! The session owns its wizard exclusively. Submitting runs the two-write
//! transaction (blob upload, then record insert) in a task of its own, so an
//! abandoned request cannot strand the wizard mid-submit. On success the
//! task schedules an automatic reset back to a fresh wizard. That reset is
//! cancellable and tied to the session: a manual reset or dropping the
//! session cancels it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use ivd_core::district::{District, DistrictCatalog};
use ivd_core::error::CoreError;
use ivd_core::geo::Coordinates;
use ivd_core::image_file::{ImageFile, ImageKind};
use ivd_core::storage_path::generate_storage_path;
use ivd_core::store::{DatasetStore, StoreError};
use ivd_core::submission::description_len;
use ivd_core::types::EntityId;
use ivd_core::wizard::{
    ContributionDraft, SubmissionReceipt, Wizard, WizardState, WizardStep, INPUT_STEPS,
};

use crate::catalog::load_catalog;
use crate::location::LocationProvider;
use crate::orphans::OrphanLedger;

/// Time the success screen stays up before the wizard starts over.
pub const RESET_DELAY: Duration = Duration::from_secs(3);

/// Why a submit attempt did not produce a submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Rejected before any I/O: a guard failed or a submit is running.
    #[error("{0}")]
    Incomplete(CoreError),

    /// The image could not be stored; no record was created.
    #[error("Failed to submit. Please try again. ({0})")]
    Upload(StoreError),

    /// The image was stored but the record was not; the blob is orphaned.
    #[error("Failed to submit. Please try again. ({source})")]
    Insert {
        orphaned_path: String,
        source: StoreError,
    },

    /// The transaction task died before reporting an outcome.
    #[error("Failed to submit. Please try again. (submission was interrupted)")]
    Interrupted,
}

pub struct ContributionSession {
    store: Arc<dyn DatasetStore>,
    catalog: Arc<DistrictCatalog>,
    wizard: Arc<Mutex<Wizard>>,
    orphans: Arc<OrphanLedger>,
    reset_delay: Duration,
    /// Cancelled when the session goes away; parent of every reset task.
    lifetime: CancellationToken,
    pending_reset: Option<CancellationToken>,
}

impl ContributionSession {
    pub fn new(store: Arc<dyn DatasetStore>, catalog: Arc<DistrictCatalog>) -> Self {
        Self {
            store,
            catalog,
            wizard: Arc::new(Mutex::new(Wizard::new())),
            orphans: Arc::new(OrphanLedger::new()),
            reset_delay: RESET_DELAY,
            lifetime: CancellationToken::new(),
            pending_reset: None,
        }
    }

    /// Start a session with a freshly loaded catalog.
    pub async fn open(store: Arc<dyn DatasetStore>) -> Self {
        let catalog = load_catalog(store.as_ref()).await;
        Self::new(store, Arc::new(catalog))
    }

    /// Record orphaned blobs in a ledger shared with other sessions.
    pub fn with_orphan_ledger(mut self, orphans: Arc<OrphanLedger>) -> Self {
        self.orphans = orphans;
        self
    }

    pub fn with_reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    pub fn catalog(&self) -> &DistrictCatalog {
        &self.catalog
    }

    pub fn orphans(&self) -> &Arc<OrphanLedger> {
        &self.orphans
    }

    pub fn step(&self) -> WizardStep {
        self.wizard().step()
    }

    /// A copy of the wizard as it is right now.
    pub fn wizard_state(&self) -> WizardState {
        self.wizard().state().clone()
    }

    // ---- editing ----

    pub fn select_state(&mut self, state: Option<&str>) -> Result<(), CoreError> {
        let catalog = Arc::clone(&self.catalog);
        self.wizard().select_state(state, &catalog)
    }

    pub fn select_district(&mut self, district_id: Option<EntityId>) -> Result<(), CoreError> {
        let catalog = Arc::clone(&self.catalog);
        self.wizard().select_district(district_id, &catalog)
    }

    pub fn choose_image(&mut self, image: ImageFile) -> Result<(), CoreError> {
        tracing::debug!(
            file_name = image.file_name(),
            size = image.size(),
            "Image chosen"
        );
        self.wizard().choose_image(image)
    }

    pub fn clear_image(&mut self) -> Result<(), CoreError> {
        self.wizard().clear_image()
    }

    /// Ask `provider` for the current position and attach it to the image.
    ///
    /// Only allowed while capturing the image. A provider failure is logged
    /// and otherwise ignored (`Ok(None)`).
    pub async fn capture_location(
        &mut self,
        provider: &dyn LocationProvider,
    ) -> Result<Option<Coordinates>, CoreError> {
        let step = self.step();
        if step != WizardStep::CapturingImage {
            return Err(CoreError::Validation(format!(
                "Location can only be captured during '{}', not '{}'",
                WizardStep::CapturingImage.label(),
                step.label()
            )));
        }

        match provider.current_position().await {
            Ok(coordinates) => {
                self.wizard().record_location(coordinates)?;
                tracing::debug!(
                    latitude = coordinates.latitude,
                    longitude = coordinates.longitude,
                    "Location captured"
                );
                Ok(Some(coordinates))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Location capture failed, continuing without it");
                Ok(None)
            }
        }
    }

    pub fn set_description(&mut self, text: &str) -> Result<(), CoreError> {
        self.wizard().set_description(text)
    }

    pub fn set_contributor(&mut self, name: &str, contact: &str) -> Result<(), CoreError> {
        let mut wizard = self.wizard();
        wizard.set_contributor_name(name)?;
        wizard.set_contributor_contact(contact)
    }

    // ---- navigation ----

    pub fn advance(&mut self) -> bool {
        self.wizard().advance()
    }

    pub fn back(&mut self) -> bool {
        self.wizard().back()
    }

    /// Start over right away, cancelling any scheduled reset.
    pub fn reset(&mut self) {
        self.cancel_pending_reset();
        self.wizard().reset();
    }

    // ---- submit ----

    /// Upload the image, then insert the submission record.
    ///
    /// On any failure the wizard returns to the contributor step with every
    /// field intact and the error surfaced. On success the wizard shows the
    /// receipt and resets itself after the reset delay.
    ///
    /// The transaction runs in its own task. Dropping this future does not
    /// abandon it: the wizard still receives the outcome, and a blob whose
    /// record was not written is still recorded as an orphan.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, SubmitError> {
        let draft = self
            .wizard()
            .begin_submit()
            .map_err(SubmitError::Incomplete)?;

        self.cancel_pending_reset();
        let reset = self.lifetime.child_token();
        self.pending_reset = Some(reset.clone());

        let transaction = SubmitTransaction {
            store: Arc::clone(&self.store),
            wizard: Arc::clone(&self.wizard),
            orphans: Arc::clone(&self.orphans),
            reset_delay: self.reset_delay,
            reset,
        };
        let (outcome_tx, outcome_rx) = oneshot::channel();
        tokio::spawn(transaction.run(draft, outcome_tx));

        match outcome_rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                let mut wizard = self.wizard();
                if wizard.step() == WizardStep::Submitting {
                    wizard.fail_submit(SubmitError::Interrupted.to_string());
                }
                Err(SubmitError::Interrupted)
            }
        }
    }

    fn cancel_pending_reset(&mut self) {
        if let Some(token) = self.pending_reset.take() {
            token.cancel();
        }
    }

    fn wizard(&self) -> MutexGuard<'_, Wizard> {
        lock(&self.wizard)
    }

    // ---- snapshot ----

    /// Everything a front end needs to render the current step.
    pub fn snapshot(&self) -> SessionSnapshot {
        let wizard = self.wizard();
        let step = wizard.step();
        let mut snapshot = SessionSnapshot {
            step,
            label: step.label(),
            position: step.position(),
            total_steps: INPUT_STEPS,
            can_advance: wizard.can_advance(),
            can_go_back: wizard.can_go_back(),
            states: self.catalog.states_in_order().to_vec(),
            districts: Vec::new(),
            selected_state: None,
            district: None,
            image: None,
            coordinates: None,
            description: None,
            description_chars: 0,
            contributor_name: None,
            contributor_contact: None,
            receipt: None,
            last_error: wizard.last_error().map(str::to_string),
        };

        match wizard.state() {
            WizardState::SelectingLocation(form) => {
                snapshot.districts = self
                    .catalog
                    .districts_for_state(form.state.as_deref())
                    .into_iter()
                    .cloned()
                    .collect();
                snapshot.selected_state = form.state.clone();
                snapshot.district = form.district.clone();
            }
            WizardState::CapturingImage { district, form } => {
                snapshot.confirm_district(district);
                snapshot.image = form.image.as_ref().map(ImageSummary::of);
                snapshot.coordinates = form.coordinates;
            }
            WizardState::Describing {
                district,
                image,
                form,
            } => {
                snapshot.confirm_district(district);
                snapshot.image = Some(ImageSummary::of(&image.image));
                snapshot.coordinates = image.coordinates;
                snapshot.set_description(&form.text);
            }
            WizardState::IdentifyingContributor {
                district,
                image,
                description,
                form,
            } => {
                snapshot.confirm_district(district);
                snapshot.image = Some(ImageSummary::of(&image.image));
                snapshot.coordinates = image.coordinates;
                snapshot.set_description(description);
                snapshot.contributor_name = Some(form.name.clone());
                snapshot.contributor_contact = Some(form.contact.clone());
            }
            WizardState::Submitting(draft) => {
                snapshot.confirm_district(&draft.district);
                snapshot.image = Some(ImageSummary::of(&draft.image.image));
                snapshot.coordinates = draft.image.coordinates;
                snapshot.set_description(&draft.description);
                snapshot.contributor_name = Some(draft.contributor_name.clone());
                snapshot.contributor_contact = draft.contributor_contact.clone();
            }
            WizardState::Submitted(receipt) => {
                snapshot.confirm_district(&receipt.district);
                snapshot.receipt = Some(receipt.clone());
            }
        }

        snapshot
    }
}

impl Drop for ContributionSession {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

/// Everything the submit transaction needs, owned so it can outlive the
/// request that started it.
struct SubmitTransaction {
    store: Arc<dyn DatasetStore>,
    wizard: Arc<Mutex<Wizard>>,
    orphans: Arc<OrphanLedger>,
    reset_delay: Duration,
    reset: CancellationToken,
}

impl SubmitTransaction {
    async fn run(
        self,
        draft: ContributionDraft,
        outcome_tx: oneshot::Sender<Result<SubmissionReceipt, SubmitError>>,
    ) {
        let path = generate_storage_path(&draft.district, &draft.image.image.extension());
        let outcome = self.write(&draft, path).await;

        let succeeded = match &outcome {
            Ok(receipt) => {
                lock(&self.wizard).complete_submit(receipt.clone());
                tracing::info!(
                    district = %draft.district.display_name(),
                    path = %receipt.storage_path,
                    "Submission created"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    district = %draft.district.display_name(),
                    error = %e,
                    "Submission failed"
                );
                lock(&self.wizard).fail_submit(e.to_string());
                false
            }
        };

        if outcome_tx.send(outcome).is_err() {
            tracing::warn!("Submit finished after its caller went away");
        }

        if succeeded {
            reset_after(self.wizard, self.reset_delay, self.reset).await;
        }
    }

    async fn write(
        &self,
        draft: &ContributionDraft,
        path: String,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let image = &draft.image.image;
        self.store
            .upload_blob(&path, image.content_type(), image.bytes().to_vec())
            .await
            .map_err(SubmitError::Upload)?;

        let image_url = self.store.resolve_public_address(&path);
        let record = draft.to_record(image_url.clone());

        if let Err(source) = self.store.insert_submission(&record).await {
            self.orphans.record(&path, &source);
            return Err(SubmitError::Insert {
                orphaned_path: path,
                source,
            });
        }

        Ok(SubmissionReceipt {
            district: draft.district.clone(),
            storage_path: path,
            image_url,
        })
    }
}

/// Start over once `delay` has passed, unless `cancelled` fires first or the
/// wizard has already left the success screen.
async fn reset_after(
    wizard: Arc<Mutex<Wizard>>,
    delay: Duration,
    cancelled: CancellationToken,
) {
    tokio::select! {
        biased;
        _ = cancelled.cancelled() => {
            tracing::debug!("Scheduled reset cancelled");
        }
        _ = tokio::time::sleep(delay) => {
            let mut wizard = lock(&wizard);
            if !cancelled.is_cancelled() && wizard.step() == WizardStep::Submitted {
                wizard.reset();
                tracing::debug!("Wizard reset after submission");
            }
        }
    }
}

fn lock(wizard: &Mutex<Wizard>) -> MutexGuard<'_, Wizard> {
    wizard.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub step: WizardStep,
    pub label: &'static str,
    pub position: u8,
    pub total_steps: u8,
    pub can_advance: bool,
    pub can_go_back: bool,
    pub states: Vec<String>,
    /// Districts offered for the chosen state (location step only).
    pub districts: Vec<District>,
    pub selected_state: Option<String>,
    pub district: Option<District>,
    pub image: Option<ImageSummary>,
    pub coordinates: Option<Coordinates>,
    pub description: Option<String>,
    pub description_chars: usize,
    pub contributor_name: Option<String>,
    pub contributor_contact: Option<String>,
    pub receipt: Option<SubmissionReceipt>,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    fn confirm_district(&mut self, district: &District) {
        self.selected_state = Some(district.state.clone());
        self.district = Some(district.clone());
    }

    fn set_description(&mut self, text: &str) {
        self.description_chars = description_len(text);
        self.description = Some(text.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSummary {
    pub file_name: String,
    pub kind: ImageKind,
    pub content_type: &'static str,
    pub size: usize,
}

impl ImageSummary {
    fn of(image: &ImageFile) -> Self {
        Self {
            file_name: image.file_name().to_string(),
            kind: image.kind(),
            content_type: image.content_type(),
            size: image.size(),
        }
    }
}
