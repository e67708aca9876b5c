//! The two user-facing flows built on the dataset store.
//!
//! A [`ContributionSession`] drives one contributor through the wizard and
//! performs the upload-then-insert submit. A [`ReviewConsole`] loads every
//! submission and coverage row for administrators and records decisions.
//! Both read districts through [`catalog::load_catalog`] and never talk to
//! each other directly.

pub mod catalog;
pub mod console;
pub mod contribution;
pub mod location;
pub mod orphans;

pub use console::{ReviewConsole, ReviewError};
pub use contribution::{ContributionSession, SessionSnapshot, SubmitError};
pub use orphans::OrphanLedger;
