//! Domain model for the India Visual Dataset collection tool.
//!
//! Holds the reference data and submission types, the contribution wizard
//! state machine, review filtering, and the data-access contract shared by
//! the contribution and review flows. Nothing in here performs network I/O.

pub mod coverage;
pub mod district;
pub mod error;
pub mod geo;
pub mod image_file;
pub mod review;
pub mod storage_path;
pub mod store;
pub mod submission;
pub mod types;
pub mod wizard;
