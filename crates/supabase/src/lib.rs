//! Supabase-backed implementation of the dataset store.
//!
//! Talks to PostgREST (`/rest/v1`) for tables and views and to the Storage
//! API (`/storage/v1`) for image blobs, using [`reqwest`].

pub mod client;
pub mod config;

pub use client::{SupabaseError, SupabaseStore};
pub use config::SupabaseConfig;
