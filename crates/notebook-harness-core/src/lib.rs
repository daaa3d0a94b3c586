//! # Notebook Harness Core
//!
//! Shared logic for Notebook Harness: data models, the source-name codec
//! and tier policy, the boolean filter tree, the storage trait, and the
//! in-process record cache.
//!
//! This crate contains no tokio, HTTP, filesystem I/O, or other
//! native-only dependencies. The native adapter and CLI live in the
//! `notebook-harness` crate.

pub mod error;
pub mod filter;
pub mod models;
pub mod naming;
pub mod store;
