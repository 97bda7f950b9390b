//! Ingestion service library crate.
//!
//! # Purpose
//! Exposes the HTTP API surface, configuration, flusher, and storage
//! backends for use by the binary and tests.
pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod flusher;
pub mod observability;
pub mod registry;
pub mod sink;
