//! HTTP API: handlers, request/response types, and the OpenAPI document.
pub mod channels;
pub mod devices;
pub mod error;
pub mod flush;
pub mod ingest;
pub mod openapi;
pub mod snapshot;
pub mod stream;
pub mod system;
pub mod types;
