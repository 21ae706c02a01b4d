#![deny(missing_docs)]

//! Core library for Docsum: document-set uploads and model-written title summaries.

/// HTTP routing and REST handlers.
pub mod api;
/// Bearer-token authentication.
pub mod auth;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Upload and summary counters.
pub mod metrics;
/// Upload, selection, and summarization pipeline.
pub mod processing;
/// SQLite-backed document store and blob storage.
pub mod store;
/// Chat client abstraction and the Ollama adapter.
pub mod summarization;
