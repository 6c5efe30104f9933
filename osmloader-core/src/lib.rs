//! OpenStreetMap XML ingestion into MongoDB.
//!
//! This crate wires parsed OSM entities into a MongoDB-backed ingestion
//! routine behind a fixed host callback contract. The host runtime holds
//! a [`handler::OsmHandler`] and drives parsing through it; the concrete
//! [`loader::MongoOsmLoader`] delegates the actual scan-and-insert work
//! to an [`ingest::OsmIngest`] sink.
//!
//! # Architecture
//! - `config`: immutable connection configuration with eager validation
//! - `error`: error taxonomy preserving failure causes
//! - `handler`: the host-facing callback contract and factory
//! - `loader`: the one concrete handler implementation
//! - `ingest`: element model, streaming XML reader, and sinks
//! - `logging`: shared tracing setup for binaries

pub mod config;
pub mod error;
pub mod handler;
pub mod ingest;
pub mod loader;
pub mod logging;

// Re-export commonly used types
pub use config::ConnectionConfig;
pub use error::{OsmLoaderError, Result};
pub use handler::{create_handler, OsmHandler};
pub use ingest::{IngestStats, MemoryIngest, MongoIngestor, OsmElement, OsmIngest};
pub use loader::MongoOsmLoader;
pub use logging::init_logging;
