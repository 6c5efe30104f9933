//! The host-facing handler contract.
//!
//! The host runtime drives parsing through this trait only; it never sees
//! the concrete loader type. The method set is fixed by the host's
//! callback contract: one parse entry point returning a plain success
//! flag, the connection parameter accessors, and a formatted results
//! string.

use crate::loader::MongoOsmLoader;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Callback contract a loader must satisfy to be driven by the host.
///
/// # Object Safety
/// This trait is object-safe; hosts hold handlers as
/// `Box<dyn OsmHandler>`.
#[async_trait]
pub trait OsmHandler: Send {
    /// Parses the OSM file at the given path, ingesting its elements.
    ///
    /// Returns `true` on success and `false` on any failure. Failures are
    /// logged with their full cause chain but never propagate to the
    /// host; element counters keep whatever progress was made before the
    /// failure.
    async fn parse(&mut self, file_path: &Path) -> bool;

    /// Configured database host address.
    fn host_name(&self) -> &str;

    /// Configured database port.
    fn port_number(&self) -> u16;

    /// Configured database name.
    fn database_name(&self) -> &str;

    /// Connection URI derived from host and port.
    fn connection_uri(&self) -> String;

    /// Formatted element counters: `"{n} Nodes, {m} Ways, {k} Relations\n"`.
    ///
    /// Readable at any time, including before the first parse (all zero)
    /// and after a failed one (partial progress).
    fn parser_results(&self) -> String;
}

/// Creates a MongoDB-backed handler for the given connection parameters.
///
/// # Errors
/// Returns error if the connection parameters fail validation or the
/// MongoDB client cannot be constructed
pub async fn create_handler(
    host: &str,
    port: u16,
    database: &str,
) -> Result<Box<dyn OsmHandler>> {
    let loader = MongoOsmLoader::new(host, port, database).await?;
    Ok(Box::new(loader))
}
