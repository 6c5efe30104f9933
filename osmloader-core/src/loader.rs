//! MongoDB-backed OSM loader.
//!
//! `MongoOsmLoader` is the one concrete [`OsmHandler`] implementation: it
//! owns the immutable connection configuration and the ingestion delegate,
//! opens source files, and reports results. The actual element handling
//! lives entirely in the delegate.

use crate::config::ConnectionConfig;
use crate::error::{redact_connection_uri, OsmLoaderError};
use crate::handler::OsmHandler;
use crate::ingest::{stream_elements, MongoIngestor, OsmIngest};
use crate::Result;
use async_trait::async_trait;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::path::Path;

/// OSM ingestion adapter bound to one MongoDB target.
///
/// # Example
/// ```rust,ignore
/// use osmloader_core::loader::MongoOsmLoader;
/// use osmloader_core::handler::OsmHandler;
///
/// let mut loader = MongoOsmLoader::new("localhost", 27017, "osm").await?;
/// if loader.parse(Path::new("map.osm")).await {
///     println!("{}", loader.parser_results());
/// }
/// ```
pub struct MongoOsmLoader {
    config: ConnectionConfig,
    ingest: Box<dyn OsmIngest>,
}

impl std::fmt::Debug for MongoOsmLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoOsmLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MongoOsmLoader {
    /// Creates a loader writing into MongoDB at `host:port/database`.
    ///
    /// Connection parameters are validated eagerly and fail fast with a
    /// descriptive error. The driver itself connects lazily, so an
    /// unreachable server only surfaces on the first insert.
    ///
    /// # Errors
    /// Returns error if the parameters fail validation or the client
    /// cannot be constructed
    pub async fn new(host: &str, port: u16, database: &str) -> Result<Self> {
        let config = ConnectionConfig::new(host.to_string(), port, database.to_string());
        config.validate()?;

        let client = build_client(&config).await?;
        let ingest = Box::new(MongoIngestor::new(&client, &config.database));

        Ok(Self { config, ingest })
    }

    /// Creates a loader with an injected ingestion delegate.
    ///
    /// Used for dry runs and tests; no MongoDB client is constructed.
    ///
    /// # Errors
    /// Returns error if the connection parameters fail validation
    pub fn with_ingest(
        host: &str,
        port: u16,
        database: &str,
        ingest: Box<dyn OsmIngest>,
    ) -> Result<Self> {
        let config = ConnectionConfig::new(host.to_string(), port, database.to_string());
        config.validate()?;

        Ok(Self { config, ingest })
    }

    /// The loader's connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Parses one OSM file, surfacing the failure cause.
    ///
    /// This is the `Result`-returning core that [`OsmHandler::parse`]
    /// wraps. Counters mutated before a failure keep their values.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened, its content is
    /// malformed, or the delegate rejects an element
    pub async fn try_parse(&mut self, file_path: &Path) -> Result<()> {
        let file = tokio::fs::File::open(file_path).await.map_err(|e| {
            OsmLoaderError::io(format!("opening '{}'", file_path.display()), e)
        })?;

        let reader = tokio::io::BufReader::new(file);
        stream_elements(reader, self.ingest.as_mut()).await?;
        self.ingest.finish().await?;

        Ok(())
    }
}

/// Builds a MongoDB client for the configured target.
async fn build_client(config: &ConnectionConfig) -> Result<Client> {
    let uri = config.connection_uri();

    let mut options = ClientOptions::parse(&uri).await.map_err(|e| {
        OsmLoaderError::connection_failed(
            format!("parsing client options for {}", redact_connection_uri(&uri)),
            e,
        )
    })?;

    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.server_selection_timeout);
    options.app_name = Some(format!("osmloader-{}", env!("CARGO_PKG_VERSION")));

    Client::with_options(options).map_err(|e| {
        OsmLoaderError::connection_failed(
            format!("creating MongoDB client for {}", redact_connection_uri(&uri)),
            e,
        )
    })
}

/// Renders an error with its full source chain on one line.
fn display_chain(error: &OsmLoaderError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl OsmHandler for MongoOsmLoader {
    async fn parse(&mut self, file_path: &Path) -> bool {
        tracing::info!(
            "Parsing '{}' into {}",
            file_path.display(),
            self.config
        );

        match self.try_parse(file_path).await {
            Ok(()) => {
                tracing::info!(
                    "Parsing successful: {}",
                    self.parser_results().trim_end()
                );
                true
            }
            Err(e) => {
                tracing::error!("Parser error: {}", display_chain(&e));
                false
            }
        }
    }

    fn host_name(&self) -> &str {
        &self.config.host
    }

    fn port_number(&self) -> u16 {
        self.config.port
    }

    fn database_name(&self) -> &str {
        &self.config.database
    }

    fn connection_uri(&self) -> String {
        self.config.connection_uri()
    }

    fn parser_results(&self) -> String {
        self.ingest.stats().to_string()
    }
}
