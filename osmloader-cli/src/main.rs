//! OSM-to-MongoDB loading tool.
//!
//! Command-line host for the handler contract: builds a loader from the
//! connection parameters, drives one `parse` call, and prints the
//! resulting element counters.

use clap::{Args, Parser};
use osmloader_core::{
    create_handler, error::redact_connection_uri, init_logging, loader::MongoOsmLoader,
    MemoryIngest, OsmHandler, Result,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "osmloader")]
#[command(about = "Load OpenStreetMap XML into MongoDB")]
#[command(version)]
#[command(long_about = "
osmloader - OpenStreetMap XML ingestion into MongoDB

Streams an OSM XML file and bulk-inserts its nodes, ways and relations
into the 'nodes', 'ways' and 'relations' collections of the target
database. Prints the element counters when the run completes.

EXAMPLES:
  osmloader --database osm map.osm
  osmloader --host db.example.com --port 37017 --database osm map.osm
  osmloader --dry-run --database osm map.osm
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// OSM XML file to load
    #[arg(help = "Path to the OSM XML file")]
    file: PathBuf,

    /// Database host address
    #[arg(long, env = "OSMLOADER_HOST", default_value = "localhost")]
    host: String,

    /// Database port
    #[arg(long, env = "OSMLOADER_PORT", default_value = "27017")]
    port: u16,

    /// Database to write into
    #[arg(long, env = "OSMLOADER_DATABASE")]
    database: String,

    /// Count elements without writing to the database
    #[arg(long, help = "Parse and count only; nothing is inserted")]
    dry_run: bool,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let mut handler: Box<dyn OsmHandler> = if cli.dry_run {
        info!("Dry run: counting elements only");
        Box::new(MongoOsmLoader::with_ingest(
            &cli.host,
            cli.port,
            &cli.database,
            Box::new(MemoryIngest::new()),
        )?)
    } else {
        create_handler(&cli.host, cli.port, &cli.database)
            .await
            .map_err(|e| {
                error!("Failed to create handler: {}", e);
                e
            })?
    };

    info!(
        "Target: {} (database '{}')",
        redact_connection_uri(&handler.connection_uri()),
        handler.database_name()
    );

    let ok = handler.parse(&cli.file).await;
    print!("{}", handler.parser_results());

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}
