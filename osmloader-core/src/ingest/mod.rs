//! OSM ingestion delegate: element model, statistics, and sinks.
//!
//! # Module Structure
//! - `xml`: streaming OSM XML reader that feeds elements into a sink
//! - `mongo`: MongoDB-backed sink that bulk-inserts parsed elements
//! - `memory`: in-memory sink for counting runs and tests
//!
//! The loader never touches the statistics counters itself; they belong
//! to the sink and reflect whatever the sink has seen so far, including
//! partial progress from a failed run.

pub mod memory;
pub mod mongo;
pub mod xml;

use crate::Result;
use async_trait::async_trait;

pub use memory::MemoryIngest;
pub use mongo::MongoIngestor;
pub use xml::stream_elements;

/// A single OSM node: a point with coordinates and tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// OSM element identifier
    pub id: i64,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Key/value tags in document order
    pub tags: Vec<(String, String)>,
}

/// A single OSM way: an ordered sequence of node references.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// OSM element identifier
    pub id: i64,
    /// Ordered node references
    pub node_refs: Vec<i64>,
    /// Key/value tags in document order
    pub tags: Vec<(String, String)>,
}

/// A member entry of an OSM relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationMember {
    /// Member kind ("node", "way" or "relation")
    pub member_type: String,
    /// Referenced element identifier
    pub member_ref: i64,
    /// Role of the member within the relation
    pub role: String,
}

/// A single OSM relation: grouped references with roles.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// OSM element identifier
    pub id: i64,
    /// Relation members in document order
    pub members: Vec<RelationMember>,
    /// Key/value tags in document order
    pub tags: Vec<(String, String)>,
}

/// One parsed OSM element of any of the three primitive kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum OsmElement {
    /// A point element
    Node(Node),
    /// An ordered node sequence
    Way(Way),
    /// A grouped reference element
    Relation(Relation),
}

/// Running element counters owned by an ingestion sink.
///
/// Counters accumulate for the lifetime of the sink; sinks never reset
/// them between runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// Number of nodes handled
    pub nodes: u64,
    /// Number of ways handled
    pub ways: u64,
    /// Number of relations handled
    pub relations: u64,
}

impl IngestStats {
    /// Records one element of the matching kind.
    pub fn record(&mut self, element: &OsmElement) {
        match element {
            OsmElement::Node(_) => self.nodes += 1,
            OsmElement::Way(_) => self.ways += 1,
            OsmElement::Relation(_) => self.relations += 1,
        }
    }
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} Nodes, {} Ways, {} Relations",
            self.nodes, self.ways, self.relations
        )
    }
}

/// Sink interface the loader delegates parsed elements to.
///
/// # Object Safety
/// This trait is object-safe; the loader holds its delegate as
/// `Box<dyn OsmIngest>`.
#[async_trait]
pub trait OsmIngest: Send {
    /// Handles one parsed element.
    ///
    /// Implementations update their counters as elements arrive, so a
    /// later failure leaves the counts of everything handled so far in
    /// place.
    ///
    /// # Errors
    /// Returns error if the element cannot be accepted (for the MongoDB
    /// sink, if a batch write fails)
    async fn handle_element(&mut self, element: OsmElement) -> Result<()>;

    /// Flushes any buffered elements at the end of a run.
    ///
    /// # Errors
    /// Returns error if flushing buffered elements fails
    async fn finish(&mut self) -> Result<()>;

    /// Returns the current counters.
    fn stats(&self) -> IngestStats;
}
