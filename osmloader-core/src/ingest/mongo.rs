//! MongoDB-backed ingestion sink.
//!
//! Converts parsed elements into BSON documents and bulk-inserts them
//! into the `nodes`, `ways` and `relations` collections of the target
//! database. Documents are buffered per kind and written whenever a
//! buffer reaches the batch size, plus a final flush on [`OsmIngest::finish`].

use crate::error::OsmLoaderError;
use crate::ingest::{IngestStats, Node, OsmElement, OsmIngest, Relation, Way};
use crate::Result;
use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::Client;

/// Number of documents buffered per kind before a bulk insert.
const DEFAULT_BATCH_SIZE: usize = 1000;

/// Sink that writes elements into MongoDB collections.
pub struct MongoIngestor {
    database: mongodb::Database,
    batch_size: usize,
    nodes: Vec<Document>,
    ways: Vec<Document>,
    relations: Vec<Document>,
    stats: IngestStats,
}

impl std::fmt::Debug for MongoIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoIngestor")
            .field("database", &self.database.name())
            .field("batch_size", &self.batch_size)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl MongoIngestor {
    /// Creates a sink writing into the given database.
    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            database: client.database(database),
            batch_size: DEFAULT_BATCH_SIZE,
            nodes: Vec::new(),
            ways: Vec::new(),
            relations: Vec::new(),
            stats: IngestStats::default(),
        }
    }

    /// Builder method to override the bulk insert batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn flush_nodes(&mut self) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.nodes);
        insert_batch(&self.database, "nodes", batch).await
    }

    async fn flush_ways(&mut self) -> Result<()> {
        if self.ways.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.ways);
        insert_batch(&self.database, "ways", batch).await
    }

    async fn flush_relations(&mut self) -> Result<()> {
        if self.relations.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.relations);
        insert_batch(&self.database, "relations", batch).await
    }
}

async fn insert_batch(
    database: &mongodb::Database,
    collection: &str,
    batch: Vec<Document>,
) -> Result<()> {
    let count = batch.len();
    database
        .collection::<Document>(collection)
        .insert_many(batch)
        .await
        .map_err(|e| {
            OsmLoaderError::ingest_failed(
                format!("inserting {} documents into '{}'", count, collection),
                e,
            )
        })?;

    tracing::debug!("Inserted {} documents into '{}'", count, collection);
    Ok(())
}

#[async_trait]
impl OsmIngest for MongoIngestor {
    async fn handle_element(&mut self, element: OsmElement) -> Result<()> {
        self.stats.record(&element);

        match element {
            OsmElement::Node(node) => {
                self.nodes.push(node_document(&node));
                if self.nodes.len() >= self.batch_size {
                    self.flush_nodes().await?;
                }
            }
            OsmElement::Way(way) => {
                self.ways.push(way_document(&way));
                if self.ways.len() >= self.batch_size {
                    self.flush_ways().await?;
                }
            }
            OsmElement::Relation(relation) => {
                self.relations.push(relation_document(&relation));
                if self.relations.len() >= self.batch_size {
                    self.flush_relations().await?;
                }
            }
        }

        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.flush_nodes().await?;
        self.flush_ways().await?;
        self.flush_relations().await?;
        Ok(())
    }

    fn stats(&self) -> IngestStats {
        self.stats
    }
}

fn tags_document(tags: &[(String, String)]) -> Document {
    let mut doc = Document::new();
    for (key, value) in tags {
        doc.insert(key.clone(), value.clone());
    }
    doc
}

fn node_document(node: &Node) -> Document {
    doc! {
        "_id": node.id,
        "loc": {
            "type": "Point",
            "coordinates": [node.lon, node.lat],
        },
        "tags": tags_document(&node.tags),
    }
}

fn way_document(way: &Way) -> Document {
    doc! {
        "_id": way.id,
        "nodes": way.node_refs.clone(),
        "tags": tags_document(&way.tags),
    }
}

fn relation_document(relation: &Relation) -> Document {
    let members: Vec<Bson> = relation
        .members
        .iter()
        .map(|m| {
            Bson::Document(doc! {
                "type": m.member_type.clone(),
                "ref": m.member_ref,
                "role": m.role.clone(),
            })
        })
        .collect();

    doc! {
        "_id": relation.id,
        "members": members,
        "tags": tags_document(&relation.tags),
    }
}
