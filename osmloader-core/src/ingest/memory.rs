//! In-memory ingestion sink.
//!
//! Counts and retains elements without touching a database. Backs the
//! CLI's dry-run mode and the test suite.

use crate::ingest::{IngestStats, OsmElement, OsmIngest};
use crate::Result;
use async_trait::async_trait;

/// Sink that keeps every element in memory.
#[derive(Debug, Default)]
pub struct MemoryIngest {
    elements: Vec<OsmElement>,
    stats: IngestStats,
}

impl MemoryIngest {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All elements handled so far, in arrival order.
    pub fn elements(&self) -> &[OsmElement] {
        &self.elements
    }
}

#[async_trait]
impl OsmIngest for MemoryIngest {
    async fn handle_element(&mut self, element: OsmElement) -> Result<()> {
        self.stats.record(&element);
        self.elements.push(element);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> IngestStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Node;

    #[tokio::test]
    async fn test_counts_accumulate_and_never_reset() {
        let mut sink = MemoryIngest::new();
        for id in 0..3 {
            sink.handle_element(OsmElement::Node(Node {
                id,
                lat: 0.0,
                lon: 0.0,
                tags: Vec::new(),
            }))
            .await
            .unwrap();
        }
        sink.finish().await.unwrap();
        assert_eq!(sink.stats().nodes, 3);

        // A second run on the same sink keeps counting upward
        sink.handle_element(OsmElement::Node(Node {
            id: 99,
            lat: 1.0,
            lon: 1.0,
            tags: Vec::new(),
        }))
        .await
        .unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.stats().nodes, 4);
        assert_eq!(sink.elements().len(), 4);
    }
}
