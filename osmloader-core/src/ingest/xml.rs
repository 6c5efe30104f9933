//! Streaming OSM XML reader.
//!
//! Scans an OSM XML document event by event and forwards each completed
//! `node`, `way` or `relation` element to an [`OsmIngest`] sink. Child
//! elements (`tag`, `nd`, `member`) are collected into the enclosing
//! element; everything else (`bounds`, the `osm` wrapper, text nodes) is
//! skipped.

use crate::error::OsmLoaderError;
use crate::ingest::{Node, OsmElement, OsmIngest, Relation, RelationMember, Way};
use crate::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::io::AsyncBufRead;

/// An element currently being assembled from nested child elements.
enum Pending {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Pending {
    fn element_name(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Way(_) => "way",
            Self::Relation(_) => "relation",
        }
    }

    fn into_element(self) -> OsmElement {
        match self {
            Self::Node(node) => OsmElement::Node(node),
            Self::Way(way) => OsmElement::Way(way),
            Self::Relation(relation) => OsmElement::Relation(relation),
        }
    }
}

/// Streams OSM XML from `reader` into `sink`.
///
/// The sink's counters advance as elements are handed over, so a failure
/// partway through leaves the counts of everything already handled in
/// place. The sink is not flushed here; the caller decides when the run
/// is complete and calls [`OsmIngest::finish`].
///
/// # Errors
/// Returns error if the document is not well-formed XML, if a recognized
/// element carries missing or malformed attributes, or if the sink
/// rejects an element
pub async fn stream_elements<R, S>(reader: R, sink: &mut S) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send,
    S: OsmIngest + ?Sized,
{
    let mut xml = Reader::from_reader(reader);
    let mut buf = Vec::new();
    let mut pending: Option<Pending> = None;

    loop {
        let event = xml
            .read_event_into_async(&mut buf)
            .await
            .map_err(|e| OsmLoaderError::parse_failed("reading XML event", e))?;

        match event {
            Event::Start(start) => {
                handle_open(&start, &mut pending, false)?;
            }
            Event::Empty(start) => {
                if let Some(element) = handle_open(&start, &mut pending, true)? {
                    sink.handle_element(element).await?;
                }
            }
            Event::End(end) => {
                if let Some(open) = pending.take() {
                    if open.element_name().as_bytes() == end.local_name().as_ref() {
                        sink.handle_element(open.into_element()).await?;
                    } else {
                        // closing a child element; the top-level one stays open
                        pending = Some(open);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if let Some(open) = pending {
        return Err(OsmLoaderError::malformed(format!(
            "document ended inside an unclosed <{}> element",
            open.element_name()
        )));
    }

    Ok(())
}

/// Handles an opening (or self-closing) tag, either starting a new
/// top-level element or attaching a child to the pending one.
///
/// Returns the completed element when a self-closing top-level tag is
/// seen.
fn handle_open(
    start: &BytesStart<'_>,
    pending: &mut Option<Pending>,
    self_closing: bool,
) -> Result<Option<OsmElement>> {
    match start.local_name().as_ref() {
        b"node" => {
            let node = Node {
                id: required_attr(start, "id", "node")?.parse().map_err(|e| {
                    OsmLoaderError::parse_failed("parsing 'id' attribute on <node>", e)
                })?,
                lat: required_attr(start, "lat", "node")?.parse().map_err(|e| {
                    OsmLoaderError::parse_failed("parsing 'lat' attribute on <node>", e)
                })?,
                lon: required_attr(start, "lon", "node")?.parse().map_err(|e| {
                    OsmLoaderError::parse_failed("parsing 'lon' attribute on <node>", e)
                })?,
                tags: Vec::new(),
            };
            open_element(pending, Pending::Node(node), self_closing)
        }
        b"way" => {
            let way = Way {
                id: required_attr(start, "id", "way")?.parse().map_err(|e| {
                    OsmLoaderError::parse_failed("parsing 'id' attribute on <way>", e)
                })?,
                node_refs: Vec::new(),
                tags: Vec::new(),
            };
            open_element(pending, Pending::Way(way), self_closing)
        }
        b"relation" => {
            let relation = Relation {
                id: required_attr(start, "id", "relation")?.parse().map_err(|e| {
                    OsmLoaderError::parse_failed("parsing 'id' attribute on <relation>", e)
                })?,
                members: Vec::new(),
                tags: Vec::new(),
            };
            open_element(pending, Pending::Relation(relation), self_closing)
        }
        b"tag" => {
            if let Some(open) = pending.as_mut() {
                let key = required_attr(start, "k", "tag")?;
                let value = required_attr(start, "v", "tag")?;
                match open {
                    Pending::Node(node) => node.tags.push((key, value)),
                    Pending::Way(way) => way.tags.push((key, value)),
                    Pending::Relation(relation) => relation.tags.push((key, value)),
                }
            }
            Ok(None)
        }
        b"nd" => {
            if let Some(Pending::Way(way)) = pending.as_mut() {
                let node_ref = required_attr(start, "ref", "nd")?.parse().map_err(|e| {
                    OsmLoaderError::parse_failed("parsing 'ref' attribute on <nd>", e)
                })?;
                way.node_refs.push(node_ref);
            }
            Ok(None)
        }
        b"member" => {
            if let Some(Pending::Relation(relation)) = pending.as_mut() {
                let member = RelationMember {
                    member_type: required_attr(start, "type", "member")?,
                    member_ref: required_attr(start, "ref", "member")?.parse().map_err(
                        |e| OsmLoaderError::parse_failed("parsing 'ref' attribute on <member>", e),
                    )?,
                    role: optional_attr(start, "role")?.unwrap_or_default(),
                };
                relation.members.push(member);
            }
            Ok(None)
        }
        // <osm> wrapper, <bounds>, changeset metadata and anything else
        _ => Ok(None),
    }
}

fn open_element(
    pending: &mut Option<Pending>,
    next: Pending,
    self_closing: bool,
) -> Result<Option<OsmElement>> {
    if let Some(open) = pending.as_ref() {
        return Err(OsmLoaderError::malformed(format!(
            "<{}> opened inside an unclosed <{}> element",
            next.element_name(),
            open.element_name()
        )));
    }

    if self_closing {
        Ok(Some(next.into_element()))
    } else {
        *pending = Some(next);
        Ok(None)
    }
}

/// Reads an attribute that must be present, unescaping its value.
fn required_attr(start: &BytesStart<'_>, name: &str, element: &str) -> Result<String> {
    optional_attr(start, name)?.ok_or_else(|| {
        OsmLoaderError::malformed(format!(
            "<{element}> element is missing required '{name}' attribute"
        ))
    })
}

fn optional_attr(start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    let attr = start.try_get_attribute(name).map_err(|e| {
        OsmLoaderError::parse_failed(format!("reading '{name}' attribute"), e)
    })?;

    attr.map(|a| {
        a.unescape_value()
            .map(|v| v.into_owned())
            .map_err(|e| OsmLoaderError::parse_failed(format!("unescaping '{name}' attribute"), e))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::MemoryIngest;

    async fn scan(xml: &str) -> Result<MemoryIngest> {
        let mut sink = MemoryIngest::new();
        stream_elements(xml.as_bytes(), &mut sink).await?;
        Ok(sink)
    }

    #[tokio::test]
    async fn test_counts_all_three_kinds() {
        let sink = scan(concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<osm version="0.6">"#,
            r#"<bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>"#,
            r#"<node id="1" lat="51.5" lon="-0.1"/>"#,
            r#"<node id="2" lat="51.6" lon="-0.2"/>"#,
            r#"<node id="3" lat="51.7" lon="-0.3"/>"#,
            r#"<way id="10"><nd ref="1"/><nd ref="2"/></way>"#,
            r#"<way id="11"><nd ref="2"/><nd ref="3"/></way>"#,
            r#"<relation id="20"><member type="way" ref="10" role="outer"/></relation>"#,
            r#"</osm>"#,
        ))
        .await
        .unwrap();

        let stats = sink.stats();
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.ways, 2);
        assert_eq!(stats.relations, 1);
    }

    #[tokio::test]
    async fn test_node_attributes_and_tags() {
        let sink = scan(concat!(
            r#"<osm><node id="42" lat="48.8584" lon="2.2945">"#,
            r#"<tag k="name" v="Tour Eiffel"/>"#,
            r#"<tag k="tourism" v="attraction"/>"#,
            r#"</node></osm>"#,
        ))
        .await
        .unwrap();

        let elements = sink.elements();
        assert_eq!(elements.len(), 1);
        let OsmElement::Node(node) = &elements[0] else {
            panic!("expected a node");
        };
        assert_eq!(node.id, 42);
        assert!((node.lat - 48.8584).abs() < 1e-9);
        assert!((node.lon - 2.2945).abs() < 1e-9);
        assert_eq!(
            node.tags,
            vec![
                ("name".to_string(), "Tour Eiffel".to_string()),
                ("tourism".to_string(), "attraction".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_way_node_refs_keep_order() {
        let sink = scan(r#"<osm><way id="7"><nd ref="3"/><nd ref="1"/><nd ref="2"/></way></osm>"#)
            .await
            .unwrap();

        let OsmElement::Way(way) = &sink.elements()[0] else {
            panic!("expected a way");
        };
        assert_eq!(way.node_refs, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_relation_members() {
        let sink = scan(concat!(
            r#"<osm><relation id="9">"#,
            r#"<member type="node" ref="1" role="stop"/>"#,
            r#"<member type="way" ref="10" role=""/>"#,
            r#"<tag k="type" v="route"/>"#,
            r#"</relation></osm>"#,
        ))
        .await
        .unwrap();

        let OsmElement::Relation(relation) = &sink.elements()[0] else {
            panic!("expected a relation");
        };
        assert_eq!(relation.members.len(), 2);
        assert_eq!(relation.members[0].member_type, "node");
        assert_eq!(relation.members[0].member_ref, 1);
        assert_eq!(relation.members[0].role, "stop");
        assert_eq!(relation.members[1].role, "");
        assert_eq!(relation.tags, vec![("type".to_string(), "route".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_attribute_is_an_error() {
        let result = scan(r#"<osm><node id="1" lat="51.5"/></osm>"#).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("lon"));
    }

    #[tokio::test]
    async fn test_malformed_number_is_an_error() {
        let result = scan(r#"<osm><node id="abc" lat="51.5" lon="0.0"/></osm>"#).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_truncated_document_is_an_error() {
        let result = scan(r#"<osm><node id="1" lat="51.5" lon="0.0">"#).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_nested_top_level_element_is_an_error() {
        let result =
            scan(r#"<osm><way id="1"><node id="2" lat="0" lon="0"/></way></osm>"#).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_elements_are_skipped() {
        let sink = scan(concat!(
            r#"<osm generator="test">"#,
            r#"<note>fixture</note>"#,
            r#"<node id="1" lat="0.5" lon="0.5"/>"#,
            r#"</osm>"#,
        ))
        .await
        .unwrap();

        assert_eq!(sink.stats().nodes, 1);
    }
}
