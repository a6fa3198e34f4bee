//! Build an [`XmlDocument`] from quick-xml events.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::dom::{Attr, NodeData, NodeId, XmlDocument};
use crate::error::{Error, Result};
use crate::util::{decode_entities, resolve_entity};

impl XmlDocument {
    /// Parse a part. Whitespace is preserved exactly; entity references are
    /// resolved into the text they stand for.
    pub fn parse(xml: &str) -> Result<Self> {
        let (prolog, body) = split_prolog(xml);

        let mut doc = XmlDocument::new();
        doc.prolog = prolog.to_string();

        let mut reader = Reader::from_str(body);
        let mut stack: Vec<NodeId> = vec![doc.document()];

        loop {
            let parent = stack.last().copied().unwrap_or(NodeId::NONE);
            match reader.read_event()? {
                Event::Start(e) => {
                    let el = doc.create_node(element_data(&e, false)?);
                    doc.append(parent, el);
                    stack.push(el);
                }
                Event::Empty(e) => {
                    let el = doc.create_node(element_data(&e, true)?);
                    doc.append(parent, el);
                }
                Event::End(_) => {
                    if stack.len() <= 1 {
                        return Err(Error::MalformedXml("unexpected closing tag".into()));
                    }
                    stack.pop();
                }
                Event::Text(e) => {
                    append_text(&mut doc, parent, &String::from_utf8_lossy(e.as_ref()));
                }
                Event::GeneralRef(e) => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    let resolved = resolve_entity(&entity).ok_or_else(|| {
                        Error::MalformedXml(format!("unknown entity &{entity};"))
                    })?;
                    append_text(&mut doc, parent, &resolved);
                }
                Event::CData(e) => {
                    let node = doc.create_node(NodeData::CData(
                        String::from_utf8_lossy(e.as_ref()).into_owned(),
                    ));
                    doc.append(parent, node);
                }
                Event::Comment(e) => {
                    let node = doc.create_node(NodeData::Comment(
                        String::from_utf8_lossy(e.as_ref()).into_owned(),
                    ));
                    doc.append(parent, node);
                }
                Event::PI(e) => {
                    let node = doc.create_node(NodeData::ProcessingInstruction(
                        String::from_utf8_lossy(e.as_ref()).into_owned(),
                    ));
                    doc.append(parent, node);
                }
                Event::DocType(e) => {
                    let node = doc.create_node(NodeData::DocType(
                        String::from_utf8_lossy(e.as_ref()).into_owned(),
                    ));
                    doc.append(parent, node);
                }
                // A declaration not at the very start; the prolog already holds the real one.
                Event::Decl(_) => {}
                Event::Eof => break,
            }
        }

        if stack.len() > 1 {
            return Err(Error::MalformedXml("unclosed element at end of input".into()));
        }
        if doc.root().is_none() {
            return Err(Error::MalformedXml("document has no root element".into()));
        }

        Ok(doc)
    }
}

/// Split off a leading `<?xml ...?>` declaration (and BOM).
fn split_prolog(xml: &str) -> (&str, &str) {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    if xml.starts_with("<?xml")
        && let Some(end) = xml.find("?>")
    {
        return xml.split_at(end + 2);
    }
    ("", xml)
}

fn element_data(e: &BytesStart<'_>, self_closing: bool) -> Result<NodeData> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::MalformedXml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        attrs.push(Attr::new(key, decode_entities(&raw).into_owned()));
    }
    Ok(NodeData::Element {
        name,
        attrs,
        self_closing,
    })
}

/// Append text, merging with a preceding text node so that entity
/// references do not fragment one logical string.
fn append_text(doc: &mut XmlDocument, parent: NodeId, text: &str) {
    let last = doc.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);
    if let Some(node) = doc.get_mut(last)
        && let NodeData::Text(existing) = &mut node.data
    {
        existing.push_str(text);
        return;
    }
    let node = doc.create_text(text);
    doc.append(parent, node);
}
