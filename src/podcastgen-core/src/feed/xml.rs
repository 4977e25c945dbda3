//! Minimal ordered XML element tree.
//!
//! Just enough DOM to read an existing feed, edit it, and write it back with
//! stable attribute and child order. Qualified names such as `itunes:author`
//! are kept verbatim; namespace declarations are ordinary attributes.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::FeedError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element holding a single text node (no node at all for empty text).
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut elem = Self::new(name);
        elem.set_text(text);
        elem
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing the value in place if it already exists.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(elem) => Some(elem),
            XmlNode::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(elem) if elem.name == name => Some(elem),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.child_elements().filter(move |e| e.name == name)
    }

    /// Concatenated direct text content, or `None` when there is none.
    pub fn text(&self) -> Option<String> {
        let mut out = String::new();
        let mut found = false;
        for node in &self.children {
            if let XmlNode::Text(text) = node {
                out.push_str(text);
                found = true;
            }
        }
        found.then_some(out)
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
    }

    /// Text of the named child, if the child exists and has text.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).and_then(XmlElement::text)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FeedError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut pending = String::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    flush_text(&mut stack, &mut pending);
                    stack.push(element_from_start(&e)?);
                }
                Event::Empty(e) => {
                    flush_text(&mut stack, &mut pending);
                    let elem = element_from_start(&e)?;
                    attach(&mut stack, &mut root, elem)?;
                }
                Event::End(_) => {
                    flush_closing_text(&mut stack, &mut pending);
                    let elem = stack
                        .pop()
                        .ok_or_else(|| FeedError::Structure("unbalanced closing tag".into()))?;
                    attach(&mut stack, &mut root, elem)?;
                }
                Event::Text(e) => {
                    if !stack.is_empty() {
                        pending.push_str(&e.decode().map_err(quick_xml::Error::Encoding)?);
                    }
                }
                Event::CData(e) => {
                    if !stack.is_empty() {
                        pending.push_str(std::str::from_utf8(&e.into_inner())?);
                    }
                }
                Event::GeneralRef(e) if !stack.is_empty() => {
                    if let Some(ch) = e.resolve_char_ref()? {
                        pending.push(ch);
                    } else {
                        let name = e.decode().map_err(quick_xml::Error::Encoding)?;
                        let resolved = resolve_predefined_entity(&name).ok_or_else(|| {
                            FeedError::Structure(format!("unknown entity &{};", name))
                        })?;
                        pending.push_str(resolved);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(FeedError::Structure("document ended inside an element".into()));
        }
        root.ok_or_else(|| FeedError::Structure("document has no root element".into()))
    }

    /// Serialize with an XML declaration and two-space indentation.
    pub fn to_pretty_bytes(&self) -> Result<Vec<u8>, FeedError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.write_into(&mut writer)?;
        let mut out = writer.into_inner();
        out.push(b'\n');
        Ok(out)
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), FeedError> {
        let start = BytesStart::new(self.name.as_str()).with_attributes(
            self.attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                XmlNode::Element(child) => child.write_into(writer)?,
                XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, FeedError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut elem = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        elem.attributes.push((key, value));
    }
    Ok(elem)
}

/// Move accumulated text into the innermost open element. Whitespace-only
/// runs next to child elements are indentation and are dropped.
fn flush_text(stack: &mut [XmlElement], pending: &mut String) {
    push_text(stack, pending, false);
}

/// Like [`flush_text`], but a whitespace-only run that is the element's
/// sole content is its value and is kept.
fn flush_closing_text(stack: &mut [XmlElement], pending: &mut String) {
    let sole_content = stack.last().is_some_and(|e| e.children.is_empty());
    push_text(stack, pending, sole_content);
}

fn push_text(stack: &mut [XmlElement], pending: &mut String, keep_whitespace: bool) {
    if pending.is_empty() {
        return;
    }
    let text = std::mem::take(pending);
    if !keep_whitespace && text.trim().is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Text(text));
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    elem: XmlElement,
) -> Result<(), FeedError> {
    match stack.last_mut() {
        Some(parent) => parent.push(elem),
        None if root.is_none() => *root = Some(elem),
        None => return Err(FeedError::Structure("multiple root elements".into())),
    }
    Ok(())
}
