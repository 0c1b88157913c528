//! A small owned XML tree on top of `quick-xml`.
//!
//! WSDL patching needs to edit a document and write it back out, and SOAP
//! responses have to be walked with namespace resolution, so both go through
//! this model rather than through raw reader events.

use std::{
    fmt,
    io::{Cursor, Write},
};

pub use quick_xml::{events, Reader, Writer};

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use thiserror::Error;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Deepest element nesting [`Document::parse`] accepts.
pub const MAX_DEPTH: usize = 2048;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error parsing XML input")]
    XmlParseError(#[from] quick_xml::Error),

    #[error("Unable to write XML output")]
    XmlWriteError(#[source] quick_xml::Error),

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Unexpected content outside the root element")]
    ContentOutsideRoot,

    #[error("Closing tag without a matching opening tag")]
    UnbalancedEnd,

    #[error("Document ended inside <{0}>")]
    UnexpectedEof(String),

    #[error("Elements are nested more than {0} levels deep")]
    TooDeep(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

/// A namespace-qualified name, e.g. `{http://www.w3.org/2001/XMLSchema}string`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

/// Prefix bindings in effect at some point of a document.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: Vec<(Option<String>, String)>,
}

pub fn split_qname(prefixed_name: &str) -> (Option<&str>, &str) {
    match prefixed_name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, prefixed_name),
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), Error> {
    writer.write_event(event).map_err(Error::XmlWriteError)
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn parse(input: &[u8]) -> Result<Self, Error> {
        let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);

        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);
        reader.expand_empty_elements(true);

        let mut buffer = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let node = match reader.read_event(&mut buffer)? {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(Error::ContentOutsideRoot);
                    }

                    if stack.len() >= MAX_DEPTH {
                        return Err(Error::TooDeep(MAX_DEPTH));
                    }

                    stack.push(Element::from_start(&reader, &start)?);
                    None
                }

                Event::End(..) => {
                    let element = stack.pop().ok_or(Error::UnbalancedEnd)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                    None
                }

                Event::Text(text) => Some(Node::Text(text.unescape_and_decode(&reader)?)),
                Event::CData(text) => Some(Node::CData(reader.decode(&text)?.to_owned())),
                Event::Comment(text) => Some(Node::Comment(reader.decode(&text)?.to_owned())),

                Event::Eof => break,

                _ => None,
            };

            if let Some(node) = node {
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None if matches!(node, Node::Comment(_)) => (),
                    None => return Err(Error::ContentOutsideRoot),
                }
            }

            buffer.clear();
        }

        if let Some(open) = stack.pop() {
            return Err(Error::UnexpectedEof(open.name));
        }

        root.map(Self::new).ok_or(Error::MissingRoot)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new(b"1.0", Some(b"UTF-8"), None)),
        )?;
        self.root.write(&mut writer)?;
        Ok(writer.into_inner().into_inner())
    }
}

impl Element {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    fn from_start(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Self, Error> {
        let mut element = Self::new(reader.decode(start.name())?);

        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = reader.decode(attribute.key)?.to_owned();
            let value = attribute.unescape_and_decode_value(reader)?;
            element.attributes.push((key, value));
        }

        Ok(element)
    }

    fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        let mut start = BytesStart::borrowed_name(self.name.as_bytes());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return emit(writer, Event::Empty(start));
        }

        emit(writer, Event::Start(start.to_borrowed()))?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write(writer)?,
                Node::Text(text) => emit(writer, Event::Text(BytesText::from_plain_str(text)))?,
                Node::CData(text) => {
                    emit(writer, Event::CData(BytesText::from_escaped_str(text.as_str())))?
                }
                Node::Comment(text) => {
                    emit(writer, Event::Comment(BytesText::from_escaped_str(text.as_str())))?
                }
            }
        }
        emit(writer, Event::End(start.to_end()))
    }

    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Namespace of this element. `scope` must already include this
    /// element's own declarations (see [`Scope::enter`]).
    pub fn namespace<'s>(&self, scope: &'s Scope) -> Option<&'s str> {
        scope.resolve(self.prefix())
    }

    pub fn is(&self, scope: &Scope, namespace: &str, local_name: &str) -> bool {
        self.local_name() == local_name && self.namespace(scope) == Some(namespace)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes_named<const N: usize>(&self, names: [&str; N]) -> [Option<String>; N] {
        const INIT: Option<String> = None;
        let mut result = [INIT; N];

        for (index, name) in names.iter().enumerate() {
            result[index] = self.attribute(name).map(ToOwned::to_owned);
        }

        result
    }

    /// Looks up a namespaced attribute such as `xsi:type`, whatever prefix the
    /// document happens to bind.
    pub fn attribute_ns(&self, scope: &Scope, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes.iter().find_map(|(key, value)| match split_qname(key) {
            (Some("xmlns"), _) => None,
            (Some(prefix), local) if local == local_name => {
                (scope.resolve(Some(prefix)) == Some(namespace)).then(|| value.as_str())
            }
            _ => None,
        })
    }

    pub fn namespace_declarations(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.attributes
            .iter()
            .filter_map(|(key, value)| match split_qname(key) {
                (None, "xmlns") => Some((None, value.as_str())),
                (Some("xmlns"), prefix) => Some((Some(prefix), value.as_str())),
                _ => None,
            })
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.child_elements()
            .find(|element| element.local_name() == local_name)
    }

    pub fn has_child_elements(&self) -> bool {
        self.child_elements().next().is_some()
    }

    /// Concatenated text of all descendants, in document order.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, text: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(element) => element.collect_text(text),
                Node::Text(value) | Node::CData(value) => text.push_str(value),
                Node::Comment(_) => (),
            }
        }
    }
}

impl QName {
    pub fn new<N: Into<String>, L: Into<String>>(namespace: N, local: L) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace == namespace && self.local == local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local)
    }
}

impl Scope {
    pub fn enter(&self, element: &Element) -> Scope {
        let mut scope = self.clone();
        for (prefix, namespace) in element.namespace_declarations() {
            scope
                .bindings
                .push((prefix.map(ToOwned::to_owned), namespace.to_owned()));
        }
        scope
    }

    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }

        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound.as_deref() == prefix)
            .map(|(_, namespace)| namespace.as_str())
            .filter(|namespace| !namespace.is_empty())
    }

    /// Resolves `prefix:local`. Unprefixed names take the default namespace,
    /// or no namespace at all when none is declared.
    pub fn resolve_qname(&self, prefixed_name: &str) -> Option<QName> {
        let (prefix, local) = split_qname(prefixed_name);

        match (prefix, self.resolve(prefix)) {
            (_, Some(namespace)) => Some(QName::new(namespace, local)),
            (None, None) => Some(QName::new("", local)),
            (Some(_), None) => None,
        }
    }

    /// The prefix currently bound to `namespace`: `Some(None)` for the default
    /// namespace, `None` when it is not bound at all.
    pub fn prefix_for(&self, namespace: &str) -> Option<Option<&str>> {
        self.bindings
            .iter()
            .rev()
            .map(|(prefix, _)| prefix.as_deref())
            .find(|prefix| self.resolve(*prefix) == Some(namespace))
    }
}
