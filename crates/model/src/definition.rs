//! Owned element tree for model documents.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::DocumentError;

/// One XML element with its attributes, trimmed text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<ModelElement>,
}

impl ModelElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a complete XML document and return its root element.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<ModelElement> = Vec::new();
        let mut root: Option<ModelElement> = None;

        loop {
            let event = reader.read_event().map_err(|source| DocumentError::Xml {
                position: reader.buffer_position() as u64,
                source,
            })?;

            match event {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Malformed("unexpected closing tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|source| DocumentError::Xml {
                            position: reader.buffer_position() as u64,
                            source,
                        })?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(text.trim());
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(String::from_utf8_lossy(&data.into_inner()).trim());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(DocumentError::Malformed(format!(
                "unclosed element <{}>",
                open.name
            )));
        }
        root.ok_or_else(|| DocumentError::Malformed("document has no root element".into()))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn child(&self, name: &str) -> Option<&ModelElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ModelElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First element reached by a `/`-separated path of child names.
    pub fn find(&self, path: &str) -> Option<&ModelElement> {
        self.find_all(path).into_iter().next()
    }

    /// Every element reached by a `/`-separated path of child names.
    ///
    /// An empty path selects this element.
    pub fn find_all(&self, path: &str) -> Vec<&ModelElement> {
        let mut current = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter().filter(|c| c.name == segment))
                .collect();
        }
        current
    }

    /// Text of every element reached by `path`, blanks dropped.
    pub fn texts(&self, path: &str) -> Vec<&str> {
        self.find_all(path)
            .into_iter()
            .map(|e| e.text.as_str())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<ModelElement, DocumentError> {
    let mut element = ModelElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DocumentError::Malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DocumentError::Malformed(e.to_string()))?
            .into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

fn attach(
    stack: &mut [ModelElement],
    root: &mut Option<ModelElement>,
    element: ModelElement,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(DocumentError::Malformed(format!(
                "second root element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}

/// A resolved model: the `model` element describing one entity model.
///
/// Read-only once built; shared behind an `Arc` by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    root: ModelElement,
}

impl ModelDefinition {
    pub fn new(root: ModelElement) -> Self {
        Self { root }
    }

    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        ModelElement::parse(xml).map(Self::new)
    }

    pub fn root(&self) -> &ModelElement {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.root.name
    }

    pub fn find(&self, path: &str) -> Option<&ModelElement> {
        self.root.find(path)
    }

    pub fn find_all(&self, path: &str) -> Vec<&ModelElement> {
        self.root.find_all(path)
    }

    pub fn texts(&self, path: &str) -> Vec<&str> {
        self.root.texts(path)
    }
}
