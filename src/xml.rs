//! XML parsing and serialization utilities.
//!
//! Uses quick-xml, which never expands external entities. DOCTYPE and entity
//! declarations are additionally rejected before parsing.

use crate::error::{MapperError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Comment text that SOAP template generators place before elements that may
/// repeat ("Zero or more repetitions:", "1 or more repetitions:").
const REPETITION_MARKER: &str = "or more repetitions";

/// Key holding element attributes in the JSON view.
pub const ATTRIBUTES_KEY: &str = "$";
/// Key holding element text in the JSON view when the element also has
/// attributes or children.
pub const TEXT_KEY: &str = "_";

/// Options for reading XML into an element tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject documents carrying DOCTYPE or entity declarations.
    pub reject_doctype: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            reject_doctype: true,
        }
    }
}

/// Options for the JSON view of an element tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueOptions {
    /// Wrap every child element in an array, even when it occurs once.
    pub explicit_array: bool,
    /// Drop namespace prefixes from element names.
    pub strip_prefixes: bool,
}

/// A namespace declaration found on a root element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlnsAttribute {
    pub name: String,
    pub value: String,
}

impl XmlnsAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parsed XML element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    /// Qualified element name as written (`prefix:Local`)
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
    /// Trimmed text and CDATA content
    pub text: Option<String>,
    /// Preceded by a repetition comment in the source document
    pub repeatable: bool,
}

impl XmlElement {
    /// Element name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// First child whose local name matches.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    /// Namespace declarations (`xmlns`, `xmlns:*`) in document order.
    pub fn xmlns_attributes(&self) -> Vec<XmlnsAttribute> {
        self.attributes
            .iter()
            .filter(|(name, _)| name == "xmlns" || name.starts_with("xmlns:"))
            .map(|(name, value)| XmlnsAttribute::new(name.clone(), value.clone()))
            .collect()
    }

    /// JSON view of the element, keyed by its own name.
    ///
    /// Attributes land under `"$"`, text-only elements become strings and
    /// empty elements become `""`. Children are grouped by name in document
    /// order; repeated children always become arrays.
    pub fn to_value(&self, options: &ValueOptions) -> Value {
        let mut root = Map::new();
        root.insert(element_name(&self.name, options), self.node_value(options));
        Value::Object(root)
    }

    fn node_value(&self, options: &ValueOptions) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            return Value::String(self.text.clone().unwrap_or_default());
        }

        let mut node = Map::new();
        if !self.attributes.is_empty() {
            let attributes = self
                .attributes
                .iter()
                .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                .collect();
            node.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
        }
        if let Some(ref text) = self.text {
            node.insert(TEXT_KEY.to_string(), Value::String(text.clone()));
        }

        for child in &self.children {
            let name = element_name(&child.name, options);
            let value = child.node_value(options);
            match node.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None if options.explicit_array => {
                    node.insert(name, Value::Array(vec![value]));
                }
                None => {
                    node.insert(name, value);
                }
            }
        }

        Value::Object(node)
    }
}

/// Parse an XML document into an element tree.
pub fn parse_document(xml: &str, options: &ParseOptions) -> Result<XmlElement> {
    if options.reject_doctype {
        check_declarations(xml)?;
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut pending_repeatable = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(MapperError::XmlParse(
                        "content found after the root element".to_string(),
                    ));
                }
                let mut element = start_element(e)?;
                element.repeatable = std::mem::take(&mut pending_repeatable);
                stack.push(element);
            }

            Ok(Event::Empty(ref e)) => {
                let mut element = start_element(e)?;
                element.repeatable = std::mem::take(&mut pending_repeatable);
                close_element(&mut stack, &mut root, element)?;
            }

            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    MapperError::XmlParse("closing tag without matching opening tag".to_string())
                })?;
                close_element(&mut stack, &mut root, element)?;
            }

            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(parse_error)?;
                append_text(&mut stack, &text)?;
            }

            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e);
                append_text(&mut stack, &text)?;
            }

            Ok(Event::Comment(ref e)) => {
                if String::from_utf8_lossy(e).contains(REPETITION_MARKER) {
                    pending_repeatable = true;
                }
            }

            Ok(Event::DocType(_)) if options.reject_doctype => {
                return Err(MapperError::XmlParse(
                    "DOCTYPE declarations are not allowed".to_string(),
                ));
            }

            Ok(Event::Eof) => break,

            Ok(_) => {}

            Err(e) => {
                return Err(MapperError::XmlParse(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(MapperError::XmlParse(format!(
            "unexpected end of document, <{}> is not closed",
            open.name
        )));
    }

    root.ok_or_else(|| MapperError::XmlParse("no root element found".to_string()))
}

/// Parse an XML document straight into its JSON view.
pub fn parse_to_value(xml: &str, parse: &ParseOptions, view: &ValueOptions) -> Result<Value> {
    parse_document(xml, parse).map(|root| root.to_value(view))
}

/// Serialize a namespaced tree under `root_name`, declaring `xmlns` on the
/// root element.
///
/// Scalars become text, objects become nested elements, arrays repeat the
/// element once per item and `null` values are skipped.
pub fn to_xml(root_name: &str, xmlns: &[XmlnsAttribute], tree: &Map<String, Value>) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    let start = BytesStart::new(root_name)
        .with_attributes(xmlns.iter().map(|a| (a.name.as_str(), a.value.as_str())));
    write_object(&mut writer, start, tree)?;

    String::from_utf8(writer.into_inner()).map_err(|e| MapperError::Serialize(e.to_string()))
}

fn write_object(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>, tree: &Map<String, Value>) -> Result<()> {
    if tree.is_empty() {
        return write_event(writer, Event::Empty(start));
    }

    let end = start.to_end().into_owned();
    write_event(writer, Event::Start(start))?;
    for (name, value) in tree {
        write_value(writer, name, value)?;
    }
    write_event(writer, Event::End(end))
}

fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                write_value(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(map) => write_object(writer, BytesStart::new(name), map),
        Value::String(s) => write_text_element(writer, name, s),
        other => write_text_element(writer, name, &other.to_string()),
    }
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        write_event(writer, Event::Text(BytesText::new(text)))?;
    }
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| MapperError::Serialize(e.to_string()))
}

/// Reject DOCTYPE and entity declarations.
fn check_declarations(xml: &str) -> Result<()> {
    let lower = xml.to_ascii_lowercase();
    if lower.contains("<!doctype") {
        return Err(MapperError::XmlParse(
            "DOCTYPE declarations are not allowed".to_string(),
        ));
    }
    if lower.contains("<!entity") {
        return Err(MapperError::XmlParse(
            "Entity declarations are not allowed".to_string(),
        ));
    }
    Ok(())
}

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(parse_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(parse_error)?.into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        ..Default::default()
    })
}

fn close_element(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(MapperError::XmlParse(
            "content found after the root element".to_string(),
        )),
    }
}

fn append_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(current) => {
            current.text.get_or_insert_with(String::new).push_str(text);
            Ok(())
        }
        None => Err(MapperError::XmlParse(format!(
            "text outside of the root element: {:?}",
            text
        ))),
    }
}

fn parse_error(err: impl std::fmt::Display) -> MapperError {
    MapperError::XmlParse(err.to_string())
}

/// Strip the namespace prefix from a qualified name.
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn element_name(name: &str, options: &ValueOptions) -> String {
    if options.strip_prefixes {
        local_name(name).to_string()
    } else {
        name.to_string()
    }
}
