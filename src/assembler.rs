//! Request payload assembly.
//!
//! Resolves a template through the cache and rebuilds a caller payload under
//! the template's qualified names, ready for XML serialization.

use crate::cache::{CacheEntry, TemplateCache};
use crate::error::Result;
use crate::inject::inject_namespace;
use crate::xml::{to_xml, XmlnsAttribute};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// A payload rebuilt under a template's qualified names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssembledPayload {
    /// Payload under qualified keys
    #[serde(rename = "payloadWithNS")]
    pub payload_with_ns: Map<String, Value>,
    /// Namespace declarations of the template envelope
    #[serde(rename = "xmlnsAttributes")]
    pub xmlns_attributes: Vec<XmlnsAttribute>,
    /// Qualified name of the operation request element
    #[serde(rename = "rootNS")]
    pub root_ns: String,
}

/// Plain header and body payloads of an outgoing SOAP request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SoapRequest {
    pub header: Value,
    pub body: Value,
}

impl SoapRequest {
    pub fn new(body: Value) -> Self {
        Self {
            header: Value::Null,
            body,
        }
    }

    pub fn with_header(mut self, header: Value) -> Self {
        self.header = header;
        self
    }
}

/// Builds namespaced request payloads from cached templates.
pub struct PayloadAssembler {
    cache: Arc<TemplateCache>,
}

impl PayloadAssembler {
    pub fn new(cache: Arc<TemplateCache>) -> Self {
        Self { cache }
    }

    /// Rebuild `payload` under the operation element of `filename`.
    ///
    /// An empty file name or a `null` payload yields an empty result without
    /// touching the cache. Template failures are returned unchanged.
    pub async fn assemble(&self, filename: &str, payload: &Value) -> Result<AssembledPayload> {
        if filename.is_empty() || payload.is_null() {
            debug!(template = %filename, "Nothing to assemble");
            return Ok(AssembledPayload::default());
        }

        let entry = self.cache.get_or_load(filename).await.map_err(|e| {
            error!(template = %filename, error = %e, "error injecting payload namespace");
            e
        })?;

        Ok(AssembledPayload {
            payload_with_ns: inject_namespace(&entry.template, payload),
            xmlns_attributes: entry.xmlns_attributes.clone(),
            root_ns: entry.root_ns.clone(),
        })
    }

    /// Render a complete SOAP envelope for `request` using `filename`.
    ///
    /// The Header element is written only when the template declares header
    /// content and the header payload fills at least one of its fields.
    pub async fn render_request(&self, filename: &str, request: &SoapRequest) -> Result<String> {
        let rendered = match self.cache.get_or_load(filename).await {
            Ok(entry) => render_envelope(&entry, request),
            Err(e) => Err(e),
        };

        rendered.map_err(|e| {
            error!(template = %filename, error = %e, "error mapping request");
            e
        })
    }
}

fn render_envelope(entry: &CacheEntry, request: &SoapRequest) -> Result<String> {
    let mut envelope = Map::new();

    if let Some(ref header) = entry.header {
        let fields = inject_namespace(&header.template, &request.header);
        if !fields.is_empty() {
            envelope.insert(header.name.clone(), Value::Object(fields));
        }
    }

    let mut body = Map::new();
    body.insert(
        entry.root_ns.clone(),
        Value::Object(inject_namespace(&entry.template, &request.body)),
    );
    envelope.insert(entry.body.clone(), Value::Object(body));

    let xml = to_xml(&entry.envelope, &entry.xmlns_attributes, &envelope)?;
    debug!(operation = %entry.root_ns, bytes = xml.len(), "Rendered SOAP request");
    Ok(format!("{XML_DECLARATION}{xml}"))
}
