//! OCIF response normalization.
//!
//! Turns a raw SOAP response and its HTTP status into the
//! `{statusCode, responseObject}` shape callers consume. Success responses
//! pass through as their JSON view; faults are reduced to a failure object.

use crate::config::ResponseConfig;
use crate::error::Result;
use crate::fault::{classify, FaultDescriptor, FaultSummary};
use crate::xml::{local_name, parse_to_value, ParseOptions, ValueOptions, ATTRIBUTES_KEY};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

/// Normalized upstream response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "responseObject")]
    pub response_object: Value,
}

/// Maps raw SOAP responses to [`NormalizedResponse`]s.
#[derive(Debug, Clone, Default)]
pub struct ResponseNormalizer {
    config: ResponseConfig,
    parse: ParseOptions,
}

impl ResponseNormalizer {
    pub fn new(config: ResponseConfig, parse: ParseOptions) -> Self {
        Self { config, parse }
    }

    /// Normalize `raw` received with `status_code`.
    ///
    /// A status in the configured success range passes the parsed document
    /// through, or `{}` when its Body carries no content. Any other status is
    /// treated as a fault. Parse failures are logged and returned unchanged.
    pub fn normalize(&self, raw: &str, status_code: u16) -> Result<NormalizedResponse> {
        let view = ValueOptions {
            explicit_array: false,
            strip_prefixes: self.config.strip_prefixes,
        };

        let document = parse_to_value(raw, &self.parse, &view).map_err(|e| {
            error!(status_code, error = %e, "err parse XML response to JSON");
            e
        })?;

        let response_object = if self.config.is_success(status_code) {
            self.success_object(document)
        } else {
            fault_object(&document, status_code)
        };

        Ok(NormalizedResponse {
            status_code,
            response_object,
        })
    }

    fn success_object(&self, document: Value) -> Value {
        let body = child(&document, "Envelope").and_then(|envelope| child(envelope, "Body"));
        let content = match self.config.response_element.as_deref() {
            Some(name) => body.and_then(|body| child(body, name)),
            None => body,
        };

        if content.map_or(true, is_empty) {
            debug!("Response body has no content");
            return Value::Object(Map::new());
        }
        document
    }
}

fn fault_object(document: &Value, status_code: u16) -> Value {
    let summary = match FaultDescriptor::from_envelope(document) {
        Some(fault) if fault.faultcode.is_some() => classify(&fault),
        _ => FaultSummary::generic(),
    };

    info!(
        status_code,
        category = %summary.category,
        detail = %summary.detail,
        "Upstream fault"
    );

    json!({
        "type": "failure",
        "title": summary.title,
        "status": status_code,
        "detail": summary.detail,
    })
}

fn child<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value
        .as_object()?
        .iter()
        .find(|(key, _)| local_name(key) == name)
        .map(|(_, child)| child)
}

/// No text and no child elements; attributes alone do not count.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.iter().all(is_empty),
        Value::Object(map) => map
            .iter()
            .all(|(key, child)| key == ATTRIBUTES_KEY || is_empty(child)),
        _ => false,
    }
}
