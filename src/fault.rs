//! SOAP fault classification.
//!
//! OCIF reports failures as SOAP 1.1 faults whose `faultcode` names one of
//! three fault families. The family decides how the human-readable detail is
//! assembled from the fault's `detail` element.

use crate::xml::{local_name, TEXT_KEY};
use serde_json::Value;
use std::fmt;

/// Title and detail used for any fault outside the known families.
pub const GENERIC_FAILURE: &str = "MidTier AmendOCIFInvolved Service Failure";

/// Title used for faults of a known family.
pub const INTERNAL_ERROR_TITLE: &str = "internal Server error";

/// Returned when no transaction reference can be found.
pub const NO_TRANSACTION_REFERENCE: &str = "no TRANSACTION_REFERENCE found";

const TRANSACTION_REFERENCE_KEY: &str = "TRANSACTION_REFERENCE";

/// Fault family named by a fault code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCategory {
    System,
    DataValidation,
    DataAccess,
    Unknown,
}

impl FaultCategory {
    /// Classify a fault code by case-sensitive substring match.
    pub fn from_fault_code(code: &str) -> Self {
        [Self::System, Self::DataValidation, Self::DataAccess]
            .into_iter()
            .find(|category| code.contains(category.as_str()))
            .unwrap_or(Self::Unknown)
    }

    /// Marker used in fault codes and in the detail string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "systemfault",
            Self::DataValidation => "datavalidationfault",
            Self::DataAccess => "dataaccessfault",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a SOAP fault the classifier reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultDescriptor {
    pub faultcode: Option<String>,
    pub faultstring: Option<String>,
    pub detail: Option<Value>,
}

impl FaultDescriptor {
    /// Locate `Envelope/Body/Fault` in a parsed response.
    ///
    /// Names are matched by local name, ignoring case, so both prefixed and
    /// stripped views work. Returns `None` when there is no Fault element.
    pub fn from_envelope(document: &Value) -> Option<Self> {
        let fault = field(document, "Envelope")
            .and_then(|envelope| field(envelope, "Body"))
            .and_then(|body| field(body, "Fault"))?;

        Some(Self {
            faultcode: field(fault, "faultcode").and_then(text),
            faultstring: field(fault, "faultstring").and_then(text),
            detail: field(fault, "detail").cloned(),
        })
    }

    pub fn category(&self) -> FaultCategory {
        self.faultcode
            .as_deref()
            .map_or(FaultCategory::Unknown, FaultCategory::from_fault_code)
    }
}

/// Result of classifying a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultSummary {
    pub category: FaultCategory,
    pub title: String,
    pub detail: String,
}

impl FaultSummary {
    /// Summary for faults that cannot be attributed to a known family.
    pub fn generic() -> Self {
        Self {
            category: FaultCategory::Unknown,
            title: GENERIC_FAILURE.to_string(),
            detail: GENERIC_FAILURE.to_string(),
        }
    }
}

/// Classify a fault and build its title and detail. Never fails.
///
/// For a known family the detail reads
/// `"<family>: TRANSACTION_REFERENCE: <ref>"`, followed for system faults by
/// `", <additionalText>"` when the fault carries one.
pub fn classify(fault: &FaultDescriptor) -> FaultSummary {
    let category = fault.category();
    if category == FaultCategory::Unknown {
        return FaultSummary::generic();
    }

    // detail/<family>Fault/faultInfo, or the family element itself when the
    // faultInfo wrapper is missing.
    let info = fault
        .detail
        .as_ref()
        .and_then(|detail| field(detail, category.as_str()))
        .map(|family| field(family, "faultInfo").unwrap_or(family));

    let reference = extract_transaction_reference(info.and_then(|i| field(i, "parameter")));
    let mut detail = format!("{category}: {TRANSACTION_REFERENCE_KEY}: {reference}");

    if category == FaultCategory::System {
        let additional = info
            .and_then(|i| field(i, "additionalText"))
            .and_then(text)
            .filter(|t| !t.is_empty());
        if let Some(additional) = additional {
            detail.push_str(", ");
            detail.push_str(&additional);
        }
    }

    FaultSummary {
        category,
        title: INTERNAL_ERROR_TITLE.to_string(),
        detail,
    }
}

/// Transaction reference carried in a fault's parameters.
///
/// A list is searched for the entry whose `key` is `TRANSACTION_REFERENCE`;
/// a single parameter object yields its `value` without checking the key.
pub fn extract_transaction_reference(parameters: Option<&Value>) -> String {
    let value = match parameters {
        Some(Value::Array(entries)) => entries
            .iter()
            .find(|entry| {
                field(entry, "key").and_then(text).as_deref() == Some(TRANSACTION_REFERENCE_KEY)
            })
            .and_then(|entry| field(entry, "value")),
        Some(parameter @ Value::Object(_)) => field(parameter, "value"),
        _ => None,
    };

    value
        .and_then(text)
        .unwrap_or_else(|| NO_TRANSACTION_REFERENCE.to_string())
}

/// Child of an object whose local name matches `name`, ignoring case.
fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value
        .as_object()?
        .iter()
        .find(|(key, _)| local_name(key).eq_ignore_ascii_case(name))
        .map(|(_, child)| child)
}

/// Text content of a JSON-view element.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get(TEXT_KEY).and_then(text),
        Value::Array(items) => items.first().and_then(text),
        Value::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(code: &str, detail: Value) -> FaultDescriptor {
        FaultDescriptor {
            faultcode: Some(code.to_string()),
            faultstring: Some("fault".to_string()),
            detail: Some(detail),
        }
    }

    #[test]
    fn test_category_from_fault_code() {
        assert_eq!(
            FaultCategory::from_fault_code("soapenv:Server.systemfault"),
            FaultCategory::System
        );
        assert_eq!(
            FaultCategory::from_fault_code("datavalidationfault"),
            FaultCategory::DataValidation
        );
        assert_eq!(
            FaultCategory::from_fault_code("ns:dataaccessfault"),
            FaultCategory::DataAccess
        );
        assert_eq!(FaultCategory::from_fault_code("Client"), FaultCategory::Unknown);
        // Case-sensitive on the code itself.
        assert_eq!(FaultCategory::from_fault_code("SystemFault"), FaultCategory::Unknown);
    }

    #[test]
    fn test_extract_reference_from_list() {
        let parameters = json!([
            { "key": "OTHER", "value": "x" },
            { "key": "TRANSACTION_REFERENCE", "value": "12345" }
        ]);
        assert_eq!(extract_transaction_reference(Some(&parameters)), "12345");
    }

    #[test]
    fn test_extract_reference_missing_from_list() {
        let parameters = json!([{ "key": "OTHER", "value": "x" }]);
        assert_eq!(
            extract_transaction_reference(Some(&parameters)),
            NO_TRANSACTION_REFERENCE
        );
    }

    #[test]
    fn test_extract_reference_from_single_parameter() {
        let parameter = json!({ "key": "ANYTHING", "value": "67890" });
        assert_eq!(extract_transaction_reference(Some(&parameter)), "67890");
    }

    #[test]
    fn test_extract_reference_with_prefixed_keys() {
        let parameters = json!([
            { "n:key": "OTHER", "n:value": "x" },
            { "n:Key": "TRANSACTION_REFERENCE", "n:Value": "12345" }
        ]);
        assert_eq!(extract_transaction_reference(Some(&parameters)), "12345");

        let parameter = json!({ "n:key": "TRANSACTION_REFERENCE", "n:value": "678" });
        assert_eq!(extract_transaction_reference(Some(&parameter)), "678");
    }

    #[test]
    fn test_extract_reference_absent() {
        assert_eq!(extract_transaction_reference(None), NO_TRANSACTION_REFERENCE);
        assert_eq!(
            extract_transaction_reference(Some(&json!({ "key": "TRANSACTION_REFERENCE" }))),
            NO_TRANSACTION_REFERENCE
        );
    }

    #[test]
    fn test_classify_system_fault() {
        let fault = descriptor(
            "soapenv:Server.systemfault",
            json!({
                "systemFault": {
                    "faultInfo": {
                        "parameter": [{ "key": "TRANSACTION_REFERENCE", "value": "12345" }],
                        "additionalText": "Err"
                    }
                }
            }),
        );

        let summary = classify(&fault);
        assert_eq!(summary.category, FaultCategory::System);
        assert_eq!(summary.title, INTERNAL_ERROR_TITLE);
        assert_eq!(summary.detail, "systemfault: TRANSACTION_REFERENCE: 12345, Err");
    }

    #[test]
    fn test_classify_system_fault_without_additional_text() {
        let fault = descriptor(
            "systemfault",
            json!({ "SYSTEMFAULT": { "FaultInfo": { "Parameter": { "key": "TRANSACTION_REFERENCE", "value": "1" } } } }),
        );
        assert_eq!(classify(&fault).detail, "systemfault: TRANSACTION_REFERENCE: 1");
    }

    #[test]
    fn test_classify_data_validation_ignores_additional_text() {
        let fault = descriptor(
            "datavalidationfault",
            json!({
                "dataValidationFault": {
                    "faultInfo": {
                        "parameter": { "key": "TRANSACTION_REFERENCE", "value": "777" },
                        "additionalText": "bad field"
                    }
                }
            }),
        );

        let summary = classify(&fault);
        assert_eq!(summary.category, FaultCategory::DataValidation);
        assert_eq!(summary.detail, "datavalidationfault: TRANSACTION_REFERENCE: 777");
    }

    #[test]
    fn test_classify_data_access_without_fault_info() {
        let fault = descriptor(
            "dataaccessfault",
            json!({ "dataAccessFault": { "parameter": { "value": "42" } } }),
        );
        assert_eq!(
            classify(&fault).detail,
            "dataaccessfault: TRANSACTION_REFERENCE: 42"
        );
    }

    #[test]
    fn test_classify_without_detail() {
        let fault = FaultDescriptor {
            faultcode: Some("systemfault".to_string()),
            ..Default::default()
        };
        assert_eq!(
            classify(&fault).detail,
            "systemfault: TRANSACTION_REFERENCE: no TRANSACTION_REFERENCE found"
        );
    }

    #[test]
    fn test_classify_unknown_fault() {
        let summary = classify(&descriptor("Client", json!("Error occurred")));
        assert_eq!(summary, FaultSummary::generic());
        assert_eq!(summary.title, GENERIC_FAILURE);

        let missing_code = classify(&FaultDescriptor::default());
        assert_eq!(missing_code.title, GENERIC_FAILURE);
        assert_eq!(missing_code.detail, GENERIC_FAILURE);
    }

    #[test]
    fn test_descriptor_from_envelope() {
        let document = json!({
            "soapenv:Envelope": {
                "$": { "xmlns:soapenv": "http://schemas.xmlsoap.org/soap/envelope/" },
                "soapenv:Body": {
                    "soapenv:Fault": {
                        "faultcode": { "$": { "xmlns:ns": "urn:ns" }, "_": "ns:systemfault" },
                        "faultstring": "System failure",
                        "detail": { "systemFault": "" }
                    }
                }
            }
        });

        let fault = FaultDescriptor::from_envelope(&document).unwrap();
        assert_eq!(fault.faultcode.as_deref(), Some("ns:systemfault"));
        assert_eq!(fault.faultstring.as_deref(), Some("System failure"));
        assert_eq!(fault.detail, Some(json!({ "systemFault": "" })));
        assert_eq!(fault.category(), FaultCategory::System);
    }

    #[test]
    fn test_descriptor_absent() {
        let document = json!({ "Envelope": { "Body": { "response": "Success" } } });
        assert!(FaultDescriptor::from_envelope(&document).is_none());
    }
}
