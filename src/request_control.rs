//! Request-control flags and the uniform failure response.

use serde::{Deserialize, Serialize};

/// Failure body returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

/// `{statusCode, body}` failure returned instead of a mapped response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: FailureBody,
}

impl ErrorResponse {
    pub fn failure(status_code: u16, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            body: FailureBody {
                kind: "Failure".to_string(),
                title: title.into(),
                status: status_code,
                detail: detail.into(),
            },
        }
    }

    /// 404 response for a tax record the service does not hold.
    pub fn record_not_found() -> Self {
        let mut response = Self::failure(
            404,
            "no record found",
            "the request tax record was not found",
        );
        response.body.kind = "failure".to_string();
        response
    }

    /// 400 response for a request that asks for nothing.
    pub fn nothing_requested() -> Self {
        Self::failure(
            400,
            "Invalid Data Error",
            "no data was requested, atleast one must be true",
        )
    }
}

/// Sections of an involved-party record a caller asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestControl {
    pub request_foreign_tax_entity: bool,
    pub request_foreign_tax_trust: bool,
    pub request_foreign_indicia: bool,
    pub request_foreign_support_documents_list: bool,
    pub request_foreign_tax_country_list: bool,
    pub request_foreign_tax_individual: bool,
    pub request_foreign_tax_role: bool,
}

impl RequestControl {
    fn flags(&self) -> [(&'static str, bool); 7] {
        [
            ("ForeignTaxEntity", self.request_foreign_tax_entity),
            ("ForeignTaxTrust", self.request_foreign_tax_trust),
            ("ForeignIndicia", self.request_foreign_indicia),
            (
                "ForeignSupportDocumentsList",
                self.request_foreign_support_documents_list,
            ),
            ("ForeignTaxCountryList", self.request_foreign_tax_country_list),
            ("ForeignTaxIndividual", self.request_foreign_tax_individual),
            ("ForeignTaxRole", self.request_foreign_tax_role),
        ]
    }

    /// Names of the requested sections, in declaration order.
    pub fn requested_sections(&self) -> Vec<&'static str> {
        self.flags()
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    /// At least one section must be requested.
    pub fn validate(&self) -> Result<(), ErrorResponse> {
        if self.flags().iter().any(|(_, set)| *set) {
            Ok(())
        } else {
            Err(ErrorResponse::nothing_requested())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_shape() {
        let response = ErrorResponse::failure(400, "ClientError", "Invalid request");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "statusCode": 400,
                "body": {
                    "type": "Failure",
                    "title": "ClientError",
                    "status": 400,
                    "detail": "Invalid request"
                }
            })
        );
    }

    #[test]
    fn test_record_not_found_shape() {
        assert_eq!(
            serde_json::to_value(ErrorResponse::record_not_found()).unwrap(),
            json!({
                "statusCode": 404,
                "body": {
                    "type": "failure",
                    "title": "no record found",
                    "status": 404,
                    "detail": "the request tax record was not found"
                }
            })
        );
    }

    #[test]
    fn test_nothing_requested_is_rejected() {
        let control: RequestControl = serde_json::from_value(json!({
            "requestForeignTaxEntity": false,
            "requestForeignIndicia": false
        }))
        .unwrap();

        let err = control.validate().unwrap_err();
        assert_eq!(err.status_code, 400);
        assert_eq!(err.body.title, "Invalid Data Error");
        assert_eq!(err.body.detail, "no data was requested, atleast one must be true");
        assert!(control.requested_sections().is_empty());
    }

    #[test]
    fn test_any_flag_passes() {
        let control: RequestControl = serde_json::from_value(json!({
            "requestForeignTaxRole": true,
            "requestForeignSupportDocumentsList": true
        }))
        .unwrap();

        assert!(control.validate().is_ok());
        assert_eq!(
            control.requested_sections(),
            vec!["ForeignSupportDocumentsList", "ForeignTaxRole"]
        );
    }

    #[test]
    fn test_empty_object_defaults_to_nothing() {
        let control: RequestControl = serde_json::from_value(json!({})).unwrap();
        assert_eq!(control, RequestControl::default());
        assert!(control.validate().is_err());
    }
}
