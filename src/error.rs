//! Error types for the OCIF SOAP mapper.

use thiserror::Error;

/// Mapper errors.
///
/// `XmlParse` is the parse failure raised by the XML reader. Every layer
/// returns it unchanged so callers can tell a mapping failure apart from an
/// upstream business fault.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("XML serialization error: {0}")]
    Serialize(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MapperError {
    /// Whether this error came from the XML parser.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::XmlParse(_))
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, MapperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MapperError::XmlParse("unexpected end of input".to_string());
        assert_eq!(err.to_string(), "XML parsing error: unexpected end of input");

        let err = MapperError::TemplateNotFound("amend.xml".to_string());
        assert_eq!(err.to_string(), "Template not found: amend.xml");
    }

    #[test]
    fn test_is_parse_error() {
        assert!(MapperError::XmlParse("bad".into()).is_parse_error());
        assert!(!MapperError::Serialize("bad".into()).is_parse_error());
        assert!(!MapperError::InvalidTemplate("bad".into()).is_parse_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MapperError = io.into();
        assert!(matches!(err, MapperError::Io(_)));
    }
}
