//! Configuration types for the OCIF SOAP mapper.

use crate::error::{MapperError, Result};
use crate::source::{Encoding, FsTemplateSource};
use crate::xml::ParseOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the mapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Config version
    pub version: String,

    /// Template file location
    pub templates: TemplatesConfig,

    /// XML parser settings
    pub xml: XmlConfig,

    /// Response normalization settings
    pub response: ResponseConfig,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            templates: TemplatesConfig::default(),
            xml: XmlConfig::default(),
            response: ResponseConfig::default(),
        }
    }
}

impl MapperConfig {
    /// Parse a YAML configuration document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| MapperError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_yaml(&yaml)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.response.success_min > self.response.success_max {
            return Err(MapperError::Config(format!(
                "response.success_min ({}) is greater than response.success_max ({})",
                self.response.success_min, self.response.success_max
            )));
        }
        if self.templates.directory.as_os_str().is_empty() {
            return Err(MapperError::Config(
                "templates.directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            reject_doctype: self.xml.reject_doctype,
        }
    }

    /// Template source reading from the configured directory.
    pub fn template_source(&self) -> FsTemplateSource {
        FsTemplateSource::new(&self.templates.directory).with_encoding(self.templates.encoding)
    }
}

/// Template file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory template file names are resolved against
    pub directory: PathBuf,

    /// Encoding applied when reading template files; decoded again before
    /// parsing
    pub encoding: Encoding,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("templates"),
            encoding: Encoding::Utf8,
        }
    }
}

/// XML parser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    /// Reject documents carrying DOCTYPE or entity declarations
    pub reject_doctype: bool,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            reject_doctype: true,
        }
    }
}

/// Response normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Drop namespace prefixes from element names in the JSON view
    pub strip_prefixes: bool,

    /// Operation response element that must carry content for a success
    /// response to be passed through. Any Body content counts when unset.
    pub response_element: Option<String>,

    /// Lowest status code treated as success
    pub success_min: u16,

    /// Highest status code treated as success
    pub success_max: u16,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            strip_prefixes: true,
            response_element: None,
            success_min: 200,
            success_max: 299,
        }
    }
}

impl ResponseConfig {
    pub fn is_success(&self, status_code: u16) -> bool {
        (self.success_min..=self.success_max).contains(&status_code)
    }
}
