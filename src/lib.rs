//! OCIF SOAP payload mapper
//!
//! Builds namespaced SOAP requests for the OCIF involved-party service from
//! plain JSON payloads, and normalizes its SOAP responses and faults into a
//! uniform `{statusCode, responseObject}` shape.
//!
//! # Features
//!
//! - Namespace injection driven by SOAP template files
//! - Parse-once template cache shared across concurrent callers
//! - Full SOAP envelope rendering with optional header
//! - Fault classification (system, data validation, data access)
//! - Response normalization with configurable success range
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ocif_soap_mapper::{FsTemplateSource, PayloadAssembler, SoapRequest, TemplateCache};
//!
//! let cache = Arc::new(TemplateCache::new(Arc::new(FsTemplateSource::new("templates"))));
//! let assembler = PayloadAssembler::new(cache);
//! let xml = assembler
//!     .render_request("amendInvolvedParty.xml", &SoapRequest::new(payload))
//!     .await?;
//! ```

pub mod assembler;
pub mod cache;
pub mod config;
pub mod error;
pub mod fault;
pub mod inject;
pub mod normalizer;
pub mod request_control;
pub mod source;
pub mod template;
pub mod xml;

pub use assembler::{AssembledPayload, PayloadAssembler, SoapRequest};
pub use cache::{CacheEntry, TemplateCache};
pub use config::MapperConfig;
pub use error::{MapperError, Result};
pub use fault::{classify, extract_transaction_reference, FaultCategory, FaultDescriptor, FaultSummary};
pub use inject::inject_namespace;
pub use normalizer::{NormalizedResponse, ResponseNormalizer};
pub use request_control::{ErrorResponse, RequestControl};
pub use source::{Encoding, FsTemplateSource, MemoryTemplateSource, TemplateSource};
pub use template::Template;
