//! Parsed SOAP template cache.
//!
//! Each template file is read and parsed once, on first use, and kept for the
//! lifetime of the cache. Concurrent first uses of the same file share a
//! single load. A failed load leaves nothing behind.

use crate::error::{MapperError, Result};
use crate::source::{decode, TemplateSource};
use crate::template::Template;
use crate::xml::{parse_document, ParseOptions, XmlElement, XmlnsAttribute};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};

/// SOAP header section of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderTemplate {
    /// Qualified name of the Header element
    pub name: String,
    /// Shape of the header content
    pub template: Template,
}

/// A parsed template file.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Shape of the operation request element's content
    pub template: Template,
    /// Namespace declarations of the envelope, in document order
    pub xmlns_attributes: Vec<XmlnsAttribute>,
    /// Qualified name of the operation request element inside the Body
    pub root_ns: String,
    /// Qualified name of the envelope element
    pub envelope: String,
    /// Qualified name of the Body element
    pub body: String,
    /// Header section, when the template declares header content
    pub header: Option<HeaderTemplate>,
}

impl CacheEntry {
    /// Extract the cached parts of a parsed template document.
    pub fn from_document(root: &XmlElement) -> Result<Self> {
        let body = root.child("Body").ok_or_else(|| {
            MapperError::InvalidTemplate(format!("no SOAP Body inside <{}>", root.name))
        })?;

        let request = body.children.first().ok_or_else(|| {
            MapperError::InvalidTemplate(format!("<{}> has no operation element", body.name))
        })?;
        if body.children.len() > 1 {
            warn!(
                body = %body.name,
                operation = %request.name,
                extra = body.children.len() - 1,
                "Template Body has more than one element, using the first"
            );
        }

        let header = root
            .child("Header")
            .filter(|h| !h.children.is_empty())
            .map(|h| HeaderTemplate {
                name: h.name.clone(),
                template: Template::from_element(h),
            });

        Ok(Self {
            template: Template::from_element(request),
            xmlns_attributes: root.xmlns_attributes(),
            root_ns: request.name.clone(),
            envelope: root.name.clone(),
            body: body.name.clone(),
            header,
        })
    }
}

/// Cache of parsed templates keyed by file name. Entries are never evicted.
pub struct TemplateCache {
    source: Arc<dyn TemplateSource>,
    options: ParseOptions,
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<CacheEntry>>>>>,
}

impl TemplateCache {
    /// Create an empty cache reading from `source`.
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            source,
            options: ParseOptions::default(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Use the given parser options for templates loaded from now on.
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Return the entry for `filename`, loading it on first use.
    ///
    /// A failed load is not cached; the next call retries.
    pub async fn get_or_load(&self, filename: &str) -> Result<Arc<CacheEntry>> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(filename.to_string()).or_default().clone()
        };

        if let Some(entry) = cell.get() {
            debug!(template = %filename, "Template cache hit");
            return Ok(Arc::clone(entry));
        }

        let loaded = cell.get_or_try_init(|| self.load(filename)).await.cloned();
        if loaded.is_err() {
            let mut entries = self.entries.lock().await;
            let stale = entries
                .get(filename)
                .is_some_and(|current| Arc::ptr_eq(current, &cell) && !current.initialized());
            if stale {
                entries.remove(filename);
            }
        }
        loaded
    }

    async fn load(&self, filename: &str) -> Result<Arc<CacheEntry>> {
        let xml = decode(self.source.read(filename).await?, self.source.encoding())?;

        let root = parse_document(&xml, &self.options).map_err(|e| {
            error!(template = %filename, error = %e, "err parse XML template to JSON");
            e
        })?;
        let entry = CacheEntry::from_document(&root)?;

        info!(
            template = %filename,
            root_ns = %entry.root_ns,
            namespaces = entry.xmlns_attributes.len(),
            "Template cached"
        );
        Ok(Arc::new(entry))
    }

    /// Whether a parsed entry for `filename` is present.
    pub async fn contains(&self, filename: &str) -> bool {
        self.entries
            .lock()
            .await
            .get(filename)
            .is_some_and(|cell| cell.initialized())
    }

    /// Number of parsed entries.
    pub async fn len(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
