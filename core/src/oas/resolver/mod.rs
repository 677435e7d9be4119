#![deny(missing_docs)]

//! # Resolver Module
//!
//! Resolves every `$ref` in an OpenAPI [`Document`] in place.
//!
//! Handles:
//! - Local pointers (`#/components/schemas/Pet`) through the document's location index.
//! - Relative and absolute external documents, fetched once per pass with the caller's credentials.
//! - Identity sharing: every site naming the same target ends up holding the same node id.
//! - Cycles, both self-referential schemas and pure `$ref` chains.
//! - Site-level failures as warnings, with strict mode turning remote failures fatal.

pub mod cache;
pub mod remote;
mod walker;

pub use cache::{Lookup, ResolutionCache};
#[cfg(feature = "client")]
pub use remote::HttpFetcher;
pub use remote::{
    AuthLocation, AuthorizationValue, DefaultFetcher, DocumentFetcher, FetchError, FileFetcher,
    MemoryFetcher, RemoteDocumentCache,
};

use crate::error::{AppResult, ResolutionWarning};
use crate::oas::model::Document;
use crate::oas::ref_utils::resolve_locator;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};
use url::Url;
use walker::Walker;

/// Options for a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Abort on the first remote fetch or parse failure instead of warning.
    pub strict: bool,
    /// Locator of the root document, used to qualify relative external references.
    pub base_locator: Option<String>,
}

impl ResolveOptions {
    /// Default options: lenient, no base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets strict mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the root document locator (file path or URL).
    pub fn base_locator(mut self, base: impl Into<String>) -> Self {
        self.base_locator = Some(base.into());
        self
    }
}

/// Summary of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    /// Sites that could not be resolved, in traversal order.
    pub warnings: Vec<ResolutionWarning>,
    /// Sites that went from a `$ref` to a node during this pass.
    pub resolved_sites: usize,
    /// Distinct external documents requested.
    pub fetched_documents: usize,
}

impl ResolutionReport {
    /// True when the pass left nothing unresolved.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Entry point: resolves documents against a fetcher and a set of credentials.
pub struct OpenApiResolver<'f> {
    fetcher: &'f dyn DocumentFetcher,
    credentials: Vec<AuthorizationValue>,
    options: ResolveOptions,
}

impl<'f> OpenApiResolver<'f> {
    /// Creates a resolver without credentials and with default options.
    pub fn new(fetcher: &'f dyn DocumentFetcher) -> Self {
        Self {
            fetcher,
            credentials: Vec::new(),
            options: ResolveOptions::default(),
        }
    }

    /// Credentials forwarded unchanged to every external fetch.
    pub fn with_credentials(mut self, credentials: Vec<AuthorizationValue>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolves every reference site of `document` in place.
    ///
    /// Caches live for this call only. Calling again on the same document finds
    /// nothing left to resolve and changes nothing.
    ///
    /// Fails only in strict mode, on an external fetch or parse failure; the
    /// document may then be partially resolved.
    pub fn resolve(&self, document: &mut Document) -> AppResult<ResolutionReport> {
        let base = self.options.base_locator.as_deref().map(absolute_base);
        let Document {
            components,
            paths,
            webhooks,
            store,
            index,
            ..
        } = document;

        let remote = RemoteDocumentCache::new(self.fetcher, &self.credentials);
        let mut walker = Walker::new(store, index, remote, base, self.options.strict);
        walker.walk_document(components, paths, webhooks)?;

        let report = ResolutionReport {
            fetched_documents: walker.fetched_documents(),
            resolved_sites: walker.resolved_sites,
            warnings: walker.warnings,
        };
        if report.is_clean() {
            info!(
                "Resolved {} reference sites ({} external documents)",
                report.resolved_sites, report.fetched_documents
            );
        } else {
            warn!(
                "Resolved {} reference sites ({} external documents), {} left unresolved",
                report.resolved_sites,
                report.fetched_documents,
                report.warnings.len()
            );
        }
        Ok(report)
    }
}

/// Resolves `document` with the default fetcher and lenient options.
pub fn resolve_document(
    document: &mut Document,
    credentials: Vec<AuthorizationValue>,
) -> AppResult<ResolutionReport> {
    let fetcher = DefaultFetcher::new();
    OpenApiResolver::new(&fetcher)
        .with_credentials(credentials)
        .resolve(document)
}

/// URLs are kept as is; filesystem bases become absolute so qualified locators
/// do not depend on the working directory.
fn absolute_base(base: &str) -> String {
    if let Ok(url) = Url::parse(base) {
        if url.scheme().len() > 1 {
            return url.to_string();
        }
    }
    match std::path::absolute(Path::new(base)) {
        Ok(path) => resolve_locator(&path.to_string_lossy(), None),
        Err(_) => resolve_locator(base, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = ResolveOptions::new()
            .strict(true)
            .base_locator("https://example.com/openapi.yaml");
        assert!(options.strict);
        assert_eq!(
            options.base_locator.as_deref(),
            Some("https://example.com/openapi.yaml")
        );
        assert_eq!(ResolveOptions::default(), ResolveOptions::new());
    }

    #[test]
    fn test_absolute_base() {
        assert_eq!(
            absolute_base("https://example.com/a/../openapi.yaml"),
            "https://example.com/openapi.yaml"
        );
        let file = absolute_base("specs/./openapi.yaml");
        assert!(Path::new(&file).is_absolute());
        assert!(file.ends_with("openapi.yaml"));
        assert!(!file.contains("/./"));
    }

    #[test]
    fn test_report_is_clean() {
        assert!(ResolutionReport::default().is_clean());
    }
}
