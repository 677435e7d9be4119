#![deny(missing_docs)]

//! # OAS Deref Core
//!
//! Resolves `$ref` pointers inside OpenAPI documents into a shared node graph.
//!
//! ```no_run
//! use oas_deref_core::{Document, OpenApiResolver, DefaultFetcher, ResolveOptions};
//!
//! let text = std::fs::read_to_string("openapi.yaml")?;
//! let mut document = Document::from_yaml_str(&text)?;
//! let fetcher = DefaultFetcher::new();
//! let report = OpenApiResolver::new(&fetcher)
//!     .with_options(ResolveOptions::new().base_locator("openapi.yaml"))
//!     .resolve(&mut document)?;
//! assert!(report.is_clean());
//! # Ok::<(), oas_deref_core::AppError>(())
//! ```

/// Shared error types.
pub mod error;

/// OpenAPI (OAS) model, parsing and reference resolution.
pub mod oas;

pub use error::{AppError, AppResult, ResolutionWarning, ResolveError, WarningKind};
pub use oas::{
    parse_document, resolve_document, AuthLocation, AuthorizationValue, DefaultFetcher, Document,
    DocumentFetcher, FetchError, FileFetcher, MemoryFetcher, Node, NodeId, NodeKind,
    OpenApiResolver, Pointer, RefOr, ResolutionReport, ResolveOptions, Schema, UnresolvedRef,
};
