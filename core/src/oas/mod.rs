#![deny(missing_docs)]

//! # OpenAPI Module
//!
//! - **model**: Arena-backed document model.
//! - **parse**: YAML/JSON parsing into the model.
//! - **ref_utils**: `$ref` pointer parsing and locator qualification.
//! - **resolver**: In-place `$ref` resolution.

pub mod model;
pub mod parse;
pub mod ref_utils;
pub mod resolver;

// Re-export public API
pub use model::{
    AdditionalProperties, Arena, Components, Composition, Document, Header, MediaType, Node,
    NodeId, NodeKind, Operation, Parameter, PathItem, RefOr, RequestBody, Response, Schema,
    SchemaKind, Store, UnresolvedRef, HTTP_METHODS,
};
pub use parse::parse_document;
pub use ref_utils::{decode_pointer_segment, encode_pointer_segment, resolve_locator, Pointer};
pub use resolver::{
    resolve_document, AuthLocation, AuthorizationValue, DefaultFetcher, DocumentFetcher,
    FetchError, FileFetcher, MemoryFetcher, OpenApiResolver, ResolutionReport, ResolveOptions,
};
