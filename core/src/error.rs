//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace, and the
//! `ResolveError` taxonomy reported for individual reference sites.

use derive_more::{Display, From};
use serde::Serialize;

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// A reference failure that aborted the whole pass (strict mode).
    #[display("Resolution Error: {_0}")]
    Resolve(ResolveError),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Failure to resolve a single `$ref`.
///
/// Every variant keeps enough context to be rendered as a warning against the
/// reference site that produced it.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The reference string itself could not be parsed.
    #[display("Malformed reference '{reference}': {reason}")]
    MalformedReference {
        /// The offending reference string.
        reference: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The target document was reachable but the pointer named nothing usable.
    #[display("Unresolvable reference '{reference}': {reason}")]
    UnresolvableReference {
        /// The qualified reference that was looked up.
        reference: String,
        /// Which segment or kind check failed.
        reason: String,
    },

    /// The fetch collaborator failed (network, IO, timeout).
    #[display("Failed to fetch '{locator}': {message}")]
    RemoteFetch {
        /// Locator of the external document.
        locator: String,
        /// Message reported by the fetcher.
        message: String,
    },

    /// The external document was fetched but is not a valid tree.
    #[display("Failed to parse '{locator}': {message}")]
    RemoteParse {
        /// Locator of the external document.
        locator: String,
        /// Message reported by the parser.
        message: String,
    },
}

impl std::error::Error for ResolveError {}

impl ResolveError {
    /// Returns true for failures that strict mode escalates to a fatal error.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteFetch { .. } | Self::RemoteParse { .. })
    }

    /// The warning category for this failure.
    pub fn kind(&self) -> WarningKind {
        match self {
            Self::MalformedReference { .. } => WarningKind::MalformedReference,
            Self::UnresolvableReference { .. } => WarningKind::UnresolvableReference,
            Self::RemoteFetch { .. } => WarningKind::RemoteFetchError,
            Self::RemoteParse { .. } => WarningKind::RemoteParseError,
        }
    }
}

/// Category of a non-fatal resolution warning.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningKind {
    /// Bad pointer syntax.
    MalformedReference,
    /// Pointer names no node of the expected kind.
    UnresolvableReference,
    /// External document could not be retrieved.
    RemoteFetchError,
    /// External document could not be parsed.
    RemoteParseError,
}

/// A reference site that was left unresolved during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionWarning {
    /// The reference string as written at the site.
    pub reference: String,
    /// Canonical pointer of the referencing slot, e.g. `#/paths/~1pets/get/parameters/0`.
    pub site: String,
    /// Failure category.
    pub kind: WarningKind,
    /// Human readable reason.
    pub message: String,
}

impl ResolutionWarning {
    pub(crate) fn new(reference: &str, site: &str, error: &ResolveError) -> Self {
        Self {
            reference: reference.to_string(),
            site: site.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}
