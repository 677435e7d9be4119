#![deny(missing_docs)]

//! # Reference Utilities
//!
//! Parses `$ref` strings into a [`Pointer`] (document locator + decoded path
//! segments) and qualifies relative locators against a base.
//!
//! These utilities never fetch anything: they only decide *what* a reference
//! addresses. The canonical string form of a qualified pointer is the key used
//! by both resolution caches.

use crate::error::ResolveError;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use url::Url;

/// A parsed reference: which document, and which path inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    /// Document locator. Empty for the current document.
    pub locator: String,
    /// Decoded path segments from the document root.
    pub segments: Vec<String>,
}

impl Pointer {
    /// Parses a reference string.
    ///
    /// - No `#`: the whole string is a locator, the path is empty.
    /// - Leading `#`: same document, path follows.
    /// - Otherwise: locator before `#`, path after.
    ///
    /// Fails with `MalformedReference` on empty input, invalid `~` escapes,
    /// undecodable percent escapes or control characters in a segment.
    pub fn parse(reference: &str) -> Result<Self, ResolveError> {
        if reference.trim().is_empty() {
            return Err(malformed(reference, "reference is empty"));
        }

        let (locator, fragment) = match reference.split_once('#') {
            Some((locator, fragment)) => (locator, fragment),
            None => (reference, ""),
        };

        let segments = parse_fragment(fragment).map_err(|reason| malformed(reference, &reason))?;

        Ok(Self {
            locator: locator.to_string(),
            segments,
        })
    }

    /// True when the pointer addresses the current document.
    pub fn is_local(&self) -> bool {
        self.locator.is_empty()
    }

    /// Resolves the locator against `base`. Local pointers are unchanged.
    pub fn qualify(mut self, base: Option<&str>) -> Self {
        if !self.locator.is_empty() {
            self.locator = resolve_locator(&self.locator, base);
        }
        self
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_pointer(&self.locator, &self.segments))
    }
}

/// Renders `locator#/seg/seg` with each segment JSON-pointer escaped.
pub fn format_pointer<S: AsRef<str>>(locator: &str, segments: &[S]) -> String {
    let mut out = String::with_capacity(locator.len() + 1 + segments.len() * 8);
    out.push_str(locator);
    out.push('#');
    for segment in segments {
        out.push('/');
        out.push_str(&encode_pointer_segment(segment.as_ref()));
    }
    out
}

/// Appends one escaped segment to an already rendered pointer.
pub(crate) fn child_pointer(pointer: &str, segment: &str) -> String {
    format!("{}/{}", pointer, encode_pointer_segment(segment))
}

/// Escapes a JSON Pointer segment (`~` then `/`).
pub fn encode_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Decodes a JSON Pointer segment (handles `~1`, `~0` and percent escapes).
pub fn decode_pointer_segment(segment: &str) -> Result<String, String> {
    if invalid_escape().is_match(segment) {
        return Err(format!("invalid '~' escape in segment '{}'", segment));
    }
    let unescaped = segment.replace("~1", "/").replace("~0", "~");
    let decoded = percent_decode_str(&unescaped)
        .decode_utf8()
        .map_err(|e| format!("segment '{}' is not valid UTF-8: {}", segment, e))?
        .into_owned();
    if decoded.chars().any(char::is_control) {
        return Err(format!("segment '{}' contains a control character", segment));
    }
    Ok(decoded)
}

/// Resolves a document locator against an optional base locator.
///
/// Absolute URLs are normalised. Relative locators are joined with a URL base,
/// or with the directory of a filesystem base. Without a base, relative paths
/// are only lexically normalised.
pub fn resolve_locator(locator: &str, base: Option<&str>) -> String {
    if let Ok(url) = Url::parse(locator) {
        return url.to_string();
    }

    match base {
        Some(base) => match Url::parse(base) {
            Ok(base_url) => base_url
                .join(locator)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| locator.to_string()),
            Err(_) => {
                let dir = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
                path_to_string(&normalize_path(&dir.join(locator)))
            }
        },
        None => path_to_string(&normalize_path(Path::new(locator))),
    }
}

/// True for `http://` and `https://` locators.
pub fn is_http_locator(locator: &str) -> bool {
    Url::parse(locator)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn parse_fragment(fragment: &str) -> Result<Vec<String>, String> {
    let path = fragment.strip_prefix('/').unwrap_or(fragment);
    if path.is_empty() {
        return Ok(Vec::new());
    }
    path.split('/').map(decode_pointer_segment).collect()
}

fn malformed(reference: &str, reason: &str) -> ResolveError {
    ResolveError::MalformedReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

fn invalid_escape() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"~([^01]|$)").expect("Invalid regex"))
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
