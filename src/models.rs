use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RegistryError;

/// Longest short code accepted from a caller.
pub const MAX_SHORTCODE_LEN: usize = 64;

/// Path segments already taken by the router. A link stored under one of
/// these could never be reached through `GET /{code}`.
pub const RESERVED_CODES: &[&str] = &["links", "submit", "health", "favicon.ico"];

/// The value stored per short code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub url: String,
    /// Absent for entries imported from the legacy list layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One short code → URL association, as returned by a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub shortcode: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// All links, keyed by short code.
///
/// Backed by a `BTreeMap` so the serialized file has a stable key order and
/// stays diffable between writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkStore {
    links: BTreeMap<String, LinkEntry>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, shortcode: &str) -> Option<&LinkEntry> {
        self.links.get(shortcode)
    }

    pub fn contains(&self, shortcode: &str) -> bool {
        self.links.contains_key(shortcode)
    }

    /// Insert a new entry. Returns `false` and leaves the store untouched if
    /// the code is already present.
    pub fn insert(&mut self, shortcode: impl Into<String>, entry: LinkEntry) -> bool {
        match self.links.entry(shortcode.into()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LinkEntry)> {
        self.links.iter().map(|(code, entry)| (code.as_str(), entry))
    }

    /// Flatten to `code → url`, the shape served by `GET /links`.
    pub fn urls(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(code, entry)| (code.to_owned(), entry.url.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl FromIterator<(String, LinkEntry)> for LinkStore {
    fn from_iter<I: IntoIterator<Item = (String, LinkEntry)>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().collect(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────────────────

/// Characters allowed in a short code: ASCII letters, digits, `-` and `_`.
pub fn is_shortcode_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

pub fn is_reserved(code: &str) -> bool {
    RESERVED_CODES.contains(&code)
}

/// Check a caller-supplied short code.
pub fn validate_shortcode(code: &str) -> Result<(), RegistryError> {
    if code.is_empty() {
        return Err(RegistryError::InvalidShortcode(
            "short code must not be empty".into(),
        ));
    }
    if code.len() > MAX_SHORTCODE_LEN {
        return Err(RegistryError::InvalidShortcode(format!(
            "short code must be at most {MAX_SHORTCODE_LEN} characters, got {}",
            code.len()
        )));
    }
    if !code.chars().all(is_shortcode_char) {
        return Err(RegistryError::InvalidShortcode(format!(
            "short code may only contain letters, numbers, hyphens and underscores: '{code}'"
        )));
    }
    if is_reserved(code) {
        return Err(RegistryError::InvalidShortcode(format!(
            "'{code}' is reserved"
        )));
    }
    Ok(())
}

/// Check a target URL and return the trimmed form that gets stored.
///
/// The stored value is the caller's text, not `Url`'s normalized
/// serialization, so `https://example.com` does not come back with a
/// trailing slash.
pub fn validate_target_url(raw: &str) -> Result<String, RegistryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::InvalidUrl("URL must not be empty".into()));
    }

    // The URL parser silently drops tabs and newlines and escapes other
    // control characters, so they would survive validation here and then
    // fail as a `Location` header.
    if let Some(bad) = trimmed.chars().find(|c| c.is_control() || c.is_whitespace()) {
        return Err(RegistryError::InvalidUrl(format!(
            "URL must not contain whitespace or control characters, found {bad:?}"
        )));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| RegistryError::InvalidUrl(format!("{trimmed}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RegistryError::InvalidUrl(format!(
            "URL must start with http:// or https://, got scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(RegistryError::InvalidUrl(format!(
            "URL must include a host: {trimmed}"
        )));
    }

    Ok(trimmed.to_owned())
}
