//! File descriptors and their path encoding.
//!
//! A descriptor travels inside the request path as
//! `name|size|fingerprint[?storage_key]`. The storage key may also be given as
//! `key=value` (`?s3keyflag=abc`); older producers wrote it that way.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FIELD_SEPARATOR: char = '|';
const QUERY_SEPARATOR: char = '?';

/// An opaque reference to a file held by the upstream storage service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    name: String,
    size: u64,
    fingerprint: String,
    storage_key: String,
}

impl FileDescriptor {
    /// Build a descriptor, normalizing the fingerprint to lower case.
    pub fn new(
        name: impl Into<String>,
        size: u64,
        fingerprint: impl AsRef<str>,
        storage_key: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let storage_key = storage_key.into();
        let fingerprint = fingerprint.as_ref();

        let display = format!("{name}|{size}|{fingerprint}?{storage_key}");
        if name.contains([FIELD_SEPARATOR, QUERY_SEPARATOR]) {
            return Err(Error::invalid_descriptor(
                &display,
                "name must not contain '|' or '?'",
            ));
        }
        if storage_key.contains(['&', '=', FIELD_SEPARATOR, QUERY_SEPARATOR]) {
            return Err(Error::invalid_descriptor(
                &display,
                "storage key must not contain '&', '=', '|' or '?'",
            ));
        }

        Ok(Self {
            name,
            size,
            fingerprint: normalize_fingerprint(&display, fingerprint)?,
            storage_key,
        })
    }

    /// Parse the path encoding of a descriptor.
    pub fn parse(raw: &str) -> Result<Self> {
        let (base, query) = match raw.split_once(QUERY_SEPARATOR) {
            Some((base, query)) => (base, Some(query)),
            None => (raw, None),
        };

        let fields: Vec<&str> = base.split(FIELD_SEPARATOR).collect();
        let [name, size, fingerprint] = fields.as_slice() else {
            return Err(Error::invalid_descriptor(
                raw,
                format!("expected 3 '|'-separated fields, found {}", fields.len()),
            ));
        };

        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_descriptor(
                raw,
                format!("size {size:?} is not a non-negative integer"),
            ));
        }
        let size: u64 = size
            .parse()
            .map_err(|e| Error::invalid_descriptor(raw, format!("size out of range: {e}")))?;

        let storage_key = query.map(storage_key_from_query).unwrap_or_default();

        Ok(Self {
            name: (*name).to_string(),
            size,
            fingerprint: normalize_fingerprint(raw, fingerprint)?,
            storage_key: storage_key.to_string(),
        })
    }

    /// Display name of the file. Informational only.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes. Informational only.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lower-case content hash.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Upstream storage key; empty when the producer did not supply one.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// The identity under which resolutions of this file are cached.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            fingerprint: self.fingerprint.clone(),
            storage_key: self.storage_key.clone(),
        }
    }
}

impl fmt::Display for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.name, self.size, self.fingerprint)?;
        if !self.storage_key.is_empty() {
            write!(f, "?{}", self.storage_key)?;
        }
        Ok(())
    }
}

impl FromStr for FileDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Take the first non-empty query segment, unwrapping `key=value` to `value`.
fn storage_key_from_query(query: &str) -> &str {
    let segment = query.split('&').find(|s| !s.is_empty()).unwrap_or("");
    match segment.split_once('=') {
        Some((_, value)) => value,
        None => segment,
    }
}

fn normalize_fingerprint(raw: &str, fingerprint: &str) -> Result<String> {
    if fingerprint.is_empty() {
        return Err(Error::invalid_descriptor(raw, "fingerprint is empty"));
    }
    if !fingerprint.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::invalid_descriptor(
            raw,
            format!("fingerprint {fingerprint:?} is not hexadecimal"),
        ));
    }
    Ok(fingerprint.to_ascii_lowercase())
}

/// Cache identity of a resolved download URL.
///
/// Name and size are left out: the upstream de-duplicates files by content hash
/// and storage key, so two descriptors differing only in name resolve alike.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub fingerprint: String,
    pub storage_key: String,
}

impl CacheKey {
    pub fn new(fingerprint: impl Into<String>, storage_key: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            storage_key: storage_key.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.fingerprint, self.storage_key)
    }
}
