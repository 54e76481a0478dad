//! Cache keys derived from an operation name and its call arguments
//!
//! Arguments are normalized before hashing: a scalar and a one-element
//! sequence holding the same scalar are the same argument, and sequences are
//! compared as sets (order and duplicates do not matter). Conduit search
//! constraints are order-insensitive filters, so two calls that only differ in
//! the order of their PHIDs or URIs return the same data.

use std::collections::BTreeSet;
use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A single scalar value taking part in a fingerprint
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Str(String),
}

/// One argument of a cached call, as passed by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheArg {
    /// A bare value, e.g. a single PHID
    Scalar(Scalar),
    /// A list of values, e.g. the URIs of every local remote
    Seq(Vec<Scalar>),
}

impl CacheArg {
    /// Returns the argument as a sorted, de-duplicated set of scalars
    fn normalized(&self) -> BTreeSet<&Scalar> {
        match self {
            CacheArg::Scalar(value) => BTreeSet::from([value]),
            CacheArg::Seq(values) => values.iter().collect(),
        }
    }
}

impl From<&str> for CacheArg {
    fn from(value: &str) -> Self {
        CacheArg::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for CacheArg {
    fn from(value: String) -> Self {
        CacheArg::Scalar(Scalar::Str(value))
    }
}

impl From<&String> for CacheArg {
    fn from(value: &String) -> Self {
        CacheArg::Scalar(Scalar::Str(value.clone()))
    }
}

impl From<i64> for CacheArg {
    fn from(value: i64) -> Self {
        CacheArg::Scalar(Scalar::Int(value))
    }
}

impl From<u64> for CacheArg {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(value) => CacheArg::Scalar(Scalar::Int(value)),
            Err(_) => CacheArg::Scalar(Scalar::Str(value.to_string())),
        }
    }
}

impl From<Vec<String>> for CacheArg {
    fn from(values: Vec<String>) -> Self {
        CacheArg::Seq(values.into_iter().map(Scalar::Str).collect())
    }
}

impl From<&[String]> for CacheArg {
    fn from(values: &[String]) -> Self {
        CacheArg::Seq(values.iter().cloned().map(Scalar::Str).collect())
    }
}

impl From<&[&str]> for CacheArg {
    fn from(values: &[&str]) -> Self {
        CacheArg::Seq(values.iter().map(|v| Scalar::Str(v.to_string())).collect())
    }
}

/// Error returned when parsing a fingerprint from its hex form
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid fingerprint: {0:?}")]
pub struct InvalidFingerprint(pub String);

/// An opaque, stable cache key
///
/// Two fingerprints are equal when they were built from the same operation
/// name and the same normalized arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Builds the fingerprint of `operation` called with `args`.
    pub fn new(operation: &str, args: &[CacheArg]) -> Self {
        let mut metadata = String::new();
        // Writing into a String never fails.
        let _ = writeln!(metadata, "op: {operation}");
        for (index, arg) in args.iter().enumerate() {
            let values = serde_json::to_string(&arg.normalized()).unwrap_or_default();
            let _ = writeln!(metadata, "arg[{index}]: {values}");
        }

        Fingerprint(Sha256::digest(metadata.as_bytes()).into())
    }

    /// Returns the lowercase hex form used for file names on disk.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for b in &self.0 {
            let _ = write!(out, "{b:02x}");
        }
        out
    }

    /// Parses a fingerprint from its 64-character hex form.
    pub fn from_hex(s: &str) -> Result<Self, InvalidFingerprint> {
        let invalid = || InvalidFingerprint(s.to_string());
        if s.len() != 64 || !s.is_ascii() {
            return Err(invalid());
        }

        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Fingerprint(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = InvalidFingerprint;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Fingerprint::from_hex(&value)
    }
}
