//! Cache for idempotent Conduit queries
//!
//! Repository lookups, PHID resolution and revision edges are read many times
//! per invocation and rarely change. This module avoids repeating those
//! requests, within one run and across runs, by keying each call on a
//! [`Fingerprint`] of its operation name and normalized arguments and storing
//! the result in a [`CacheStore`] with an optional expiry.
//!
//! Caching is only an optimization: storage problems are logged and absorbed,
//! and failed fetches are never stored.

mod cached;
mod fingerprint;
mod store;

pub use cached::{CachedOp, CallCache};
pub use fingerprint::{CacheArg, Fingerprint, InvalidFingerprint, Scalar};
pub use store::{default_dir, CacheEntry, CacheStore, Clock, ManualClock, SystemClock};
