//! Subcommand implementations
//!
//! Each command takes its collaborators explicitly: a
//! [`Context`](crate::data::Context) for the remote API and cache, the
//! [`Settings`](crate::config::Settings), and the sink lines are written to.

pub mod cache;
pub mod diff;
pub mod phid;
pub mod whoami;

use std::io::{self, Write};

use thiserror::Error;

use crate::data::ConduitError;

/// Errors surfaced to the user by a command
#[derive(Debug, Error)]
pub enum CommandError {
    /// A Conduit call failed
    #[error(transparent)]
    Conduit(#[from] ConduitError),

    /// Writing the output failed
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),

    /// Removing persisted cache entries failed
    #[error("Failed to clear the cache: {0}")]
    ClearCache(io::Error),
}

/// Writes `lines` to `out` and flushes it
pub fn write_lines<W, I>(out: &mut W, lines: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = String>,
{
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}
