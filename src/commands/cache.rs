//! `rarc cache`

use std::io::Write;

use super::{write_lines, CommandError};
use crate::cache::CacheStore;
use crate::cli::CacheAction;

pub fn run<W: Write>(store: &CacheStore, action: CacheAction, out: &mut W) -> Result<(), CommandError> {
    let line = match action {
        CacheAction::Path => match store.dir() {
            Some(dir) => dir.display().to_string(),
            None => "(not persisted)".to_string(),
        },
        CacheAction::Clear => {
            let removed = store.clear().map_err(CommandError::ClearCache)?;
            tracing::info!(removed, "cleared query cache");
            format!("Removed {removed} cached queries")
        }
    };

    write_lines(out, [line])?;
    Ok(())
}
