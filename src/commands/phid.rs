//! `rarc phid`

use std::io::Write;

use super::{write_lines, CommandError};
use crate::config::Settings;
use crate::data::{Conduit, Context};
use crate::ui::{object_lines, Painter};

/// Resolves and prints each PHID in order
pub async fn run<C, W>(
    ctx: &Context<C>,
    settings: &Settings,
    phids: &[String],
    out: &mut W,
) -> Result<(), CommandError>
where
    C: Conduit,
    W: Write,
{
    let painter = Painter::new(settings.color);
    for phid in phids {
        let object = ctx.object_by_phid(phid).await?;
        write_lines(out, object_lines(phid, object.as_ref(), &painter))?;
    }
    Ok(())
}
