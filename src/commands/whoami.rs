//! `rarc whoami`

use std::io::Write;

use super::{write_lines, CommandError};
use crate::config::Settings;
use crate::data::{Conduit, Context};
use crate::ui::{whoami_lines, Painter};

/// Prints the user the API token belongs to
pub async fn run<C, W>(ctx: &Context<C>, settings: &Settings, out: &mut W) -> Result<(), CommandError>
where
    C: Conduit,
    W: Write,
{
    let user = ctx.whoami().await?;
    let painter = Painter::new(settings.color);
    write_lines(out, whoami_lines(&user, &painter, settings.verbose))?;
    Ok(())
}
