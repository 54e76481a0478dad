//! `rarc diff`
//!
//! Lists open revisions. Inside a git working copy the listing is limited to
//! the Diffusion repositories matching the local remotes, unless
//! `--all-repos` is given. Outside of one, every repository is listed.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use futures::future::try_join_all;

use super::{write_lines, CommandError};
use crate::cli::DiffArgs;
use crate::config::Settings;
use crate::data::{Conduit, ConduitError, Context, Revision, User};
use crate::ui::{
    full_lines, latest_comments, summary_line, terminal_width, CommentView, Painter,
    RepositoryLabel, RevisionView,
};
use crate::vcs;

/// Lists open revisions according to `args`
///
/// `workdir` is the directory whose git remotes narrow the listing.
pub async fn run<C, W>(
    ctx: &Context<C>,
    settings: &Settings,
    args: &DiffArgs,
    workdir: &Path,
    out: &mut W,
) -> Result<(), CommandError>
where
    C: Conduit,
    W: Write,
{
    let me = ctx.whoami().await?;

    let repository_phids = if args.all_repos {
        None
    } else {
        local_repositories(ctx, workdir).await?
    };
    let author_phids = args.mine_only.then(|| vec![me.phid.clone()]);

    let mut revisions = ctx
        .open_revisions(repository_phids.as_deref(), author_phids.as_deref())
        .await?;
    revisions.sort_by_key(|revision| revision.id);
    tracing::debug!(count = revisions.len(), "fetched open revisions");

    let listed: HashMap<&str, u64> = revisions
        .iter()
        .map(|revision| (revision.phid.as_str(), revision.id))
        .collect();
    let views = try_join_all(
        revisions
            .iter()
            .map(|revision| build_view(ctx, args, &me, revision, &listed)),
    )
    .await?;

    let painter = Painter::new(settings.color);
    let now = Utc::now();
    let width = terminal_width();
    for view in &views {
        let lines = if args.summary {
            summary_line(view, &painter, args.all_repos)
        } else {
            full_lines(view, &painter, now, width)
        };
        write_lines(out, lines)?;
    }
    Ok(())
}

/// PHIDs of the Diffusion repositories cloned in `workdir`
///
/// Returns `None` when the listing should not be narrowed: outside of a
/// working copy, without remotes, or when no remote is known to the server.
async fn local_repositories<C: Conduit>(
    ctx: &Context<C>,
    workdir: &Path,
) -> Result<Option<Vec<String>>, ConduitError> {
    let urls = match vcs::remote_urls(workdir) {
        Ok(urls) => urls,
        Err(err) => {
            tracing::debug!("{err}, listing revisions of every repository");
            return Ok(None);
        }
    };
    if urls.is_empty() {
        return Ok(None);
    }

    let repositories = ctx.repositories_by_uri(&urls).await?;
    if repositories.is_empty() {
        tracing::debug!(?urls, "no known repository for the local remotes");
        return Ok(None);
    }
    Ok(Some(repositories.into_iter().map(|repo| repo.phid).collect()))
}

async fn build_view<C: Conduit>(
    ctx: &Context<C>,
    args: &DiffArgs,
    me: &User,
    revision: &Revision,
    listed: &HashMap<&str, u64>,
) -> Result<RevisionView, ConduitError> {
    let fields = &revision.fields;
    let author = username(ctx, &fields.author_phid).await?;
    let mut view = RevisionView::new(revision, author, fields.author_phid == me.phid);

    // Summaries only name the repository when several can be listed.
    let wants_repository = !args.summary || args.all_repos;
    if let (true, Some(repo_phid)) = (wants_repository, &fields.repository_phid) {
        view.repository = ctx
            .repository_by_phid(repo_phid)
            .await?
            .as_ref()
            .map(RepositoryLabel::from);
    }

    if args.stack {
        view.depends_on = listed_ids(ctx.revision_parents(&revision.phid).await?, listed);
        view.blocks = listed_ids(ctx.revision_children(&revision.phid).await?, listed);
    }

    if args.comments {
        let transactions = ctx.revision_transactions(&revision.phid).await?;
        let mut comments = Vec::new();
        for comment in latest_comments(&transactions) {
            comments.push(CommentView {
                author: username(ctx, &comment.author_phid).await?,
                modified: comment.date_modified,
                text: comment.content.raw.clone(),
            });
        }
        view.comments = Some(comments);
    }

    Ok(view)
}

/// Username for a user PHID, or the PHID itself if the user is unknown
async fn username<C: Conduit>(ctx: &Context<C>, phid: &str) -> Result<String, ConduitError> {
    Ok(ctx
        .user_by_phid(phid)
        .await?
        .map(|user| user.fields.username)
        .unwrap_or_else(|| phid.to_string()))
}

/// Ids of the revisions among `phids` that are part of the listing
fn listed_ids(phids: Vec<String>, listed: &HashMap<&str, u64>) -> Vec<u64> {
    phids
        .iter()
        .filter_map(|phid| listed.get(phid.as_str()).copied())
        .collect()
}
