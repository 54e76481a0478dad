//! Rendering of Differential revisions
//!
//! Commands gather everything a revision needs to be displayed into a
//! [`RevisionView`] first, so the fetched records stay untouched and the
//! rendering below stays pure.

use chrono::{DateTime, Utc};
use crossterm::style::Color;

use super::{ansi_color, natural_delta, truncate, Painter};
use crate::data::{Comment, Repository, Revision, Transaction};

/// Width of the status column
const STATUS_WIDTH: usize = 25;
/// Width of the repository column in summaries
const REPO_WIDTH: usize = 16;
/// Width of the author column in summaries
const AUTHOR_WIDTH: usize = 12;

/// A comment ready to display
#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
    pub author: String,
    pub modified: DateTime<Utc>,
    pub text: String,
}

/// Repository name and callsign shown next to a revision
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryLabel {
    pub short_name: String,
    pub callsign: Option<String>,
}

impl From<&Repository> for RepositoryLabel {
    fn from(repo: &Repository) -> Self {
        Self {
            short_name: repo.display_name().to_string(),
            callsign: repo.fields.callsign.clone(),
        }
    }
}

/// Everything displayed about one revision
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionView {
    pub id: u64,
    pub phid: String,
    pub title: String,
    pub summary: String,
    pub status: String,
    /// Terminal color of the status, from the server's `color.ansi`
    pub status_color: Option<Color>,
    pub author: String,
    /// Whether the revision belongs to the current user
    pub is_mine: bool,
    pub repository: Option<RepositoryLabel>,
    /// Ids of the listed revisions this one depends on
    pub depends_on: Vec<u64>,
    /// Ids of the listed revisions depending on this one
    pub blocks: Vec<u64>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    /// `None` when comments were not requested
    pub comments: Option<Vec<CommentView>>,
}

impl RevisionView {
    pub fn new(revision: &Revision, author: impl Into<String>, is_mine: bool) -> Self {
        let fields = &revision.fields;
        Self {
            id: revision.id,
            phid: revision.phid.clone(),
            title: fields.title.clone(),
            summary: fields.summary.clone(),
            status: fields.status.name.clone(),
            status_color: fields.status.color_ansi.as_deref().and_then(ansi_color),
            author: author.into(),
            is_mine,
            repository: None,
            depends_on: Vec::new(),
            blocks: Vec::new(),
            created: fields.date_created,
            modified: fields.date_modified,
            comments: None,
        }
    }

    fn styled_id(&self, painter: &Painter) -> String {
        painter.bold(&format!("D{}", self.id))
    }

    fn styled_status(&self, painter: &Painter, width: usize) -> String {
        painter.paint(&format!("{:<width$}", self.status), self.status_color, true)
    }

    fn styled_author(&self, painter: &Painter, text: &str) -> String {
        let color = if self.is_mine {
            Color::DarkRed
        } else {
            Color::DarkYellow
        };
        painter.paint(text, Some(color), true)
    }
}

/// The latest visible version of every comment in a timeline
pub fn latest_comments(transactions: &[Transaction]) -> Vec<&Comment> {
    transactions
        .iter()
        .filter(|tx| tx.is_comment())
        .filter_map(|tx| tx.comments.iter().find(|comment| !comment.removed))
        .collect()
}

/// One-entry listing used by `diff --summary`
///
/// With `show_repository`, the repository and author are added and the title
/// moves to its own indented line.
pub fn summary_line(view: &RevisionView, painter: &Painter, show_repository: bool) -> Vec<String> {
    let id = view.styled_id(painter);
    let status = view.styled_status(painter, STATUS_WIDTH);

    if !show_repository {
        return vec![format!("{id} {status} {}", view.title)];
    }

    let repo = view
        .repository
        .as_ref()
        .map(|repo| repo.short_name.as_str())
        .unwrap_or("-");
    let author = view.styled_author(painter, &format!("{:<AUTHOR_WIDTH$}", view.author));
    vec![
        format!("{id} {repo:<REPO_WIDTH$} {status} {author}")
            .trim_end()
            .to_string(),
        format!("\t{}", view.title),
    ]
}

/// Detailed listing used by `diff`
pub fn full_lines(
    view: &RevisionView,
    painter: &Painter,
    now: DateTime<Utc>,
    width: usize,
) -> Vec<String> {
    let mut lines = Vec::new();

    let header = format!("{:<STATUS_WIDTH$} D{}", view.status, view.id);
    if header.chars().count() > width {
        lines.push(painter.paint(&truncate(&header, width), view.status_color, true));
    } else {
        lines.push(format!(
            "{} {}",
            view.styled_status(painter, STATUS_WIDTH),
            view.styled_id(painter)
        ));
    }

    if !view.depends_on.is_empty() {
        lines.push(format!("{}: {}", painter.label("Depends on"), revision_ids(&view.depends_on)));
    }
    if !view.blocks.is_empty() {
        lines.push(format!("{}: {}", painter.label("Blocks"), revision_ids(&view.blocks)));
    }

    if let Some(repo) = &view.repository {
        let name = match &repo.callsign {
            Some(callsign) => format!("{} ({callsign})", repo.short_name),
            None => repo.short_name.clone(),
        };
        lines.push(format!("{}: {name}", painter.label("Repo")));
    }

    lines.push(format!(
        "{}: {}",
        painter.label("Author"),
        view.styled_author(painter, &view.author)
    ));
    lines.push(format!(
        "{}: {} ago",
        painter.label("Created"),
        natural_delta(now - view.created)
    ));
    lines.push(format!(
        "{}: {} ago",
        painter.label("Modified"),
        natural_delta(now - view.modified)
    ));

    lines.push(painter.label("Summary:"));
    lines.push(format!("  {}", painter.bold(&view.title)));
    lines.push(String::new());
    lines.extend(view.summary.lines().map(|line| format!("  {line}")));
    lines.push(String::new());

    if let Some(comments) = &view.comments {
        lines.push(painter.label("Comments:"));
        for comment in comments {
            let author = painter.paint(&format!("{}:", comment.author), Some(Color::DarkYellow), true);
            lines.push(format!(
                "{author} modified {} ago",
                natural_delta(now - comment.modified)
            ));
            lines.extend(comment.text.lines().map(|line| format!("  {line}")));
        }
    }

    lines
}

fn revision_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("D{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}
