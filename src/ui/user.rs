//! Rendering of users and resolved PHIDs

use super::Painter;
use crate::data::{PhidObject, User};

/// Lines printed by `whoami`
pub fn whoami_lines(user: &User, painter: &Painter, verbose: bool) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        painter.bold(&user.user_name),
        user.real_name
    )];

    if verbose {
        let email = user.primary_email.as_deref().unwrap_or("-");
        let uri = user.uri.as_deref().unwrap_or("-");
        lines.push(format!("  {}: {}", painter.label("phid"), user.phid));
        lines.push(format!("  {}: {email}", painter.label("primaryEmail")));
        lines.push(format!("  {}: {}", painter.label("roles"), user.roles.join(", ")));
        lines.push(format!("  {}: {uri}", painter.label("uri")));
    }
    lines
}

/// Lines printed by `phid` for one requested PHID
pub fn object_lines(phid: &str, object: Option<&PhidObject>, painter: &Painter) -> Vec<String> {
    match object {
        Some(object) => vec![
            format!(
                "{} {} [{}]",
                painter.bold(&object.full_name),
                object.type_name,
                object.status
            ),
            format!("  {}: {}", painter.label("phid"), object.phid),
            format!("  {}: {}", painter.label("uri"), object.uri),
        ],
        None => vec![format!("{phid}: unknown object")],
    }
}
