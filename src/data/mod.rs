//! Typed records returned by the Conduit API
//!
//! Each remote resource kind has an explicit schema. Timestamps arrive as
//! epoch seconds and are decoded into `DateTime<Utc>` only at the fields known
//! to carry them.

pub mod conduit;
pub mod queries;

pub use conduit::{call, Conduit, ConduitClient, ConduitError};
pub use queries::Context;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope of every `*.search` method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults<T> {
    pub data: Vec<T>,
}

/// The authenticated user, as returned by `user.whoami`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub phid: String,
    pub user_name: String,
    pub real_name: String,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// A user as returned by `user.search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub phid: String,
    pub fields: UserFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFields {
    pub username: String,
    #[serde(default)]
    pub real_name: String,
}

/// A Diffusion repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub phid: String,
    pub fields: RepositoryFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryFields {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub callsign: Option<String>,
}

impl Repository {
    /// Short name if the repository has one, full name otherwise
    pub fn display_name(&self) -> &str {
        self.fields
            .short_name
            .as_deref()
            .unwrap_or(&self.fields.name)
    }
}

/// A Differential revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: u64,
    pub phid: String,
    pub fields: RevisionFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionFields {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub status: RevisionStatus,
    #[serde(rename = "authorPHID")]
    pub author_phid: String,
    #[serde(rename = "repositoryPHID", default)]
    pub repository_phid: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date_created: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date_modified: DateTime<Utc>,
}

/// Review status of a revision, e.g. "Needs Review"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionStatus {
    pub value: String,
    pub name: String,
    #[serde(default)]
    pub closed: bool,
    /// ANSI color name the web UI uses for this status
    #[serde(rename = "color.ansi", default)]
    pub color_ansi: Option<String>,
}

/// A relationship between two objects, as returned by `edge.search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "sourcePHID")]
    pub source_phid: String,
    #[serde(rename = "edgeType")]
    pub edge_type: String,
    #[serde(rename = "destinationPHID")]
    pub destination_phid: String,
}

/// An entry of an object's timeline, as returned by `transaction.search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub phid: String,
    /// Transaction kind; `None` for kinds the API does not expose
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "authorPHID")]
    pub author_phid: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(rename = "dateCreated", with = "chrono::serde::ts_seconds")]
    pub date_created: DateTime<Utc>,
}

impl Transaction {
    pub fn is_comment(&self) -> bool {
        self.kind.as_deref() == Some("comment")
    }
}

/// One version of a comment; newest versions come first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub phid: String,
    #[serde(default)]
    pub version: u64,
    #[serde(rename = "authorPHID")]
    pub author_phid: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date_created: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date_modified: DateTime<Utc>,
    #[serde(default)]
    pub removed: bool,
    pub content: CommentContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentContent {
    pub raw: String,
}

/// Any object resolved through `phid.query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhidObject {
    pub phid: String,
    pub uri: String,
    pub type_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub full_name: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_revision_from_conduit_json() {
        let revision: Revision = serde_json::from_value(json!({
            "id": 42,
            "type": "DREV",
            "phid": "PHID-DREV-abc",
            "fields": {
                "title": "Add a cache",
                "uri": "https://phab.example.com/D42",
                "authorPHID": "PHID-USER-1",
                "status": {
                    "value": "needs-review",
                    "name": "Needs Review",
                    "closed": false,
                    "color.ansi": "magenta"
                },
                "repositoryPHID": "PHID-REPO-1",
                "summary": "Line one\nLine two",
                "dateCreated": 1_600_000_000,
                "dateModified": 1_600_000_600
            },
            "attachments": {}
        }))
        .expect("Failed to deserialize Revision");

        assert_eq!(revision.id, 42);
        assert_eq!(revision.fields.status.name, "Needs Review");
        assert_eq!(revision.fields.status.color_ansi.as_deref(), Some("magenta"));
        assert_eq!(revision.fields.repository_phid.as_deref(), Some("PHID-REPO-1"));
        assert_eq!(
            revision.fields.date_created,
            Utc.timestamp_opt(1_600_000_000, 0).unwrap()
        );
        assert_eq!(
            revision.fields.date_modified,
            Utc.timestamp_opt(1_600_000_600, 0).unwrap()
        );
    }

    #[test]
    fn test_revision_without_repository() {
        let revision: Revision = serde_json::from_value(json!({
            "id": 1,
            "phid": "PHID-DREV-1",
            "fields": {
                "title": "Orphan",
                "authorPHID": "PHID-USER-1",
                "status": {"value": "draft", "name": "Draft"},
                "repositoryPHID": null,
                "dateCreated": 0,
                "dateModified": 0
            }
        }))
        .unwrap();

        assert!(revision.fields.repository_phid.is_none());
        assert!(revision.fields.summary.is_empty());
        assert!(revision.fields.status.color_ansi.is_none());
    }

    #[test]
    fn test_revision_roundtrip_keeps_epoch_seconds() {
        let revision: Revision = serde_json::from_value(json!({
            "id": 3,
            "phid": "PHID-DREV-3",
            "fields": {
                "title": "t",
                "authorPHID": "PHID-USER-1",
                "status": {"value": "accepted", "name": "Accepted"},
                "dateCreated": 1_700_000_000,
                "dateModified": 1_700_000_001
            }
        }))
        .unwrap();

        let value = serde_json::to_value(&revision).unwrap();
        assert_eq!(value["fields"]["dateCreated"], json!(1_700_000_000));
        assert_eq!(value["fields"]["authorPHID"], json!("PHID-USER-1"));
    }

    #[test]
    fn test_whoami_user() {
        let user: User = serde_json::from_value(json!({
            "phid": "PHID-USER-1",
            "userName": "alice",
            "realName": "Alice Liddell",
            "image": "https://phab.example.com/file/alice.png",
            "uri": "https://phab.example.com/p/alice/",
            "roles": ["verified", "approved", "activated"],
            "primaryEmail": "alice@example.com"
        }))
        .unwrap();

        assert_eq!(user.user_name, "alice");
        assert_eq!(user.real_name, "Alice Liddell");
        assert_eq!(user.roles.len(), 3);
        assert_eq!(user.primary_email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_repository_display_name() {
        let mut repo: Repository = serde_json::from_value(json!({
            "id": 7,
            "phid": "PHID-REPO-7",
            "fields": {"name": "Demo Project", "shortName": "demo", "callsign": "DEMO"}
        }))
        .unwrap();
        assert_eq!(repo.display_name(), "demo");

        repo.fields.short_name = None;
        assert_eq!(repo.display_name(), "Demo Project");
    }

    #[test]
    fn test_transaction_with_comments() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": 10,
            "phid": "PHID-XACT-DREV-10",
            "type": "comment",
            "authorPHID": "PHID-USER-2",
            "objectPHID": "PHID-DREV-1",
            "dateCreated": 1_600_000_000,
            "dateModified": 1_600_000_000,
            "comments": [{
                "id": 5,
                "phid": "PHID-XCMT-5",
                "version": 2,
                "authorPHID": "PHID-USER-2",
                "dateCreated": 1_600_000_000,
                "dateModified": 1_600_000_100,
                "removed": false,
                "content": {"raw": "Looks good"}
            }],
            "fields": {}
        }))
        .unwrap();

        assert!(tx.is_comment());
        assert_eq!(tx.comments[0].content.raw, "Looks good");
        assert_eq!(tx.comments[0].version, 2);
    }

    #[test]
    fn test_transaction_with_null_type_is_not_a_comment() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": 11,
            "phid": "PHID-XACT-DREV-11",
            "type": null,
            "authorPHID": "PHID-USER-2",
            "dateCreated": 0,
            "comments": []
        }))
        .unwrap();
        assert!(!tx.is_comment());
    }

    #[test]
    fn test_phid_object() {
        let object: PhidObject = serde_json::from_value(json!({
            "phid": "PHID-DREV-1",
            "uri": "https://phab.example.com/D1",
            "typeName": "Differential Revision",
            "type": "DREV",
            "name": "D1",
            "fullName": "D1: Add a cache",
            "status": "open"
        }))
        .unwrap();

        assert_eq!(object.kind, "DREV");
        assert_eq!(object.full_name, "D1: Add a cache");
    }
}
