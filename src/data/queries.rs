//! Read queries against Conduit, cached where the data allows it
//!
//! Repository and user lookups are keyed by immutable PHIDs or URIs and are
//! cached without expiry. Revision stack edges change as authors rebase, so
//! they are only kept for a few minutes. Revision lists, timelines and the
//! current user are always fetched fresh.

use std::collections::HashMap;

use serde_json::json;

use super::conduit::{call, Conduit, ConduitError};
use super::{Edge, PhidObject, Repository, Revision, SearchResults, Transaction, User, UserRecord};
use crate::cache::{CachedOp, CallCache};

/// Seconds revision edges stay cached
pub const EDGE_TTL_SECS: u64 = 300;

pub const REPOSITORIES_BY_URI: CachedOp = CachedOp::new("diffusion.repository.search/uris");
pub const REPOSITORY_BY_PHID: CachedOp = CachedOp::new("diffusion.repository.search/phids");
pub const REVISION_PARENTS: CachedOp = CachedOp::expiring("edge.search/revision.parent", EDGE_TTL_SECS);
pub const REVISION_CHILDREN: CachedOp = CachedOp::expiring("edge.search/revision.child", EDGE_TTL_SECS);
pub const USER_BY_PHID: CachedOp = CachedOp::new("user.search/phids");
pub const OBJECT_BY_PHID: CachedOp = CachedOp::new("phid.query");

/// Everything a command needs to talk to the service
///
/// Built once in `main` and passed down explicitly.
#[derive(Debug)]
pub struct Context<C> {
    pub conduit: C,
    pub cache: CallCache,
}

impl<C: Conduit> Context<C> {
    pub fn new(conduit: C, cache: CallCache) -> Self {
        Self { conduit, cache }
    }

    /// Repositories having any of `uris` as a clone or mirror URI
    pub async fn repositories_by_uri(&self, uris: &[String]) -> Result<Vec<Repository>, ConduitError> {
        let conduit = &self.conduit;
        self.cache
            .get_or_fetch(&REPOSITORIES_BY_URI, &[uris.into()], move || async move {
                let results: SearchResults<Repository> = call(
                    conduit,
                    "diffusion.repository.search",
                    json!({ "constraints": { "uris": uris } }),
                )
                .await?;
                Ok(results.data)
            })
            .await
    }

    /// The repository with the given PHID, if it exists
    pub async fn repository_by_phid(&self, phid: &str) -> Result<Option<Repository>, ConduitError> {
        let conduit = &self.conduit;
        self.cache
            .get_or_fetch(&REPOSITORY_BY_PHID, &[phid.into()], move || async move {
                let results: SearchResults<Repository> = call(
                    conduit,
                    "diffusion.repository.search",
                    json!({ "constraints": { "phids": [phid] } }),
                )
                .await?;
                Ok(results.data.into_iter().next())
            })
            .await
    }

    /// PHIDs of the revisions `phid` depends on
    pub async fn revision_parents(&self, phid: &str) -> Result<Vec<String>, ConduitError> {
        self.edges(&REVISION_PARENTS, "revision.parent", phid).await
    }

    /// PHIDs of the revisions depending on `phid`
    pub async fn revision_children(&self, phid: &str) -> Result<Vec<String>, ConduitError> {
        self.edges(&REVISION_CHILDREN, "revision.child", phid).await
    }

    async fn edges(
        &self,
        op: &CachedOp,
        edge_type: &str,
        phid: &str,
    ) -> Result<Vec<String>, ConduitError> {
        let conduit = &self.conduit;
        self.cache
            .get_or_fetch(op, &[phid.into()], move || async move {
                let results: SearchResults<Edge> = call(
                    conduit,
                    "edge.search",
                    json!({ "types": [edge_type], "sourcePHIDs": [phid] }),
                )
                .await?;
                Ok(results
                    .data
                    .into_iter()
                    .map(|edge| edge.destination_phid)
                    .collect())
            })
            .await
    }

    /// The user with the given PHID, if it exists
    pub async fn user_by_phid(&self, phid: &str) -> Result<Option<UserRecord>, ConduitError> {
        let conduit = &self.conduit;
        self.cache
            .get_or_fetch(&USER_BY_PHID, &[phid.into()], move || async move {
                let results: SearchResults<UserRecord> = call(
                    conduit,
                    "user.search",
                    json!({ "constraints": { "phids": [phid] } }),
                )
                .await?;
                Ok(results.data.into_iter().next())
            })
            .await
    }

    /// Resolves any object by PHID
    pub async fn object_by_phid(&self, phid: &str) -> Result<Option<PhidObject>, ConduitError> {
        let conduit = &self.conduit;
        self.cache
            .get_or_fetch(&OBJECT_BY_PHID, &[phid.into()], move || async move {
                let mut objects: HashMap<String, PhidObject> =
                    call(conduit, "phid.query", json!({ "phids": [phid] })).await?;
                Ok(objects.remove(phid))
            })
            .await
    }

    /// The user the API token belongs to
    pub async fn whoami(&self) -> Result<User, ConduitError> {
        call(&self.conduit, "user.whoami", json!({})).await
    }

    /// Open revisions, optionally limited to some repositories and authors
    pub async fn open_revisions(
        &self,
        repository_phids: Option<&[String]>,
        author_phids: Option<&[String]>,
    ) -> Result<Vec<Revision>, ConduitError> {
        let mut constraints = json!({ "statuses": ["open()"] });
        if let Some(phids) = repository_phids {
            constraints["repositoryPHIDs"] = json!(phids);
        }
        if let Some(phids) = author_phids {
            constraints["authorPHIDs"] = json!(phids);
        }

        let results: SearchResults<Revision> = call(
            &self.conduit,
            "differential.revision.search",
            json!({ "constraints": constraints }),
        )
        .await?;
        Ok(results.data)
    }

    /// The timeline of a revision
    pub async fn revision_transactions(&self, phid: &str) -> Result<Vec<Transaction>, ConduitError> {
        let results: SearchResults<Transaction> = call(
            &self.conduit,
            "transaction.search",
            json!({ "objectIdentifier": phid }),
        )
        .await?;
        Ok(results.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::Value;

    /// Serves canned results per method and records every call
    #[derive(Default)]
    struct StubConduit {
        results: HashMap<&'static str, Value>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl StubConduit {
        fn with(mut self, method: &'static str, result: Value) -> Self {
            self.results.insert(method, result);
            self
        }

        fn count(&self, method: &str) -> usize {
            self.calls.lock().iter().filter(|(m, _)| m == method).count()
        }

        fn last_params(&self, method: &str) -> Option<Value> {
            self.calls
                .lock()
                .iter()
                .rev()
                .find(|(m, _)| m == method)
                .map(|(_, p)| p.clone())
        }
    }

    impl Conduit for StubConduit {
        async fn call_raw(&self, method: &str, params: Value) -> Result<Value, ConduitError> {
            self.calls.lock().push((method.to_string(), params));
            self.results.get(method).cloned().ok_or_else(|| ConduitError::Api {
                code: "ERR-CONDUIT-CALL".to_string(),
                info: format!("no such method {method}"),
            })
        }
    }

    fn repo_json(phid: &str, short_name: &str) -> Value {
        json!({
            "id": 1,
            "phid": phid,
            "fields": {"name": short_name, "shortName": short_name, "callsign": null}
        })
    }

    fn context(stub: StubConduit) -> Context<StubConduit> {
        Context::new(stub, CallCache::in_memory())
    }

    #[tokio::test]
    async fn test_repository_by_phid_is_cached() {
        let ctx = context(StubConduit::default().with(
            "diffusion.repository.search",
            json!({"data": [repo_json("PHID-REPO-1", "demo")]}),
        ));

        let first = ctx.repository_by_phid("PHID-REPO-1").await.unwrap().unwrap();
        let second = ctx.repository_by_phid("PHID-REPO-1").await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.display_name(), "demo");
        assert_eq!(ctx.conduit.count("diffusion.repository.search"), 1);
        assert_eq!(
            ctx.conduit.last_params("diffusion.repository.search").unwrap(),
            json!({"constraints": {"phids": ["PHID-REPO-1"]}})
        );
    }

    #[tokio::test]
    async fn test_missing_repository_is_none() {
        let ctx = context(
            StubConduit::default().with("diffusion.repository.search", json!({"data": []})),
        );
        assert!(ctx.repository_by_phid("PHID-REPO-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repositories_by_uri_ignores_uri_order() {
        let ctx = context(StubConduit::default().with(
            "diffusion.repository.search",
            json!({"data": [repo_json("PHID-REPO-1", "demo")]}),
        ));

        let a = vec!["ssh://a/demo.git".to_string(), "https://b/demo".to_string()];
        let b = vec!["https://b/demo".to_string(), "ssh://a/demo.git".to_string()];
        ctx.repositories_by_uri(&a).await.unwrap();
        ctx.repositories_by_uri(&b).await.unwrap();

        assert_eq!(ctx.conduit.count("diffusion.repository.search"), 1);
    }

    #[tokio::test]
    async fn test_parent_and_child_edges_are_cached_separately() {
        let ctx = context(StubConduit::default().with(
            "edge.search",
            json!({"data": [{
                "sourcePHID": "PHID-DREV-1",
                "edgeType": "revision.parent",
                "destinationPHID": "PHID-DREV-0"
            }]}),
        ));

        let parents = ctx.revision_parents("PHID-DREV-1").await.unwrap();
        assert_eq!(parents, vec!["PHID-DREV-0".to_string()]);
        assert_eq!(
            ctx.conduit.last_params("edge.search").unwrap(),
            json!({"types": ["revision.parent"], "sourcePHIDs": ["PHID-DREV-1"]})
        );

        ctx.revision_children("PHID-DREV-1").await.unwrap();
        assert_eq!(
            ctx.conduit.last_params("edge.search").unwrap()["types"],
            json!(["revision.child"])
        );

        ctx.revision_parents("PHID-DREV-1").await.unwrap();
        ctx.revision_children("PHID-DREV-1").await.unwrap();
        assert_eq!(ctx.conduit.count("edge.search"), 2);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_retried() {
        let ctx = context(StubConduit::default());

        assert!(ctx.user_by_phid("PHID-USER-1").await.is_err());
        assert!(ctx.user_by_phid("PHID-USER-1").await.is_err());
        assert_eq!(ctx.conduit.count("user.search"), 2);
    }

    #[tokio::test]
    async fn test_object_by_phid() {
        let ctx = context(StubConduit::default().with(
            "phid.query",
            json!({"PHID-DREV-1": {
                "phid": "PHID-DREV-1",
                "uri": "https://phab.example.com/D1",
                "typeName": "Differential Revision",
                "type": "DREV",
                "name": "D1",
                "fullName": "D1: Add a cache",
                "status": "open"
            }}),
        ));

        let object = ctx.object_by_phid("PHID-DREV-1").await.unwrap().unwrap();
        assert_eq!(object.name, "D1");
        assert!(ctx.object_by_phid("PHID-DREV-2").await.unwrap().is_none());
        ctx.object_by_phid("PHID-DREV-1").await.unwrap();
        assert_eq!(ctx.conduit.count("phid.query"), 2);
    }

    #[tokio::test]
    async fn test_open_revisions_constraints() {
        let ctx = context(
            StubConduit::default().with("differential.revision.search", json!({"data": []})),
        );

        ctx.open_revisions(None, None).await.unwrap();
        assert_eq!(
            ctx.conduit.last_params("differential.revision.search").unwrap(),
            json!({"constraints": {"statuses": ["open()"]}})
        );

        let repos = vec!["PHID-REPO-1".to_string()];
        let authors = vec!["PHID-USER-1".to_string()];
        ctx.open_revisions(Some(&repos), Some(&authors)).await.unwrap();
        assert_eq!(
            ctx.conduit.last_params("differential.revision.search").unwrap(),
            json!({"constraints": {
                "statuses": ["open()"],
                "repositoryPHIDs": ["PHID-REPO-1"],
                "authorPHIDs": ["PHID-USER-1"]
            }})
        );
    }

    #[tokio::test]
    async fn test_revision_lists_are_not_cached() {
        let ctx = context(
            StubConduit::default().with("differential.revision.search", json!({"data": []})),
        );
        ctx.open_revisions(None, None).await.unwrap();
        ctx.open_revisions(None, None).await.unwrap();
        assert_eq!(ctx.conduit.count("differential.revision.search"), 2);
    }
}
