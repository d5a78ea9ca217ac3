//! [`RemoteTransport`] over the GitHub REST and GraphQL APIs.
//!
//! Objects are created through the git database endpoints (`git/blobs`,
//! `git/trees`, `git/commits`). Refs are moved with the GraphQL `updateRefs`
//! mutation, which applies a whole batch atomically. Reads of both value refs
//! are folded into one GraphQL query when a token is available.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use gitkv_refs::RefUpdate;
use gitkv_store::{Commit, Person, Tree};
use gitkv_types::ObjectId;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::transport::{RemoteTransport, RepositoryInfo, ValueSlot};

const API_VERSION: &str = "2022-11-28";

const UPDATE_REFS_MUTATION: &str = "mutation($repositoryId: ID!, $refUpdates: [RefUpdate!]!) { \
    updateRefs(input: { repositoryId: $repositoryId, refUpdates: $refUpdates }) { clientMutationId } }";

const VALUE_SLOT_QUERY: &str = "query($id: ID!, $bytesRef: String!, $typeRef: String!, $path: String!) { \
    node(id: $id) { ... on Repository { \
        bytes: ref(qualifiedName: $bytesRef) { target { oid ... on Commit { message file(path: $path) { oid } } } } \
        type: ref(qualifiedName: $typeRef) { target { oid } } } } }";

#[derive(Deserialize)]
struct RepoResponse {
    node_id: String,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    private: Option<bool>,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ShaResponse {
    sha: ObjectId,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaResponse,
}

#[derive(Deserialize)]
struct CommitResponse {
    message: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    message: String,
}

/// Message fragments GitHub uses when a ref is not where `beforeOid` said.
const STALE_REF_MARKERS: [&str; 4] = ["already exists", "to be absent", "expected", "does not match"];

impl GraphQlError {
    /// Whether this error reports a ref precondition that did not hold.
    fn is_stale_ref(&self) -> bool {
        match self.kind.as_deref() {
            Some("STALE_DATA") => true,
            Some("FORBIDDEN" | "NOT_FOUND" | "RATE_LIMITED" | "INTERNAL" | "UNAUTHORIZED") => false,
            _ => {
                let message = self.message.to_ascii_lowercase();
                STALE_REF_MARKERS.iter().any(|marker| message.contains(marker))
            }
        }
    }
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| match &e.kind {
            Some(kind) => format!("{kind}: {}", e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Deserialize)]
struct SlotData {
    node: Option<SlotNode>,
}

#[derive(Deserialize)]
struct SlotNode {
    bytes: Option<SlotRef>,
    #[serde(rename = "type")]
    kind: Option<SlotRef>,
}

#[derive(Deserialize)]
struct SlotRef {
    target: SlotTarget,
}

#[derive(Deserialize)]
struct SlotTarget {
    oid: ObjectId,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    file: Option<SlotFile>,
}

#[derive(Deserialize)]
struct SlotFile {
    oid: ObjectId,
}

/// GitHub-backed transport for one repository.
#[derive(Debug, Clone)]
pub struct GitHubTransport {
    http: reqwest::Client,
    api_url: String,
    graphql_url: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GitHubTransport {
    /// Build a transport with its own HTTP client.
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;
        Self::with_client(config, http)
    }

    /// Build a transport around an existing client.
    pub fn with_client(config: &RemoteConfig, http: reqwest::Client) -> RemoteResult<Self> {
        config.validate()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            graphql_url: config.graphql_url.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.token.clone(),
        })
    }

    /// The HTTP client, shared with the mirrors.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn repo_url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/repos/{}/{}", self.api_url, self.owner, self.repo)
        } else {
            format!("{}/repos/{}/{}/{path}", self.api_url, self.owner, self.repo)
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self
            .http
            .request(method, url)
            .header("x-github-api-version", API_VERSION);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn status_error(context: &str, resp: Response) -> RemoteError {
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        RemoteError::Status {
            context: context.to_string(),
            status,
            message,
        }
    }

    /// GET a JSON document. A 404 is `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(&self, context: &str, url: &str) -> RemoteResult<Option<T>> {
        debug!(url = %url, "GET");
        let resp = self.request(Method::GET, url).send().await?;
        match resp.status().as_u16() {
            404 => Ok(None),
            s if (200..300).contains(&s) => Ok(Some(resp.json().await?)),
            _ => Err(Self::status_error(context, resp).await),
        }
    }

    async fn post_json<T: DeserializeOwned>(&self, context: &str, url: &str, body: &Value) -> RemoteResult<T> {
        debug!(url = %url, "POST");
        let resp = self.request(Method::POST, url).json(body).send().await?;
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(Self::status_error(context, resp).await)
        }
    }

    async fn graphql_response<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> RemoteResult<GraphQlResponse<T>> {
        let body = json!({ "query": query, "variables": variables });
        self.post_json("graphql", &self.graphql_url, &body).await
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> RemoteResult<T> {
        let response: GraphQlResponse<T> = self.graphql_response(query, variables).await?;
        if !response.errors.is_empty() {
            return Err(RemoteError::GraphQl(join_messages(&response.errors)));
        }
        response
            .data
            .ok_or_else(|| RemoteError::InvalidResponse("graphql response without data".into()))
    }

    fn person_json(person: &Person) -> Value {
        json!({ "name": person.name, "email": person.email, "date": person.date })
    }
}

#[async_trait]
impl RemoteTransport for GitHubTransport {
    async fn repository_info(&self) -> RemoteResult<RepositoryInfo> {
        let url = self.repo_url("");
        let repo: RepoResponse = self
            .get_json("repository lookup", &url)
            .await?
            .ok_or_else(|| RemoteError::Status {
                context: "repository lookup".into(),
                status: 404,
                message: format!("{}/{} not found", self.owner, self.repo),
            })?;
        let is_public = match (repo.visibility.as_deref(), repo.private) {
            (Some(visibility), _) => visibility == "public",
            (None, Some(private)) => !private,
            (None, None) => false,
        };
        Ok(RepositoryInfo {
            id: repo.node_id,
            is_public,
            created_at: repo.created_at,
        })
    }

    async fn resolve_ref(&self, name: &str) -> RemoteResult<Option<ObjectId>> {
        let short = name.strip_prefix("refs/").unwrap_or(name);
        let url = self.repo_url(&format!("git/ref/{short}"));
        let found: Option<RefResponse> = self.get_json("ref lookup", &url).await?;
        Ok(found.map(|r| r.object.sha))
    }

    async fn commit_exists(&self, id: &ObjectId) -> RemoteResult<bool> {
        let url = self.repo_url(&format!("git/commits/{id}"));
        let resp = self.request(Method::HEAD, &url).send().await?;
        match resp.status().as_u16() {
            404 => Ok(false),
            s if (200..300).contains(&s) => Ok(true),
            _ => Err(Self::status_error("commit probe", resp).await),
        }
    }

    async fn create_blob(&self, data: &[u8]) -> RemoteResult<ObjectId> {
        let body = json!({ "content": STANDARD.encode(data), "encoding": "base64" });
        let created: ShaResponse = self
            .post_json("blob upload", &self.repo_url("git/blobs"), &body)
            .await?;
        Ok(created.sha)
    }

    async fn create_tree(&self, tree: &Tree) -> RemoteResult<ObjectId> {
        let entries: Vec<Value> = tree
            .entries
            .iter()
            .map(|entry| {
                json!({
                    "path": entry.name,
                    "mode": entry.mode.as_str(),
                    "type": entry.mode.object_kind().as_str(),
                    "sha": entry.object_id,
                })
            })
            .collect();
        let created: ShaResponse = self
            .post_json("tree upload", &self.repo_url("git/trees"), &json!({ "tree": entries }))
            .await?;
        Ok(created.sha)
    }

    async fn create_commit(&self, commit: &Commit) -> RemoteResult<ObjectId> {
        let body = json!({
            "message": commit.message,
            "tree": commit.tree,
            "parents": commit.parents,
            "author": Self::person_json(&commit.author),
            "committer": Self::person_json(&commit.committer),
        });
        let created: ShaResponse = self
            .post_json("commit upload", &self.repo_url("git/commits"), &body)
            .await?;
        Ok(created.sha)
    }

    async fn update_refs(&self, repository_id: &str, updates: &[RefUpdate]) -> RemoteResult<()> {
        let ref_updates: Vec<Value> = updates
            .iter()
            .map(|update| {
                let update = update.qualified();
                let mut entry = json!({
                    "name": update.name,
                    "afterOid": update.after_wire(),
                    "force": true,
                });
                if let Some(before) = update.before.to_wire() {
                    entry["beforeOid"] = json!(before);
                }
                entry
            })
            .collect();
        debug!(updates = ref_updates.len(), "updating refs");

        let variables = json!({ "repositoryId": repository_id, "refUpdates": ref_updates });
        let response: GraphQlResponse<Value> =
            self.graphql_response(UPDATE_REFS_MUTATION, variables).await?;
        if response.errors.is_empty() {
            return Ok(());
        }
        let message = join_messages(&response.errors);
        if response.errors.iter().all(GraphQlError::is_stale_ref) {
            Err(RemoteError::RefRejected(message))
        } else {
            Err(RemoteError::GraphQl(message))
        }
    }

    async fn commit_message(&self, id: &ObjectId) -> RemoteResult<Option<String>> {
        let url = self.repo_url(&format!("git/commits/{id}"));
        let commit: Option<CommitResponse> = self.get_json("commit lookup", &url).await?;
        Ok(commit.map(|c| c.message.strip_suffix('\n').unwrap_or(&c.message).to_string()))
    }

    async fn commit_file(&self, commit: &ObjectId, path: &str) -> RemoteResult<Option<ObjectId>> {
        let url = self.repo_url(&format!("contents/{path}?ref={commit}"));
        let file: Option<ShaResponse> = self.get_json("contents lookup", &url).await?;
        Ok(file.map(|f| f.sha))
    }

    async fn fetch_blob(&self, id: &ObjectId) -> RemoteResult<Option<Vec<u8>>> {
        let url = self.repo_url(&format!("git/blobs/{id}"));
        let Some(blob) = self.get_json::<BlobResponse>("blob lookup", &url).await? else {
            return Ok(None);
        };
        match blob.encoding.as_deref() {
            None | Some("base64") => {
                let compact: String = blob.content.split_whitespace().collect();
                Ok(Some(STANDARD.decode(compact)?))
            }
            Some("utf-8") => Ok(Some(blob.content.into_bytes())),
            Some(other) => Err(RemoteError::InvalidResponse(format!(
                "unknown blob encoding {other}"
            ))),
        }
    }

    async fn value_slot(
        &self,
        repository_id: &str,
        bytes_ref: &str,
        type_ref: &str,
    ) -> RemoteResult<ValueSlot> {
        if !self.is_authenticated() {
            let (bytes, kind) =
                tokio::try_join!(self.resolve_ref(bytes_ref), self.resolve_ref(type_ref))?;
            return Ok(ValueSlot {
                bytes,
                kind,
                ..ValueSlot::default()
            });
        }

        let variables = json!({
            "id": repository_id,
            "bytesRef": bytes_ref,
            "typeRef": type_ref,
            "path": "value",
        });
        let data: SlotData = self.graphql(VALUE_SLOT_QUERY, variables).await?;
        let node = data
            .node
            .ok_or_else(|| RemoteError::InvalidResponse(format!("no repository node {repository_id}")))?;

        let mut slot = ValueSlot {
            kind: node.kind.map(|r| r.target.oid),
            ..ValueSlot::default()
        };
        if let Some(bytes) = node.bytes {
            slot.bytes = Some(bytes.target.oid);
            slot.message = bytes
                .target
                .message
                .map(|m| m.strip_suffix('\n').unwrap_or(&m).to_string());
            slot.file = bytes.target.file.map(|f| f.oid);
        }
        Ok(slot)
    }

    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use gitkv_store::Blob;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn transport(server: &MockServer, token: Option<&str>) -> GitHubTransport {
        let mut config = RemoteConfig::new("octo", "kv");
        config.api_url = server.uri();
        config.graphql_url = format!("{}/graphql", server.uri());
        config.token = token.map(str::to_string);
        GitHubTransport::new(&config).unwrap()
    }

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_hash([byte; 20])
    }

    #[tokio::test]
    async fn repository_info_sends_auth_and_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/kv"))
            .and(header("authorization", "Bearer secret"))
            .and(header("x-github-api-version", "2022-11-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "node_id": "R_kgDOabc",
                "visibility": "public",
                "created_at": "2024-03-01T10:00:00Z",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = transport(&server, Some("secret")).repository_info().await.unwrap();
        assert_eq!(info.id, "R_kgDOabc");
        assert!(info.is_public);
        assert_eq!(info.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[tokio::test]
    async fn private_repository_falls_back_to_private_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/kv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "node_id": "R_x",
                "private": true,
                "created_at": "2024-03-01T10:00:00Z",
            })))
            .mount(&server)
            .await;

        let info = transport(&server, None).repository_info().await.unwrap();
        assert!(!info.is_public);
    }

    #[tokio::test]
    async fn resolve_ref_found_and_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/kv/git/ref/tags/kv/types/ArrayBuffer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/tags/kv/types/ArrayBuffer",
                "object": { "sha": oid(7).to_hex(), "type": "commit" },
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/kv/git/ref/heads/kv/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let t = transport(&server, None);
        assert_eq!(
            t.resolve_ref("refs/tags/kv/types/ArrayBuffer").await.unwrap(),
            Some(oid(7))
        );
        assert_eq!(t.resolve_ref("refs/heads/kv/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn commit_probe_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path(format!("/repos/octo/kv/git/commits/{}", oid(1))))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path(format!("/repos/octo/kv/git/commits/{}", oid(2))))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path(format!("/repos/octo/kv/git/commits/{}", oid(3))))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let t = transport(&server, Some("t"));
        assert!(t.commit_exists(&oid(1)).await.unwrap());
        assert!(!t.commit_exists(&oid(2)).await.unwrap());
        assert!(matches!(
            t.commit_exists(&oid(3)).await,
            Err(RemoteError::Status { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn uploads_use_git_database_endpoints() {
        let server = MockServer::start().await;
        let blob = Blob::new(b"42".to_vec());
        Mock::given(method("POST"))
            .and(path("/repos/octo/kv/git/blobs"))
            .and(body_partial_json(json!({ "content": "NDI=", "encoding": "base64" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": blob.id().to_hex() })))
            .expect(1)
            .mount(&server)
            .await;

        let tree = Tree::value_layout(blob.id());
        Mock::given(method("POST"))
            .and(path("/repos/octo/kv/git/trees"))
            .and(body_partial_json(json!({ "tree": [
                { "path": "value", "mode": "100644", "type": "blob", "sha": blob.id().to_hex() },
                { "path": "value.json", "mode": "100644", "type": "blob", "sha": blob.id().to_hex() },
                { "path": "value.txt", "mode": "100644", "type": "blob", "sha": blob.id().to_hex() },
            ]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": tree.id().to_hex() })))
            .expect(1)
            .mount(&server)
            .await;

        let identity = Person::new("a a", "a@a.a", "2025-01-01T00:00:00Z");
        let commit = Commit::root(tree.id(), identity, "text/plain");
        Mock::given(method("POST"))
            .and(path("/repos/octo/kv/git/commits"))
            .and(body_partial_json(json!({
                "message": "text/plain",
                "tree": tree.id().to_hex(),
                "author": { "name": "a a", "email": "a@a.a", "date": "2025-01-01T00:00:00Z" },
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": commit.id().to_hex() })))
            .expect(1)
            .mount(&server)
            .await;

        let t = transport(&server, Some("t"));
        assert_eq!(t.create_blob(b"42").await.unwrap(), blob.id());
        assert_eq!(t.create_tree(&tree).await.unwrap(), tree.id());
        assert_eq!(t.create_commit(&commit).await.unwrap(), commit.id());
    }

    #[tokio::test]
    async fn update_refs_builds_forced_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({
                "variables": {
                    "repositoryId": "R_x",
                    "refUpdates": [
                        {
                            "name": "refs/tags/kv/String/abc",
                            "afterOid": oid(1).to_hex(),
                            "beforeOid": "0000000000000000000000000000000000000000",
                            "force": true,
                        },
                        {
                            "name": "refs/heads/kv/String/abc/value/bytes",
                            "afterOid": "0000000000000000000000000000000000000000",
                            "force": true,
                        },
                    ]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "updateRefs": { "clientMutationId": null } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = transport(&server, Some("t"));
        t.update_refs(
            "R_x",
            &[
                RefUpdate::create("refs/tags/kv/String/abc", oid(1)),
                RefUpdate::delete("kv/String/abc/value/bytes"),
            ],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn update_refs_precondition_errors_are_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "Expected refs/tags/kv/x to be absent" }]
            })))
            .mount(&server)
            .await;

        let err = transport(&server, Some("t"))
            .update_refs("R_x", &[RefUpdate::create("refs/tags/kv/x", oid(1))])
            .await
            .unwrap_err();
        assert!(err.is_ref_rejection());
        assert!(err.to_string().contains("to be absent"));
    }

    #[tokio::test]
    async fn update_refs_stale_data_is_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "type": "STALE_DATA", "message": "Ref moved" }]
            })))
            .mount(&server)
            .await;

        let err = transport(&server, Some("t"))
            .update_refs("R_x", &[RefUpdate::compare_and_swap("refs/heads/v", oid(1), oid(2))])
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::RefRejected(_)));
    }

    #[tokio::test]
    async fn update_refs_permission_errors_are_not_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{
                    "type": "FORBIDDEN",
                    "message": "Resource not accessible by integration, expected write access"
                }]
            })))
            .mount(&server)
            .await;

        let err = transport(&server, Some("t"))
            .update_refs("R_x", &[RefUpdate::create("refs/tags/kv/x", oid(1))])
            .await
            .unwrap_err();
        assert!(!err.is_ref_rejection());
        assert!(matches!(err, RemoteError::GraphQl(ref m) if m.starts_with("FORBIDDEN: Resource not accessible")));
    }

    #[tokio::test]
    async fn update_refs_unknown_node_is_not_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "Could not resolve to a node with the global id of 'R_x'" }]
            })))
            .mount(&server)
            .await;

        let err = transport(&server, Some("t"))
            .update_refs("R_x", &[RefUpdate::force("refs/heads/v", oid(1))])
            .await
            .unwrap_err();
        assert!(!err.is_ref_rejection());
    }

    #[tokio::test]
    async fn blob_and_contents_reads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octo/kv/git/blobs/{}", oid(4))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": "aGVs\nbG8=\n",
                "encoding": "base64",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/kv/contents/value"))
            .and(query_param("ref", oid(5).to_hex()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sha": oid(4).to_hex() })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octo/kv/git/blobs/{}", oid(6))))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let t = transport(&server, Some("t"));
        assert_eq!(t.commit_file(&oid(5), "value").await.unwrap(), Some(oid(4)));
        assert_eq!(t.fetch_blob(&oid(4)).await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(t.fetch_blob(&oid(6)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn commit_message_strips_trailing_newline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octo/kv/git/commits/{}", oid(8))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "image/png\n" })))
            .mount(&server)
            .await;

        let t = transport(&server, None);
        assert_eq!(t.commit_message(&oid(8)).await.unwrap().as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn value_slot_uses_one_graphql_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({
                "variables": {
                    "id": "R_x",
                    "bytesRef": "refs/heads/kv/Blob/k/value/bytes",
                    "typeRef": "refs/heads/kv/Blob/k/value/type",
                    "path": "value",
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": {
                    "bytes": { "target": {
                        "oid": oid(1).to_hex(),
                        "message": "image/png",
                        "file": { "oid": oid(2).to_hex() },
                    }},
                    "type": { "target": { "oid": oid(3).to_hex() } },
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let slot = transport(&server, Some("t"))
            .value_slot(
                "R_x",
                "refs/heads/kv/Blob/k/value/bytes",
                "refs/heads/kv/Blob/k/value/type",
            )
            .await
            .unwrap();
        assert_eq!(
            slot,
            ValueSlot {
                bytes: Some(oid(1)),
                kind: Some(oid(3)),
                message: Some("image/png".into()),
                file: Some(oid(2)),
            }
        );
    }

    #[tokio::test]
    async fn value_slot_without_token_resolves_refs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/kv/git/ref/heads/kv/Number/k/value/bytes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": oid(1).to_hex() }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/kv/git/ref/heads/kv/Number/k/value/type"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let slot = transport(&server, None)
            .value_slot(
                "R_x",
                "refs/heads/kv/Number/k/value/bytes",
                "refs/heads/kv/Number/k/value/type",
            )
            .await
            .unwrap();
        assert_eq!(slot.bytes, Some(oid(1)));
        assert_eq!(slot.kind, None);
        assert_eq!(slot.message, None);
    }
}
