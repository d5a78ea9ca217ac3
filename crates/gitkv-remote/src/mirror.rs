//! Public read mirrors.
//!
//! Content of a public repository is also served by CDNs that mirror GitHub.
//! [`MirrorChain`] tries them in order. A 404 from any mirror is taken as a
//! definite answer; any other failure falls through to the next mirror.

use std::sync::Arc;

use async_trait::async_trait;
use gitkv_types::ObjectId;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};

/// Name of the file every value commit carries; mirrors are asked for it.
pub const VALUE_PATH: &str = "value";

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Unavailable(String),
}

/// A read-only source of committed files.
#[async_trait]
pub trait Mirror: Send + Sync {
    /// URL of the root of `commit`'s tree on this mirror.
    fn base_url(&self, commit: &ObjectId) -> String;

    /// The `value` file of `commit`.
    async fn fetch(&self, commit: &ObjectId) -> Result<Vec<u8>, MirrorError>;
}

/// A mirror addressed by a URL template.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    template: String,
    owner: String,
    repo: String,
    http: reqwest::Client,
}

impl HttpMirror {
    /// `template` may contain `{owner}`, `{repo}` and `{hash}`.
    pub fn new(
        template: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            template: template.into(),
            owner: owner.into(),
            repo: repo.into(),
            http,
        }
    }
}

#[async_trait]
impl Mirror for HttpMirror {
    fn base_url(&self, commit: &ObjectId) -> String {
        self.template
            .replace("{owner}", &self.owner)
            .replace("{repo}", &self.repo)
            .replace("{hash}", &commit.to_hex())
    }

    async fn fetch(&self, commit: &ObjectId) -> Result<Vec<u8>, MirrorError> {
        let url = format!("{}/{VALUE_PATH}", self.base_url(commit));
        debug!(url = %url, "fetching from mirror");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MirrorError::Unavailable(e.to_string()))?;

        match resp.status().as_u16() {
            200 => resp
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|e| MirrorError::Unavailable(e.to_string())),
            404 => Err(MirrorError::NotFound),
            status => Err(MirrorError::Unavailable(format!("status {status} for {url}"))),
        }
    }
}

/// Priority-ordered mirror fallback.
#[derive(Clone, Default)]
pub struct MirrorChain {
    mirrors: Vec<Arc<dyn Mirror>>,
}

impl MirrorChain {
    pub fn new(mirrors: Vec<Arc<dyn Mirror>>) -> Self {
        Self { mirrors }
    }

    /// One [`HttpMirror`] per configured template.
    pub fn from_config(config: &RemoteConfig, http: reqwest::Client) -> Self {
        let mirrors = config
            .mirrors
            .iter()
            .map(|template| {
                Arc::new(HttpMirror::new(
                    template.as_str(),
                    config.owner.as_str(),
                    config.repo.as_str(),
                    http.clone(),
                )) as Arc<dyn Mirror>
            })
            .collect();
        Self { mirrors }
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// Base URL of `commit` under the first mirror.
    pub fn primary_url(&self, commit: &ObjectId) -> Option<String> {
        self.mirrors.first().map(|m| m.base_url(commit))
    }

    /// Fetch the `value` file of `commit`.
    ///
    /// Returns `Ok(None)` as soon as a mirror answers 404. Fails with
    /// [`RemoteError::MirrorsExhausted`] when every mirror fails otherwise.
    pub async fn fetch(&self, commit: &ObjectId) -> RemoteResult<Option<Vec<u8>>> {
        let mut errors = Vec::new();

        for mirror in &self.mirrors {
            match mirror.fetch(commit).await {
                Ok(bytes) => return Ok(Some(bytes)),
                Err(MirrorError::NotFound) => {
                    debug!(commit = %commit.short_hex(), mirror = %mirror.base_url(commit), "mirror reports not found");
                    return Ok(None);
                }
                Err(MirrorError::Unavailable(reason)) => {
                    warn!(
                        mirror = %mirror.base_url(commit),
                        error = %reason,
                        "mirror fetch failed, trying next"
                    );
                    errors.push(format!("{}: {}", mirror.base_url(commit), reason));
                }
            }
        }

        let details = if errors.is_empty() {
            "no mirrors configured".to_string()
        } else {
            errors.join("; ")
        };
        Err(RemoteError::MirrorsExhausted {
            commit: *commit,
            details,
        })
    }
}

impl std::fmt::Debug for MirrorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorChain")
            .field("mirrors", &self.mirrors.len())
            .finish()
    }
}
