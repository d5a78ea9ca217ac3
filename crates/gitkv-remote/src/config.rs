use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, RemoteResult};

/// Public CDN mirrors of repository content, tried in order.
///
/// `{owner}`, `{repo}` and `{hash}` are substituted; `/value` is appended.
pub const DEFAULT_MIRRORS: [&str; 4] = [
    "https://cdn.jsdelivr.net/gh/{owner}/{repo}@{hash}",
    "https://cdn.statically.io/gh/{owner}/{repo}/{hash}",
    "https://rawcdn.githack.com/{owner}/{repo}/{hash}",
    "https://raw.githubusercontents.com/{owner}/{repo}/{hash}",
];

/// Connection settings for a repository hosted on GitHub.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub owner: String,
    pub repo: String,
    /// Access token. Without one, reads of public repositories go through
    /// the mirrors and writes fail.
    pub token: Option<String>,
    pub api_url: String,
    pub graphql_url: String,
    pub mirrors: Vec<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: None,
            api_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            mirrors: DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: 30,
            user_agent: "gitkv".to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Parse and validate a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> RemoteResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| RemoteError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RemoteResult<()> {
        if self.owner.is_empty() || self.repo.is_empty() {
            return Err(RemoteError::Config("owner and repo are required".into()));
        }
        if self.timeout_secs == 0 {
            return Err(RemoteError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = RemoteConfig::default();
        assert_eq!(c.api_url, "https://api.github.com");
        assert_eq!(c.graphql_url, "https://api.github.com/graphql");
        assert_eq!(c.mirrors.len(), 4);
        assert!(c.mirrors[0].starts_with("https://cdn.jsdelivr.net"));
        assert_eq!(c.timeout(), Duration::from_secs(30));
        assert_eq!(c.user_agent, "gitkv");
        assert!(c.token.is_none());
    }

    #[test]
    fn toml_fills_defaults() {
        let c = RemoteConfig::from_toml_str(
            r#"
            owner = "octo"
            repo = "kv"
            token = "ghp_x"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(c.owner, "octo");
        assert_eq!(c.token.as_deref(), Some("ghp_x"));
        assert_eq!(c.timeout_secs, 5);
        assert_eq!(c.mirrors, RemoteConfig::default().mirrors);
    }

    #[test]
    fn toml_requires_repository() {
        let err = RemoteConfig::from_toml_str("owner = \"octo\"").unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    fn toml_rejects_malformed_input() {
        assert!(RemoteConfig::from_toml_str("owner = ").is_err());
    }

    #[test]
    fn builder_sets_token() {
        let c = RemoteConfig::new("octo", "kv").with_token("t");
        assert!(c.validate().is_ok());
        assert_eq!(c.token.as_deref(), Some("t"));
    }
}
