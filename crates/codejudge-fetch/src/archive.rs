//! Repository archive download.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use codejudge_core::error::{EvalError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_REFERENCE: &str = "main";
pub const DEFAULT_USER_AGENT: &str = "codejudge";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const ARCHIVE_ACCEPT: &str = "application/vnd.github+json";

/// Settings for the archive source.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// API root the zipball path is appended to.
    pub api_base: String,
    /// Branch or tag to download.
    pub reference: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Bearer token for private repositories and higher rate limits.
    pub token: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            reference: DEFAULT_REFERENCE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token: None,
        }
    }
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("api_base", &self.api_base)
            .field("reference", &self.reference)
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Extract `{owner, name}` from the first two non-empty path segments of a
/// repository URL.
pub fn parse_repository_reference(repository_url: &str) -> Result<RepoRef> {
    let invalid = |reason: &str| EvalError::InvalidReference {
        reference: repository_url.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(repository_url).map_err(|e| invalid(&e.to_string()))?;
    let mut segments = url
        .path_segments()
        .ok_or_else(|| invalid("URL has no path"))?
        .filter(|s| !s.is_empty());

    match (segments.next(), segments.next()) {
        (Some(owner), Some(name)) => Ok(RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        _ => Err(invalid("expected /{owner}/{name} in the URL path")),
    }
}

/// Downloads repository zipballs.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ArchiveFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ARCHIVE_ACCEPT));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| EvalError::Config(format!("invalid user agent: {e}")))?,
        );
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| EvalError::Config(format!("invalid fetch token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EvalError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Zipball URL for a repository at the configured reference.
    pub fn archive_url(&self, repo: &RepoRef) -> String {
        format!(
            "{}/repos/{}/{}/zipball/{}",
            self.config.api_base.trim_end_matches('/'),
            repo.owner,
            repo.name,
            self.config.reference
        )
    }

    /// Download the archive of `repository_url` into `destination`.
    ///
    /// Returns the number of bytes written.
    #[instrument(skip(self, destination), fields(repository = %repository_url))]
    pub async fn fetch(&self, repository_url: &str, destination: &Path) -> Result<u64> {
        let repo = parse_repository_reference(repository_url)?;
        let url = self.archive_url(&repo);
        debug!(url = %url, "downloading repository archive");

        let failed = |status: Option<u16>, message: String| EvalError::FetchFailed {
            url: url.clone(),
            status,
            message,
        };

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                failed(None, format!("timed out after {}s", self.config.timeout_secs))
            } else {
                failed(None, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(
                Some(status.as_u16()),
                format!("HTTP {status}: {}", body.trim()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| failed(Some(status.as_u16()), format!("failed to read body: {e}")))?;
        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|e| EvalError::Extract(format!("failed to write archive: {e}")))?;

        info!(repository = %repo, bytes = bytes.len(), "archive downloaded");
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer, token: Option<&str>) -> ArchiveFetcher {
        ArchiveFetcher::new(FetchConfig {
            api_base: server.uri(),
            token: token.map(str::to_string),
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn parses_owner_and_name() {
        let repo = parse_repository_reference("https://host.example/acme/widgets").unwrap();
        assert_eq!(
            repo,
            RepoRef {
                owner: "acme".into(),
                name: "widgets".into()
            }
        );
    }

    #[test]
    fn ignores_extra_segments_and_slashes() {
        let repo =
            parse_repository_reference("https://github.com//acme/widgets/tree/main/src").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");
    }

    #[test]
    fn single_segment_is_invalid() {
        let err = parse_repository_reference("https://host.example/acme").unwrap_err();
        assert!(matches!(err, EvalError::InvalidReference { .. }));
    }

    #[test]
    fn unparseable_url_is_invalid() {
        let err = parse_repository_reference("acme/widgets").unwrap_err();
        assert!(matches!(err, EvalError::InvalidReference { .. }));
    }

    #[test]
    fn debug_masks_token() {
        let config = FetchConfig {
            token: Some("ghp_secret".into()),
            ..FetchConfig::default()
        };
        let out = format!("{config:?}");
        assert!(!out.contains("ghp_secret"));
        assert!(out.contains("***"));
    }

    #[test]
    fn archive_url_uses_reference() {
        let fetcher = ArchiveFetcher::new(FetchConfig {
            api_base: "https://api.example/".into(),
            reference: "develop".into(),
            ..FetchConfig::default()
        })
        .unwrap();
        let repo = RepoRef {
            owner: "acme".into(),
            name: "widgets".into(),
        };
        assert_eq!(
            fetcher.archive_url(&repo),
            "https://api.example/repos/acme/widgets/zipball/develop"
        );
    }

    #[tokio::test]
    async fn sends_expected_headers_and_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/zipball/main"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("user-agent", "codejudge"))
            .and(header("authorization", "Bearer t0ken"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("repo.zip");
        let written = fetcher_for(&server, Some("t0ken"))
            .fetch("https://github.com/acme/widgets", &dest)
            .await
            .unwrap();

        assert_eq!(written, 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK-bytes");
    }

    #[tokio::test]
    async fn no_authorization_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        fetcher_for(&server, None)
            .fetch("https://github.com/acme/widgets", &dir.path().join("a.zip"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("repo.zip");
        let err = fetcher_for(&server, None)
            .fetch("https://github.com/acme/missing", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, EvalError::FetchFailed { status: Some(404), .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn invalid_reference_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = fetcher_for(&server, None)
            .fetch("https://github.com/acme", &dir.path().join("repo.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::InvalidReference { .. }));
    }
}
