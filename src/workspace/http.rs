//! Workspace served by a remote host over HTTP.
//!
//! Endpoints (JSON bodies, camelCase fields):
//!
//! | Call | Request |
//! |---|---|
//! | read | `POST /api/fs/read {path}` → `{content}` |
//! | write | `POST /api/fs/write {path, content}` |
//! | delete | `POST /api/fs/delete {path}` |
//! | shell | `POST /api/shell/exec {command, workingDirectory?}` → `{stdout, stderr, exitCode}` |
//! | install | `POST /api/packages/install {language, packages}` |
//! | snapshot | `GET /api/fs/snapshot` → `{files: {path: content}}` |
//!
//! Read-only calls are retried on transient failures. Mutating calls are
//! sent once: a timed-out write may still have landed on the host.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use super::{ShellOutput, Workspace, WorkspaceError};
use crate::checkpoint::FileSet;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shell commands and installs can run much longer than file calls.
const LONG_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Retry schedule: 3 retries with exponential backoff from 1s, plus jitter.
const RETRY_BASE_DELAY_SECS: u64 = 1;
const MAX_RETRIES: usize = 3;
const RETRY_JITTER_DIVISOR: u128 = 4; // + up to 25% jitter

const READ_ENDPOINT: &str = "api/fs/read";
const WRITE_ENDPOINT: &str = "api/fs/write";
const DELETE_ENDPOINT: &str = "api/fs/delete";
const SHELL_ENDPOINT: &str = "api/shell/exec";
const INSTALL_ENDPOINT: &str = "api/packages/install";
const SNAPSHOT_ENDPOINT: &str = "api/fs/snapshot";

#[derive(Serialize)]
struct PathRequest<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct WriteRequest<'a> {
    path: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShellRequest<'a> {
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    working_directory: Option<&'a str>,
}

#[derive(Serialize)]
struct InstallRequest<'a> {
    language: &'a str,
    packages: &'a [String],
}

#[derive(Deserialize)]
struct ReadResponse {
    content: String,
}

#[derive(Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    files: BTreeMap<String, String>,
}

/// HTTP client for a workspace host.
#[derive(Debug, Clone)]
pub struct HttpWorkspace {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpWorkspace {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, WorkspaceError> {
        // Url::join drops the last path segment unless it ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| WorkspaceError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(format!("agent-actions/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| WorkspaceError::Transport {
                endpoint: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> Result<Url, WorkspaceError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| WorkspaceError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// POST `body` once; mutating calls are never replayed.
    async fn post_once<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<Response, WorkspaceError> {
        let url = self.url(endpoint)?;
        debug!("POST {}", url);
        let response = self
            .authorize(self.client.post(url).json(body).timeout(timeout))
            .send()
            .await
            .map_err(|source| WorkspaceError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        check_status(endpoint, response).await
    }

    async fn send_idempotent(
        &self,
        endpoint: &str,
        make_request: impl FnMut() -> RequestBuilder,
    ) -> Result<Response, WorkspaceError> {
        let response = send_with_retry(make_request)
            .await
            .map_err(|source| WorkspaceError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        check_status(endpoint, response).await
    }
}

#[async_trait]
impl Workspace for HttpWorkspace {
    async fn read_file(&self, path: &str) -> Result<String, WorkspaceError> {
        let url = self.url(READ_ENDPOINT)?;
        let body = PathRequest { path };
        let response = self
            .send_idempotent(READ_ENDPOINT, || {
                self.authorize(self.client.post(url.clone()).json(&body))
            })
            .await
            .map_err(|e| match e {
                WorkspaceError::Status { status: 404, .. } => WorkspaceError::NotFound(path.to_string()),
                other => other,
            })?;
        let parsed: ReadResponse = parse_json(READ_ENDPOINT, response).await?;
        Ok(parsed.content)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), WorkspaceError> {
        let body = WriteRequest { path, content };
        self.post_once(WRITE_ENDPOINT, &body, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .await?;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), WorkspaceError> {
        self.post_once(
            DELETE_ENDPOINT,
            &PathRequest { path },
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
        .await
        .map_err(|e| match e {
            WorkspaceError::Status { status: 404, .. } => WorkspaceError::NotFound(path.to_string()),
            other => other,
        })?;
        Ok(())
    }

    async fn execute_shell(
        &self,
        command: &str,
        working_directory: Option<&str>,
    ) -> Result<ShellOutput, WorkspaceError> {
        let body = ShellRequest {
            command,
            working_directory,
        };
        let response = self
            .post_once(
                SHELL_ENDPOINT,
                &body,
                Duration::from_secs(LONG_REQUEST_TIMEOUT_SECS),
            )
            .await?;
        let output: ShellOutput = parse_json(SHELL_ENDPOINT, response).await?;

        match output.exit_code {
            Some(0) | None => Ok(output),
            code => Err(WorkspaceError::CommandFailed {
                command: command.to_string(),
                exit_code: code,
                stderr: output.stderr.trim().to_string(),
            }),
        }
    }

    async fn install_packages(&self, language: &str, packages: &[String]) -> Result<(), WorkspaceError> {
        let body = InstallRequest { language, packages };
        self.post_once(
            INSTALL_ENDPOINT,
            &body,
            Duration::from_secs(LONG_REQUEST_TIMEOUT_SECS),
        )
        .await?;
        Ok(())
    }

    async fn snapshot_files(&self) -> Result<FileSet, WorkspaceError> {
        let url = self.url(SNAPSHOT_ENDPOINT)?;
        let response = self
            .send_idempotent(SNAPSHOT_ENDPOINT, || {
                self.authorize(self.client.get(url.clone()))
            })
            .await?;
        let parsed: SnapshotResponse = parse_json(SNAPSHOT_ENDPOINT, response).await?;
        Ok(parsed.files.into_iter().collect())
    }
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, WorkspaceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(WorkspaceError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn parse_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, WorkspaceError> {
    response
        .json::<T>()
        .await
        .map_err(|source| WorkspaceError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })
}

fn is_retriable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retriable_send_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body()
}

fn retry_base_delay(attempt: usize) -> Duration {
    let multiplier = 1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX);
    Duration::from_secs(RETRY_BASE_DELAY_SECS.saturating_mul(multiplier))
}

fn add_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = delay.as_millis() / RETRY_JITTER_DIVISOR;
    if max_jitter_ms == 0 {
        return delay;
    }

    let max_jitter_ms = std::cmp::min(max_jitter_ms, u128::from(u64::MAX)) as u64;
    let jitter_ms = rand::thread_rng().gen_range(0..=max_jitter_ms);
    delay + Duration::from_millis(jitter_ms)
}

/// Send a request, replaying it on retriable statuses and transport errors.
///
/// The final response is returned whatever its status.
async fn send_with_retry(
    mut make_request: impl FnMut() -> RequestBuilder,
) -> Result<Response, reqwest::Error> {
    let mut attempt = 0;
    loop {
        match make_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || !is_retriable_status(status) || attempt >= MAX_RETRIES {
                    return Ok(response);
                }

                let base_delay = retry_base_delay(attempt);
                let delay = add_jitter(base_delay);
                debug!(
                    "HTTP request failed with status {}; retrying in {:?} (attempt {}/{})",
                    status,
                    delay,
                    attempt + 1,
                    MAX_RETRIES + 1
                );
                let _ = response.bytes().await;
                sleep(delay).await;
            }
            Err(err) => {
                if !is_retriable_send_error(&err) || attempt >= MAX_RETRIES {
                    return Err(err);
                }

                let base_delay = retry_base_delay(attempt);
                let delay = add_jitter(base_delay);
                debug!(
                    "HTTP request error: {}; retrying in {:?} (attempt {}/{})",
                    err,
                    delay,
                    attempt + 1,
                    MAX_RETRIES + 1
                );
                sleep(delay).await;
            }
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles() {
        assert_eq!(retry_base_delay(0), Duration::from_secs(1));
        assert_eq!(retry_base_delay(1), Duration::from_secs(2));
        assert_eq!(retry_base_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let base = Duration::from_secs(4);
        for _ in 0..20 {
            let delay = add_jitter(base);
            assert!(delay >= base);
            assert!(delay <= base + Duration::from_secs(1));
        }
    }

    #[test]
    fn test_retriable_statuses() {
        assert!(is_retriable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retriable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retriable_status(StatusCode::NOT_FOUND));
        assert!(!is_retriable_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let workspace = HttpWorkspace::new("http://host:8080/sandbox/42", None).unwrap();
        assert_eq!(
            workspace.url(READ_ENDPOINT).unwrap().as_str(),
            "http://host:8080/sandbox/42/api/fs/read"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpWorkspace::new("not a url", None),
            Err(WorkspaceError::InvalidUrl(_))
        ));
    }
}
