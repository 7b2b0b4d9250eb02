//! Minimal GitHub REST client.

use async_trait::async_trait;
use covbase_core::context::RepoSlug;
use covbase_core::ports::{
    CommitInfo, CommitRef, CommitService, PullRequestRefs, PullRequestService,
};
use covbase_core::{Error, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    head: BranchRef,
    base: BranchRef,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    #[serde(default)]
    parents: Vec<CommitRef>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::MissingInput("token".into()));
        }
        let client = Client::builder()
            .user_agent(concat!("covbase/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create GitHub client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let res = req
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = res.status();
        debug!(status = status.as_u16(), "{}", what);
        match status {
            s if s.is_success() => Ok(res),
            StatusCode::NOT_FOUND => Err(Error::NotFound(what.to_string())),
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            _ => {
                let body = res.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|b| b.message)
                    .unwrap_or_else(|_| status.to_string());
                Err(Error::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let res = self.send(req, what).await?;
        res.json()
            .await
            .map_err(|e| Error::Serialization(format!("{}: {}", what, e)))
    }

    /// `GET /repos/{owner}/{repo}/pulls/{number}`
    pub async fn get_pull(&self, repo: &RepoSlug, number: u64) -> Result<PullRequestRefs> {
        let path = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, number);
        let pr: PullRequestResponse = self
            .get_json(self.request(Method::GET, &path), &format!("pull request #{number}"))
            .await?;
        Ok(PullRequestRefs {
            head_ref: pr.head.ref_name,
            base_ref: pr.base.ref_name,
        })
    }

    /// `GET /repos/{owner}/{repo}/commits/{ref}`
    pub async fn fetch_commit(&self, repo: &RepoSlug, reference: &str) -> Result<CommitInfo> {
        let path = format!("/repos/{}/{}/commits/{}", repo.owner, repo.repo, reference);
        let commit: CommitResponse = self
            .get_json(self.request(Method::GET, &path), &format!("commit {reference}"))
            .await?;
        Ok(CommitInfo {
            sha: commit.sha,
            parents: commit.parents,
        })
    }
}

#[async_trait]
impl PullRequestService for GitHubClient {
    async fn get_pull_request(&self, repo: &RepoSlug, number: u64) -> Result<PullRequestRefs> {
        self.get_pull(repo, number).await
    }
}

#[async_trait]
impl CommitService for GitHubClient {
    async fn get_commit(&self, repo: &RepoSlug, reference: &str) -> Result<CommitInfo> {
        self.fetch_commit(repo, reference).await
    }
}
