use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use super::repo::GitHubRepo;
use super::types::Release;
use crate::http::HttpClient;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
// 10 pages (1000 releases) is far beyond what any SDL repository publishes.
const MAX_PAGES: usize = 10;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GetReleases: Send + Sync {
    /// Lists releases in the order the API returns them.
    async fn get_releases(&self, repo: &GitHubRepo) -> Result<Vec<Release>>;
}

pub struct GitHub {
    http_client: HttpClient,
    api_url: String,
}

impl GitHub {
    pub fn new(http_client: HttpClient, api_url: Option<String>) -> Self {
        let api_url = api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            http_client,
            api_url,
        }
    }
}

#[async_trait]
impl GetReleases for GitHub {
    #[tracing::instrument(skip(self))]
    async fn get_releases(&self, repo: &GitHubRepo) -> Result<Vec<Release>> {
        let url = repo.releases_url(&self.api_url);
        let per_page = PER_PAGE.to_string();
        let mut releases = Vec::new();

        for page in 1..=MAX_PAGES {
            debug!("Fetching releases page {} from {}...", page, url);

            let page_str = page.to_string();
            let parsed: Vec<Release> = self
                .http_client
                .get_json_with_query(
                    &url,
                    &[("per_page", per_page.as_str()), ("page", page_str.as_str())],
                )
                .await?;

            let len = parsed.len();
            releases.extend(parsed);

            if len < PER_PAGE {
                break;
            }
        }

        debug!("Fetched {} releases of {}", releases.len(), repo);
        Ok(releases)
    }
}
