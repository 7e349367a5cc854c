/// An `owner/repo` pair on GitHub.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
}

impl GitHubRepo {
    /// Releases collection endpoint under the given API root.
    pub fn releases_url(&self, api_url: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            api_url.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
