use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use std::path::PathBuf;
use std::time::Duration;

use crate::github::GitHub;
use crate::http::HttpClient;
use crate::package::DEFAULT_ARCH;
use crate::release::DEFAULT_VERSION_PREFIX;

pub const DEFAULT_LIB_DIR: &str = "lib";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// What to provision and where.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub lib_dir: PathBuf,
    pub arch: String,
    pub version_prefix: String,
    pub force: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lib_dir: PathBuf::from(DEFAULT_LIB_DIR),
            arch: DEFAULT_ARCH.to_string(),
            version_prefix: DEFAULT_VERSION_PREFIX.to_string(),
            force: false,
        }
    }
}

pub struct Config {
    pub github: GitHub,
    pub http_client: HttpClient,
    pub settings: Settings,
}

impl Config {
    pub fn new(
        settings: Settings,
        api_url: Option<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = build_client(token.as_deref(), timeout)?;
        let http_client = HttpClient::new(client);
        let github = GitHub::new(http_client.clone(), api_url);

        Ok(Self {
            github,
            http_client,
            settings,
        })
    }
}

fn build_client(token: Option<&str>, timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        debug!("Using GITHUB_TOKEN for authentication");
    }

    let client = Client::builder()
        .user_agent(concat!("sdlget/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(timeout)
        .build()?;
    Ok(client)
}
