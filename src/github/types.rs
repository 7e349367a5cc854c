use serde::{Deserialize, Serialize};

/// A file attached to a GitHub release. Only the fields this tool reads.
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, Default)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub browser_download_url: String,
}

/// A GitHub release. Only the fields this tool reads.
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, Default)]
pub struct Release {
    #[serde(default)]
    pub tag_name: String,
    pub name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// The displayed version: the release name, or the tag when the name is blank.
    pub fn version(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.tag_name.as_str())
    }
}
