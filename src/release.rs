//! Picks the devel asset to download from a repository's release listing.

use log::debug;
use std::cmp::Ordering;

use crate::error::ProvisionError;
use crate::github::Release;
use crate::target::Target;

/// Default major-version prefix: SDL 2.x.
pub const DEFAULT_VERSION_PREFIX: &str = "2.";

/// The asset chosen for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAsset {
    pub target: Target,
    pub version: String,
    pub name: String,
    pub url: String,
    /// Size published by the API; 0 when unknown.
    pub size: u64,
}

/// Finds the newest release of `target` whose version starts with `prefix` and
/// which ships the expected mingw devel archive.
///
/// Releases without the archive are passed over, so an older release can win
/// when the newest one was published without mingw builds. Among candidates the
/// greatest version wins; equal versions keep API order.
pub fn find_asset(
    releases: &[Release],
    target: Target,
    prefix: &str,
) -> Result<ResolvedAsset, ProvisionError> {
    let mut best: Option<ResolvedAsset> = None;

    for release in releases {
        let version = release.version();
        if !version.starts_with(prefix) {
            debug!("Skipping {} release {}: outside {}*", target, version, prefix);
            continue;
        }

        let expected = target.asset_name(version);
        let Some(asset) = release.assets.iter().find(|a| a.name == expected) else {
            debug!("{} release {} has no asset {}", target, version, expected);
            continue;
        };

        let newer = best
            .as_ref()
            .is_none_or(|b| compare_versions(version, &b.version) == Ordering::Greater);
        if newer {
            best = Some(ResolvedAsset {
                target,
                version: version.to_string(),
                name: asset.name.clone(),
                url: asset.browser_download_url.clone(),
                size: asset.size,
            });
        }
    }

    best.ok_or_else(|| ProvisionError::AssetNotFound {
        repo: target.repo().to_string(),
        prefix: prefix.to_string(),
        pattern: target.asset_name(&format!("{}*", prefix)),
    })
}

/// Compares dotted version strings by their numeric components.
///
/// Non-numeric separators are ignored, so `2.30.0` > `2.8.2` and `2.30.10` > `2.30.9`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    numeric_components(a).cmp(&numeric_components(b))
}

fn numeric_components(version: &str) -> Vec<u64> {
    version
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().unwrap_or(u64::MAX))
        .collect()
}
