use crate::http::HttpClient;
use crate::release::ResolvedAsset;
use crate::runtime::Runtime;
use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Suffix of the file a download is streamed into before it is complete.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Downloads a resolved asset into `dir`, keeping its published filename.
///
/// The body goes to `<name>.part` first and is renamed once it is complete, so
/// `dir/<name>` is never a truncated archive. Returns the path of the archive.
#[tracing::instrument(skip(runtime, asset, http_client), fields(asset = %asset.name))]
pub async fn download_asset<R: Runtime>(
    runtime: &R,
    http_client: &HttpClient,
    asset: &ResolvedAsset,
    dir: &Path,
) -> Result<PathBuf> {
    if asset.size > 0 {
        info!("Downloading {} ({} bytes) ...", asset.name, asset.size);
    } else {
        info!("Downloading {} ...", asset.name);
    }

    let dest = dir.join(&asset.name);
    let partial = dir.join(format!("{}{}", asset.name, PARTIAL_SUFFIX));

    let bytes = match fetch(runtime, http_client, asset, &partial).await {
        Ok(bytes) => bytes,
        Err(e) => {
            discard(runtime, &partial);
            return Err(e);
        }
    };

    runtime.rename(&partial, &dest)?;
    info!("Done ({} bytes)", bytes);
    Ok(dest)
}

async fn fetch<R: Runtime>(
    runtime: &R,
    http_client: &HttpClient,
    asset: &ResolvedAsset,
    partial: &Path,
) -> Result<u64> {
    let bytes = http_client
        .download_file(&asset.url, || {
            runtime
                .create_file(partial)
                .with_context(|| format!("Failed to create {:?}", partial))
        })
        .await
        .with_context(|| format!("Failed to download {}", asset.url))?;

    if asset.size > 0 && bytes != asset.size {
        bail!(
            "Incomplete download of {}: got {} of {} bytes",
            asset.url,
            bytes,
            asset.size
        );
    }
    Ok(bytes)
}

fn discard<R: Runtime>(runtime: &R, partial: &Path) {
    if !runtime.exists(partial) {
        return;
    }
    if let Err(e) = runtime.remove_file(partial) {
        warn!("Failed to remove {:?}: {:#}", partial, e);
    }
}
