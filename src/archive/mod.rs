//! Unpacking of downloaded `.tar.gz` devel packages.

use crate::error::ProvisionError;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info};
use std::path::{Path, PathBuf};
use tar::Archive;

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Name of the directory an archive extracts into: its filename minus `.tar.gz`.
pub fn extracted_dir_name(archive_path: &Path) -> Option<String> {
    let name = archive_path.file_name()?.to_str()?;
    name.strip_suffix(ARCHIVE_SUFFIX)
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// Extracts each named archive in `dir` into a sibling directory of the same name.
///
/// Only the listed archives are touched; anything else left in `dir` (older
/// downloads, `.part` files) is ignored. An existing output directory is replaced.
#[tracing::instrument(skip(runtime))]
pub fn extract_all<R: Runtime>(
    runtime: &R,
    dir: &Path,
    archives: &[&str],
) -> Result<Vec<PathBuf>> {
    let mut extracted = Vec::new();

    for name in archives {
        let path = dir.join(name);
        info!("Extracting {} ...", name);
        let dest_name = extracted_dir_name(&path).ok_or_else(|| {
            ProvisionError::ExtractionFailed {
                archive: path.clone(),
                reason: format!("not a {} archive", ARCHIVE_SUFFIX),
            }
        })?;
        let dest = dir.join(dest_name);
        if runtime.is_dir(&dest) {
            debug!("Replacing {:?}", dest);
            runtime.remove_dir_all(&dest)?;
        }
        extract(runtime, &path, &dest)?;
        extracted.push(dest);
    }

    info!("Done");
    Ok(extracted)
}

/// Unpacks one gzip-compressed tarball into `extract_to`, creating it if needed.
///
/// Entries that would escape `extract_to` are skipped by `tar`.
#[tracing::instrument(skip(runtime))]
pub fn extract<R: Runtime>(runtime: &R, archive_path: &Path, extract_to: &Path) -> Result<()> {
    let file = runtime
        .open(archive_path)
        .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
    runtime.create_dir_all(extract_to)?;

    let failed = |reason: String| ProvisionError::ExtractionFailed {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let mut archive = Archive::new(GzDecoder::new(file));
    let mut count = 0usize;
    for entry in archive.entries().map_err(|e| failed(e.to_string()))? {
        let mut entry = entry.map_err(|e| failed(e.to_string()))?;
        let unpacked = entry
            .unpack_in(extract_to)
            .map_err(|e| failed(e.to_string()))?;
        if !unpacked {
            debug!("Skipped unsafe entry in {:?}", archive_path);
        }
        count += 1;
    }

    debug!("Unpacked {} entries into {:?}", count, extract_to);
    Ok(())
}
