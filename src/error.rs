//! Error kinds raised by the provisioning pipeline.
//!
//! These travel inside `anyhow::Error` and can be recovered with `downcast_ref`.

use std::path::PathBuf;

/// Failures that stop a provisioning run.
#[derive(Debug)]
pub enum ProvisionError {
    /// No release matching the version prefix carries the expected devel asset
    AssetNotFound {
        repo: String,
        prefix: String,
        pattern: String,
    },
    /// A file in the download directory could not be unpacked as a `.tar.gz`
    ExtractionFailed { archive: PathBuf, reason: String },
    /// A path the packager expected inside an extracted devel package is absent
    CopySourceMissing { path: PathBuf },
}

impl std::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionError::AssetNotFound {
                repo,
                prefix,
                pattern,
            } => {
                write!(
                    f,
                    "Asset not found: no release of {} with version prefix '{}' has an asset named {}",
                    repo, prefix, pattern
                )
            }
            ProvisionError::ExtractionFailed { archive, reason } => {
                write!(f, "Extraction failed for {}: {}", archive.display(), reason)
            }
            ProvisionError::CopySourceMissing { path } => {
                write!(f, "Copy source missing: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ProvisionError {}
