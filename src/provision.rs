//! The list → download → extract → package pipeline.

use anyhow::Result;
use log::{info, warn};
use std::path::Path;

use crate::archive::extract_all;
use crate::config::{Config, Settings};
use crate::download::download_asset;
use crate::github::GetReleases;
use crate::http::HttpClient;
use crate::package::{PackageReport, package};
use crate::release::{ResolvedAsset, find_asset};
use crate::runtime::Runtime;
use crate::state::{DownloadRecord, RunState, Step};
use crate::target::Target;

/// Mode of the lib directory when this tool creates it.
pub const LIB_DIR_MODE: u32 = 0o755;

#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// The pipeline ran (fully or from a resumed step).
    Provisioned(Option<PackageReport>),
    /// Nothing to do; the lib directory is already provisioned.
    AlreadyProvisioned,
}

/// Builds the real GitHub client from `config` and runs the pipeline.
#[tracing::instrument(skip(runtime, config))]
pub async fn provision<R: Runtime>(runtime: R, config: Config) -> Result<Outcome> {
    let provisioner = Provisioner::new(
        runtime,
        config.github,
        config.http_client,
        config.settings,
    );
    provisioner.run().await
}

pub struct Provisioner<R: Runtime, G: GetReleases> {
    runtime: R,
    github: G,
    http_client: HttpClient,
    settings: Settings,
}

impl<R: Runtime, G: GetReleases> Provisioner<R, G> {
    pub fn new(runtime: R, github: G, http_client: HttpClient, settings: Settings) -> Self {
        Self {
            runtime,
            github,
            http_client,
            settings,
        }
    }

    fn lib_dir(&self) -> &Path {
        &self.settings.lib_dir
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<Outcome> {
        let Some(mut state) = self.prepare()? else {
            return Ok(Outcome::AlreadyProvisioned);
        };

        let mut report = None;
        loop {
            match state.next_step() {
                Step::Download(target) => {
                    let asset = self.resolve(target).await?;
                    download_asset(&self.runtime, &self.http_client, &asset, self.lib_dir())
                        .await?;
                    state.record_download(DownloadRecord {
                        target,
                        version: asset.version,
                        filename: asset.name,
                    });
                }
                Step::Extract => {
                    let archives: Vec<&str> =
                        state.downloads.iter().map(|d| d.filename.as_str()).collect();
                    extract_all(&self.runtime, self.lib_dir(), &archives)?;
                    state.extracted = true;
                }
                Step::Package => {
                    report = Some(package(
                        &self.runtime,
                        self.lib_dir(),
                        &self.settings.arch,
                        &state.downloads,
                    )?);
                    state.packaged = true;
                }
                Step::Done => break,
            }
            state.save(&self.runtime, self.lib_dir())?;
        }

        Ok(Outcome::Provisioned(report))
    }

    /// Lists the releases of `target` and picks the devel asset to fetch.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, target: Target) -> Result<ResolvedAsset> {
        info!("Listing {} releases ...", target);
        let releases = self.github.get_releases(&target.repo()).await?;
        let asset = find_asset(&releases, target, &self.settings.version_prefix)?;
        info!("Latest {} version: {}", target, asset.version);
        info!("URL: {}", asset.url);
        Ok(asset)
    }

    /// Decides where to start. `None` means there is nothing to do.
    fn prepare(&self) -> Result<Option<RunState>> {
        let dir = self.lib_dir();

        if !self.runtime.exists(dir) {
            self.runtime.create_dir_all(dir)?;
            self.runtime.set_permissions(dir, LIB_DIR_MODE)?;
            let state = RunState::default();
            state.save(&self.runtime, dir)?;
            return Ok(Some(state));
        }

        if self.settings.force {
            info!("Re-provisioning {:?}", dir);
            // An interrupted forced run must resume, not find the old complete state.
            let state = RunState::default();
            state.save(&self.runtime, dir)?;
            return Ok(Some(state));
        }

        match RunState::load(&self.runtime, dir)? {
            Some(state) if state.is_complete() => {
                info!("{:?} is already provisioned", dir);
                Ok(None)
            }
            Some(state) => {
                info!("Resuming at {:?}", state.next_step());
                Ok(Some(state))
            }
            None => {
                warn!(
                    "{:?} exists without run state; assuming it is already provisioned (use --force to redo)",
                    dir
                );
                Ok(None)
            }
        }
    }
}
