//! Run state recorded in the lib directory so interrupted runs can resume.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;
use crate::target::Target;

pub const STATE_FILE: &str = ".sdlget-state.json";

/// A completed download.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DownloadRecord {
    pub target: Target,
    pub version: String,
    pub filename: String,
}

/// Completed pipeline steps, persisted as JSON after each one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RunState {
    #[serde(default)]
    pub downloads: Vec<DownloadRecord>,
    #[serde(default)]
    pub extracted: bool,
    #[serde(default)]
    pub packaged: bool,
}

/// The next thing a run has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Download(Target),
    Extract,
    Package,
    Done,
}

impl RunState {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(STATE_FILE)
    }

    /// Loads the state file from `dir`, or `None` if there is none.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(dir);
        if !runtime.exists(&path) {
            return Ok(None);
        }
        let content = runtime.read_to_string(&path)?;
        let state = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse run state {:?}", path))?;
        Ok(Some(state))
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        runtime.write(&Self::path(dir), json.as_bytes())
    }

    pub fn download_for(&self, target: Target) -> Option<&DownloadRecord> {
        self.downloads.iter().find(|d| d.target == target)
    }

    pub fn record_download(&mut self, record: DownloadRecord) {
        self.downloads.retain(|d| d.target != record.target);
        self.downloads.push(record);
        // A new archive has not been unpacked or merged yet.
        self.extracted = false;
        self.packaged = false;
    }

    pub fn next_step(&self) -> Step {
        if let Some(target) = Target::ALL
            .into_iter()
            .find(|t| self.download_for(*t).is_none())
        {
            return Step::Download(target);
        }
        if !self.extracted {
            return Step::Extract;
        }
        if !self.packaged {
            return Step::Package;
        }
        Step::Done
    }

    pub fn is_complete(&self) -> bool {
        self.next_step() == Step::Done
    }
}
