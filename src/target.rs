//! The fixed set of SDL repositories this tool provisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::github::GitHubRepo;

const OWNER: &str = "libsdl-org";

/// A repository whose mingw devel package gets merged into the lib tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Base library, `libsdl-org/SDL`
    Sdl2,
    /// Image extension, `libsdl-org/SDL_image`
    Sdl2Image,
}

impl Target {
    /// Processing order: the base library first so the extension can overlay it.
    pub const ALL: [Target; 2] = [Target::Sdl2, Target::Sdl2Image];

    pub fn repo(self) -> GitHubRepo {
        let repo = match self {
            Target::Sdl2 => "SDL",
            Target::Sdl2Image => "SDL_image",
        };
        GitHubRepo {
            owner: OWNER.to_string(),
            repo: repo.to_string(),
        }
    }

    /// Name prefix shared by the asset, the extracted directory and the inner package root.
    pub fn stem(self) -> &'static str {
        match self {
            Target::Sdl2 => "SDL2",
            Target::Sdl2Image => "SDL2_image",
        }
    }

    /// `SDL2-devel-2.30.0-mingw.tar.gz`
    pub fn asset_name(self, version: &str) -> String {
        format!("{}.tar.gz", self.devel_dir_name(version))
    }

    /// `SDL2-devel-2.30.0-mingw`
    pub fn devel_dir_name(self, version: &str) -> String {
        format!("{}-devel-{}-mingw", self.stem(), version)
    }

    /// Extracts the version embedded in a devel directory name, if it belongs to this target.
    pub fn version_from_dir_name(self, name: &str) -> Option<&str> {
        name.strip_prefix(self.stem())?
            .strip_prefix("-devel-")?
            .strip_suffix("-mingw")
            .filter(|v| !v.is_empty())
    }

    /// Identifies the target and version of an extracted devel directory.
    pub fn from_dir_name(name: &str) -> Option<(Target, &str)> {
        Target::ALL
            .iter()
            .find_map(|t| t.version_from_dir_name(name).map(|v| (*t, v)))
    }

    /// Path of the per-architecture tree inside an extracted devel directory,
    /// e.g. `SDL2-2.30.0/x86_64-w64-mingw32`.
    pub fn arch_root(self, version: &str, arch: &str) -> PathBuf {
        PathBuf::from(format!("{}-{}", self.stem(), version)).join(arch)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}
