//! Merges extracted devel packages into the consolidated `bin/`, `include/SDL2/`
//! and `lib/` tree and fixes up `sdl2-config`.

use crate::archive::ARCHIVE_SUFFIX;
use crate::error::ProvisionError;
use crate::runtime::Runtime;
use crate::state::DownloadRecord;
use crate::target::Target;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

pub const DEFAULT_ARCH: &str = "x86_64-w64-mingw32";

/// Config script shipped in the base package's `bin/`.
pub const CONFIG_SCRIPT: &str = "sdl2-config";

/// Subpaths copied from each package's arch root, relative to both source and destination.
pub const MERGED_SUBPATHS: [&str; 3] = ["bin", "include/SDL2", "lib"];

const INCLUDE_FROM: &str = "/include/SDL2";
const INCLUDE_TO: &str = "/include";

/// An extracted devel package found in the lib directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DevelPackage {
    pub target: Target,
    pub version: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackageReport {
    pub packages: Vec<DevelPackage>,
    pub files_copied: u64,
    pub config_replacements: usize,
}

/// Finds extracted devel directories in `dir`, in name order.
pub fn discover_packages<R: Runtime>(runtime: &R, dir: &Path) -> Result<Vec<DevelPackage>> {
    let mut packages = Vec::new();
    for path in runtime.read_dir(dir)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(ARCHIVE_SUFFIX) || !runtime.is_dir(&path) {
            continue;
        }
        match Target::from_dir_name(name) {
            Some((target, version)) => packages.push(DevelPackage {
                target,
                version: version.to_string(),
                path: path.clone(),
            }),
            None => debug!("Ignoring {:?}", path),
        }
    }
    Ok(packages)
}

/// Selects the discovered packages matching `downloads`, in target order.
///
/// Devel directories of other versions are left out. A download without an
/// extracted directory fails with [`ProvisionError::CopySourceMissing`].
pub fn select_packages(
    discovered: Vec<DevelPackage>,
    dir: &Path,
    downloads: &[DownloadRecord],
) -> Result<Vec<DevelPackage>> {
    let mut selected = Vec::new();
    for pkg in discovered {
        let wanted = downloads
            .iter()
            .any(|d| d.target == pkg.target && d.version == pkg.version);
        if wanted {
            selected.push(pkg);
        } else {
            debug!("Ignoring {} {} at {:?}", pkg.target, pkg.version, pkg.path);
        }
    }

    for record in downloads {
        if !selected.iter().any(|p| p.target == record.target) {
            return Err(ProvisionError::CopySourceMissing {
                path: dir.join(record.target.devel_dir_name(&record.version)),
            }
            .into());
        }
    }

    selected.sort_by_key(|p| p.target);
    Ok(selected)
}

/// Copies the packages of `downloads` into the merged tree under `dir`, then
/// patches `dir/bin/sdl2-config`.
///
/// Files already present are overwritten, so running this twice leaves the same tree.
#[tracing::instrument(skip(runtime, downloads))]
pub fn package<R: Runtime>(
    runtime: &R,
    dir: &Path,
    arch: &str,
    downloads: &[DownloadRecord],
) -> Result<PackageReport> {
    info!("Packaging ...");

    for sub in MERGED_SUBPATHS {
        runtime.create_dir_all(&dir.join(sub))?;
    }

    let packages = select_packages(discover_packages(runtime, dir)?, dir, downloads)?;
    let mut files_copied = 0;
    for pkg in &packages {
        let root = pkg.path.join(pkg.target.arch_root(&pkg.version, arch));
        debug!("Merging {} {} from {:?}", pkg.target, pkg.version, root);
        for sub in MERGED_SUBPATHS {
            files_copied += copy_dir_merge(runtime, &root.join(sub), &dir.join(sub))?;
        }
    }

    let config_script = dir.join("bin").join(CONFIG_SCRIPT);
    let config_replacements = patch_config_script(runtime, &config_script)?;

    info!("Done ({} packages, {} files)", packages.len(), files_copied);
    Ok(PackageReport {
        packages,
        files_copied,
        config_replacements,
    })
}

/// Recursively copies the contents of `src` into `dst`, creating directories
/// and overwriting files. Returns the number of files copied.
pub fn copy_dir_merge<R: Runtime>(runtime: &R, src: &Path, dst: &Path) -> Result<u64> {
    if !runtime.is_dir(src) {
        return Err(ProvisionError::CopySourceMissing {
            path: src.to_path_buf(),
        }
        .into());
    }
    runtime.create_dir_all(dst)?;

    let mut copied = 0;
    for entry in runtime.read_dir(src)? {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = dst.join(name);
        if runtime.is_dir(&entry) {
            copied += copy_dir_merge(runtime, &entry, &target)?;
        } else {
            runtime
                .copy(&entry, &target)
                .with_context(|| format!("Failed to merge {:?}", entry))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Rewrites every `/include/SDL2` to `/include`, returning the new text and the
/// number of replacements. Patched text is a fixed point.
pub fn patch_config_text(text: &str) -> (String, usize) {
    let count = text.matches(INCLUDE_FROM).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    (text.replace(INCLUDE_FROM, INCLUDE_TO), count)
}

/// Patches the config script in place. The file is only rewritten when something changed.
pub fn patch_config_script<R: Runtime>(runtime: &R, path: &Path) -> Result<usize> {
    if !runtime.exists(path) {
        return Err(ProvisionError::CopySourceMissing {
            path: path.to_path_buf(),
        }
        .into());
    }
    let original = runtime.read_to_string(path)?;
    let (patched, count) = patch_config_text(&original);
    if count > 0 {
        runtime.write(path, patched.as_bytes())?;
    }
    debug!("Patched {} include path(s) in {:?}", count, path);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::extract_all;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::test_utils::{ARCH, devel_archive};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    files.insert(
                        path.strip_prefix(root).unwrap().to_path_buf(),
                        fs::read(&path).unwrap(),
                    );
                }
            }
        }
        files
    }

    fn merged_snapshot(lib: &Path) -> Vec<BTreeMap<PathBuf, Vec<u8>>> {
        MERGED_SUBPATHS
            .iter()
            .map(|sub| snapshot(&lib.join(sub)))
            .collect()
    }

    fn record(target: Target, version: &str) -> DownloadRecord {
        DownloadRecord {
            target,
            version: version.to_string(),
            filename: target.asset_name(version),
        }
    }

    fn downloads() -> Vec<DownloadRecord> {
        vec![
            record(Target::Sdl2, "2.30.0"),
            record(Target::Sdl2Image, "2.8.2"),
        ]
    }

    fn extract_into(dir: &Path, records: &[DownloadRecord]) {
        for r in records {
            fs::write(dir.join(&r.filename), devel_archive(r.target, &r.version)).unwrap();
        }
        let names: Vec<&str> = records.iter().map(|r| r.filename.as_str()).collect();
        extract_all(&RealRuntime, dir, &names).unwrap();
    }

    fn extracted_lib_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        extract_into(dir.path(), &downloads());
        dir
    }

    #[test]
    fn test_patch_config_text_replaces_every_occurrence() {
        let (patched, count) =
            patch_config_text("-I${prefix}/include/SDL2 -I/usr/include/SDL2 -lSDL2");
        assert_eq!(patched, "-I${prefix}/include -I/usr/include -lSDL2");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_patch_config_text_is_fixed_point() {
        let (once, _) = patch_config_text("echo -I${prefix}/include/SDL2 -Dmain=SDL_main");
        let (twice, count) = patch_config_text(&once);
        assert_eq!(once, twice);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_discover_packages_ignores_archives_and_outputs() {
        let dir = extracted_lib_dir();
        fs::create_dir_all(dir.path().join("bin")).unwrap();

        let packages = discover_packages(&RealRuntime, dir.path()).unwrap();

        let found: Vec<_> = packages
            .iter()
            .map(|p| (p.target, p.version.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![(Target::Sdl2, "2.30.0"), (Target::Sdl2Image, "2.8.2")]
        );
    }

    #[test]
    fn test_package_merges_layout() {
        let dir = extracted_lib_dir();
        let lib = dir.path();

        let report = package(&RealRuntime, lib, ARCH, &downloads()).unwrap();

        assert_eq!(report.packages.len(), 2);
        assert_eq!(report.config_replacements, 1);
        assert!(lib.join("bin/SDL2.dll").is_file());
        assert!(lib.join("bin/SDL2_image.dll").is_file());
        assert!(lib.join("include/SDL2/SDL2.h").is_file());
        assert!(lib.join("include/SDL2/SDL2_image.h").is_file());
        assert!(lib.join("lib/libSDL2.dll.a").is_file());
        assert!(lib.join("lib/pkgconfig/sdl2_image.pc").is_file());

        let config = fs::read_to_string(lib.join("bin/sdl2-config")).unwrap();
        assert!(config.contains("echo -I${prefix}/include -Dmain=SDL_main"));
        assert!(!config.contains("/include/SDL2"));
    }

    #[test]
    fn test_package_twice_yields_same_tree() {
        let dir = extracted_lib_dir();
        let lib = dir.path();

        package(&RealRuntime, lib, ARCH, &downloads()).unwrap();
        let first = merged_snapshot(lib);

        let second_report = package(&RealRuntime, lib, ARCH, &downloads()).unwrap();
        let second = merged_snapshot(lib);

        assert_eq!(first, second);
        // The fresh copy of sdl2-config is patched again.
        assert_eq!(second_report.config_replacements, 1);
    }

    #[test]
    fn test_package_wrong_arch_reports_missing_source() {
        let dir = extracted_lib_dir();

        let err =
            package(&RealRuntime, dir.path(), "i686-w64-mingw32", &downloads()).unwrap_err();

        match err.downcast_ref::<ProvisionError>() {
            Some(ProvisionError::CopySourceMissing { path }) => {
                assert!(path.ends_with("i686-w64-mingw32/bin"), "{path:?}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_package_without_config_script_fails() {
        let dir = tempdir().unwrap();
        let image_only = vec![record(Target::Sdl2Image, "2.8.2")];
        extract_into(dir.path(), &image_only);

        let err = package(&RealRuntime, dir.path(), ARCH, &image_only).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::CopySourceMissing { .. })
        ));
    }

    #[test]
    fn test_package_merges_only_downloaded_versions() {
        let dir = tempdir().unwrap();
        let lib = dir.path();
        // 2.8.2 sorts after 2.10.0, so merging everything would let it win.
        extract_into(lib, &[record(Target::Sdl2Image, "2.8.2")]);
        let current = vec![
            record(Target::Sdl2, "2.30.0"),
            record(Target::Sdl2Image, "2.10.0"),
        ];
        extract_into(lib, &current);

        let report = package(&RealRuntime, lib, ARCH, &current).unwrap();

        let merged: Vec<_> = report
            .packages
            .iter()
            .map(|p| (p.target, p.version.as_str()))
            .collect();
        assert_eq!(
            merged,
            vec![(Target::Sdl2, "2.30.0"), (Target::Sdl2Image, "2.10.0")]
        );
        assert_eq!(
            fs::read_to_string(lib.join("include/SDL2/SDL2_image.h")).unwrap(),
            "/* SDL2_image 2.10.0 */"
        );
    }

    #[test]
    fn test_package_missing_download_dir_is_reported() {
        let dir = extracted_lib_dir();
        let wanted = vec![
            record(Target::Sdl2, "2.30.0"),
            record(Target::Sdl2Image, "2.10.0"),
        ];

        let err = package(&RealRuntime, dir.path(), ARCH, &wanted).unwrap_err();

        match err.downcast_ref::<ProvisionError>() {
            Some(ProvisionError::CopySourceMissing { path }) => {
                assert!(path.ends_with("SDL2_image-devel-2.10.0-mingw"), "{path:?}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_patch_config_script_skips_write_when_unchanged() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("echo -I${prefix}/include".to_string()));
        runtime.expect_write().never();

        let count = patch_config_script(&runtime, Path::new("lib/bin/sdl2-config")).unwrap();
        assert_eq!(count, 0);
    }
}
