//! File system operations backing [`RealRuntime`].

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self, contents))]
    pub(crate) fn write_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn rename_impl(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).with_context(|| format!("Failed to rename {:?} to {:?}", from, to))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn copy_impl(&self, from: &Path, to: &Path) -> Result<u64> {
        fs::copy(from, to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("Failed to create directory {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_file_impl(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).with_context(|| format!("Failed to remove directory {:?}", path))
    }

    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }

    pub(crate) fn is_dir_impl(&self, path: &Path) -> bool {
        path.is_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_dir_impl(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("Failed to read directory {:?}", path))?
            .map(|entry| Ok(entry?.path()))
            .collect::<Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_file_impl(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        let file =
            fs::File::create(path).with_context(|| format!("Failed to create file {:?}", path))?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn open_impl(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn set_permissions_impl(&self, path: &Path, mode: u32) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .with_context(|| format!("Failed to set permissions on {:?}", path))?;
        }
        #[cfg(not(unix))]
        {
            let _ = (path, mode);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_file_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sdl2-config");

        runtime.write(&file_path, b"prefix=/usr").unwrap();
        assert!(runtime.exists(&file_path));
        assert!(!runtime.is_dir(&file_path));
        assert_eq!(runtime.read_to_string(&file_path).unwrap(), "prefix=/usr");

        let copy_path = dir.path().join("copy");
        assert_eq!(runtime.copy(&file_path, &copy_path).unwrap(), 11);
        assert_eq!(runtime.read_to_string(&copy_path).unwrap(), "prefix=/usr");
    }

    #[test]
    fn test_real_runtime_rename_and_remove() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let part = dir.path().join("asset.tar.gz.part");
        let done = dir.path().join("asset.tar.gz");
        runtime.write(&done, b"old").unwrap();
        runtime.write(&part, b"new").unwrap();

        runtime.rename(&part, &done).unwrap();
        assert!(!runtime.exists(&part));
        assert_eq!(runtime.read_to_string(&done).unwrap(), "new");

        runtime.remove_file(&done).unwrap();
        assert!(!runtime.exists(&done));

        let tree = dir.path().join("SDL2-devel-2.30.0-mingw");
        runtime.create_dir_all(&tree.join("SDL2-2.30.0/bin")).unwrap();
        runtime.write(&tree.join("SDL2-2.30.0/bin/SDL2.dll"), b"dll").unwrap();
        runtime.remove_dir_all(&tree).unwrap();
        assert!(!runtime.exists(&tree));
    }

    #[test]
    fn test_real_runtime_read_dir_is_sorted() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        for name in ["b", "c", "a"] {
            runtime.create_dir_all(&dir.path().join(name)).unwrap();
        }

        let entries = runtime.read_dir(dir.path()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_real_runtime_create_file_and_open() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("asset.tar.gz");

        {
            let mut writer = runtime.create_file(&file_path).unwrap();
            writer.write_all(b"streamed content").unwrap();
        }

        let mut reader = runtime.open(&file_path).unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "streamed content");
    }

    #[cfg(unix)]
    #[test]
    fn test_real_runtime_set_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let lib = dir.path().join("lib");
        runtime.create_dir_all(&lib).unwrap();
        runtime.set_permissions(&lib, 0o755).unwrap();

        let mode = std::fs::metadata(&lib).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_real_runtime_errors() {
        let runtime = RealRuntime;
        let missing = std::path::Path::new("/nonexistent/path/file.txt");

        assert!(runtime.read_to_string(missing).is_err());
        assert!(runtime.open(missing).is_err());
        assert!(runtime.read_dir(missing).is_err());
    }
}
