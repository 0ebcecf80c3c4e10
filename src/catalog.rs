use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// A validated directory together with a snapshot of the regular files in it.
///
/// The snapshot is taken once when the catalog is opened and is never
/// refreshed, so deletions made while resolving duplicates do not change it.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
    files: Vec<OsString>,
    exclusions: Vec<OsString>,
}

impl DirectoryCatalog {
    /// Opens `path` and lists its files in the order the platform returns them.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_exclusions(path, Vec::<OsString>::new())
    }

    /// Like [`open`](Self::open), leaving out entries whose name matches one of
    /// `exclusions` exactly.
    pub fn open_with_exclusions<I, S>(path: impl AsRef<Path>, exclusions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let exclusions: Vec<OsString> = exclusions.into_iter().map(Into::into).collect();
        let dir = path.as_ref().to_path_buf();
        let files = list_files(&dir, &exclusions)?;
        log::debug!("Catalogued {} files in {}", files.len(), dir.display());
        Ok(Self {
            dir,
            files,
            exclusions,
        })
    }

    /// Points the catalog at another directory.
    ///
    /// The replacement is built completely before it is swapped in; on error
    /// the catalog still describes the previous directory.
    pub fn rebind(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let fresh = Self::open_with_exclusions(path, self.exclusions.clone())?;
        *self = fresh;
        Ok(())
    }

    pub fn resolve_path(&self, name: impl AsRef<OsStr>) -> PathBuf {
        self.dir.join(name.as_ref())
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[OsString] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn list_files(dir: &Path, exclusions: &[OsString]) -> Result<Vec<OsString>> {
    if !dir.is_dir() {
        return Err(Error::InvalidDirectory(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir).map_err(|source| Error::UnreadableDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Error reading entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let name = entry.file_name();
        if name == "." || name == ".." {
            continue;
        }
        // Follows symlinks; pipes, sockets and devices would block or fail hashing.
        match fs::metadata(entry.path()) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                log::warn!("Error reading metadata for {}: {}", entry.path().display(), e);
                continue;
            }
        }
        if exclusions.contains(&name) {
            log::debug!("Excluding {}", entry.path().display());
            continue;
        }
        files.push(name);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(catalog: &DirectoryCatalog) -> Vec<String> {
        let mut names: Vec<String> = catalog
            .files()
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_open_lists_files_and_skips_subdirectories() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let dir = temp_dir.path();
        fs::write(dir.join("f.txt"), b"data").expect("Failed to write file");
        fs::write(dir.join("g.txt"), b"data").expect("Failed to write file");
        fs::create_dir(dir.join("d1")).expect("Failed to create subdirectory");
        fs::write(dir.join("d1").join("f.txt"), b"data").expect("Failed to write nested file");

        let catalog = DirectoryCatalog::open(dir).expect("catalog should open");
        assert_eq!(names(&catalog), vec!["f.txt", "g.txt"]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.directory(), dir);
    }

    #[test]
    fn test_open_empty_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let catalog = DirectoryCatalog::open(temp_dir.path()).expect("catalog should open");
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_open_missing_path_is_invalid_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let missing = temp_dir.path().join("missing");

        let result = DirectoryCatalog::open(&missing);
        assert!(matches!(result, Err(Error::InvalidDirectory(ref p)) if p == &missing));
        assert!(!missing.exists());
    }

    #[test]
    fn test_open_regular_file_is_invalid_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"data").expect("Failed to write file");

        let result = DirectoryCatalog::open(&file);
        assert!(matches!(result, Err(Error::InvalidDirectory(_))));
        assert_eq!(fs::read(&file).expect("file should survive"), b"data");
    }

    #[test]
    fn test_invalid_directory_message() {
        let err = DirectoryCatalog::open("/definitely/not/here").unwrap_err();
        assert_eq!(
            err.to_string(),
            "/definitely/not/here is not a valid directory."
        );
    }

    #[test]
    fn test_exclusions_are_left_out() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let dir = temp_dir.path();
        fs::write(dir.join("keep.txt"), b"a").expect("Failed to write file");
        fs::write(dir.join("skip.txt"), b"a").expect("Failed to write file");

        let catalog =
            DirectoryCatalog::open_with_exclusions(dir, ["skip.txt"]).expect("catalog should open");
        assert_eq!(names(&catalog), vec!["keep.txt"]);
    }

    #[test]
    fn test_rebind_replaces_snapshot() {
        let first = TempDir::new().expect("Failed to create temporary directory");
        let second = TempDir::new().expect("Failed to create temporary directory");
        fs::write(first.path().join("old.txt"), b"old").expect("Failed to write file");
        fs::write(second.path().join("new.txt"), b"new").expect("Failed to write file");

        let mut catalog = DirectoryCatalog::open(first.path()).expect("catalog should open");
        catalog.rebind(second.path()).expect("rebind should succeed");

        assert_eq!(catalog.directory(), second.path());
        assert_eq!(names(&catalog), vec!["new.txt"]);
    }

    #[test]
    fn test_rebind_failure_keeps_previous_state() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        fs::write(temp_dir.path().join("a.txt"), b"a").expect("Failed to write file");
        let mut catalog = DirectoryCatalog::open(temp_dir.path()).expect("catalog should open");

        let result = catalog.rebind(temp_dir.path().join("nope"));
        assert!(matches!(result, Err(Error::InvalidDirectory(_))));
        assert_eq!(catalog.directory(), temp_dir.path());
        assert_eq!(names(&catalog), vec!["a.txt"]);
    }

    #[test]
    fn test_rebind_keeps_exclusions() {
        let first = TempDir::new().expect("Failed to create temporary directory");
        let second = TempDir::new().expect("Failed to create temporary directory");
        fs::write(second.path().join("skip.txt"), b"x").expect("Failed to write file");
        fs::write(second.path().join("other.txt"), b"x").expect("Failed to write file");

        let mut catalog = DirectoryCatalog::open_with_exclusions(first.path(), ["skip.txt"])
            .expect("catalog should open");
        catalog.rebind(second.path()).expect("rebind should succeed");
        assert_eq!(names(&catalog), vec!["other.txt"]);
    }

    #[test]
    fn test_snapshot_is_not_refreshed() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"a").expect("Failed to write file");
        let catalog = DirectoryCatalog::open(temp_dir.path()).expect("catalog should open");

        fs::remove_file(&file).expect("Failed to remove file");
        fs::write(temp_dir.path().join("b.txt"), b"b").expect("Failed to write file");
        assert_eq!(names(&catalog), vec!["a.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_open_skips_named_pipes() {
        use std::process::Command;

        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let dir = temp_dir.path();
        fs::write(dir.join("a.txt"), b"a").expect("Failed to write file");
        let status = Command::new("mkfifo")
            .arg(dir.join("pipe"))
            .status()
            .expect("Failed to run mkfifo");
        assert!(status.success());

        let catalog = DirectoryCatalog::open(dir).expect("catalog should open");
        assert_eq!(names(&catalog), vec!["a.txt"]);

        let report = crate::DuplicateResolver::new().run(&catalog);
        assert_eq!(report.visited, 1);
        assert!(dir.join("pipe").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_open_unlistable_directory_is_unreadable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).expect("Failed to create directory");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))
            .expect("Failed to lock directory");

        // Permission bits do not stop a privileged user.
        let listable = fs::read_dir(&locked).is_ok();
        let result = DirectoryCatalog::open(&locked);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))
            .expect("Failed to unlock directory");
        if listable {
            return;
        }

        assert!(matches!(
            result,
            Err(Error::UnreadableDirectory { ref path, .. }) if path == &locked
        ));
    }

    #[test]
    fn test_resolve_path_joins_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let catalog = DirectoryCatalog::open(temp_dir.path()).expect("catalog should open");
        assert_eq!(
            catalog.resolve_path("x.bin"),
            temp_dir.path().join("x.bin")
        );
    }
}
