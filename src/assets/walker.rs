//! Iterative walk over every mount's static folder

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::{AssetRecord, MountPoint, MountSet};

/// Errors raised while enumerating local assets
#[derive(Error, Debug)]
pub enum EnumerateError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("static folder {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("file name is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

impl EnumerateError {
    fn walk(root: &Path, err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        EnumerateError::Io {
            path,
            source: io::Error::from(err),
        }
    }
}

/// Start a fresh walk over all mounts.
///
/// Each call returns a new iterator, so a walk can be repeated at will.
pub fn walk(mounts: &MountSet) -> AssetWalker<'_> {
    AssetWalker {
        mounts: mounts.iter(),
        current: None,
        failed: false,
    }
}

/// Walk a single mount
pub fn walk_mount(mount: &MountPoint) -> AssetWalker<'_> {
    AssetWalker {
        mounts: std::slice::from_ref(mount).iter(),
        current: None,
        failed: false,
    }
}

/// Walk every mount and collect the records, stopping at the first error
pub fn collect(mounts: &MountSet) -> Result<Vec<AssetRecord>, EnumerateError> {
    walk(mounts).collect()
}

/// Lazy iterator over the asset records of a [`MountSet`].
///
/// Mounts without a local root, or whose root does not exist, yield nothing.
/// After the first error the iterator is exhausted.
pub struct AssetWalker<'a> {
    mounts: std::slice::Iter<'a, MountPoint>,
    current: Option<MountWalk<'a>>,
    failed: bool,
}

impl<'a> AssetWalker<'a> {
    fn fail(&mut self, err: EnumerateError) -> Option<Result<AssetRecord, EnumerateError>> {
        self.failed = true;
        self.current = None;
        Some(Err(err))
    }
}

impl<'a> Iterator for AssetWalker<'a> {
    type Item = Result<AssetRecord, EnumerateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(walk) = self.current.as_mut() {
                match walk.next_record() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(e)) => return self.fail(e),
                    None => self.current = None,
                }
            }

            let mount = self.mounts.next()?;
            match mount.local_root.as_deref() {
                Some(root) if root.is_dir() => {
                    debug!(endpoint = %mount.endpoint, root = %root.display(), "Walking static folder");
                    self.current = Some(MountWalk::new(mount, root));
                }
                Some(root) if root.exists() => {
                    return self.fail(EnumerateError::NotADirectory(root.to_path_buf()));
                }
                Some(root) => {
                    debug!(endpoint = %mount.endpoint, root = %root.display(), "Static folder missing, skipping");
                }
                None => {
                    debug!(endpoint = %mount.endpoint, "No static folder, skipping");
                }
            }
        }
    }
}

/// Walk state for a single mount
struct MountWalk<'a> {
    mount: &'a MountPoint,
    root: &'a Path,
    entries: walkdir::IntoIter,
}

impl<'a> MountWalk<'a> {
    fn new(mount: &'a MountPoint, root: &'a Path) -> Self {
        let entries = WalkDir::new(root)
            .follow_links(true)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        Self { mount, root, entries }
    }

    fn next_record(&mut self) -> Option<Result<AssetRecord, EnumerateError>> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                // A link back to one of its own ancestors; that directory is already being walked
                Err(e) if e.loop_ancestor().is_some() => {
                    warn!(path = ?e.path(), "Symlink loop, not walking it again");
                    continue;
                }
                Err(e) => return Some(Err(EnumerateError::walk(self.root, e))),
            };

            if entry.file_type().is_dir() {
                continue;
            }
            return Some(self.record(entry.into_path()));
        }
    }

    fn record(&self, path: PathBuf) -> Result<AssetRecord, EnumerateError> {
        let relative = path.strip_prefix(self.root).unwrap_or(&path);
        match self.mount.remote_key(relative) {
            Some(remote_key) => Ok(AssetRecord {
                remote_key,
                local_path: path,
            }),
            None => Err(EnumerateError::NonUtf8Path(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, relative.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_walk_yields_every_file_once() {
        let dir = TempDir::new().unwrap();
        let css = touch(dir.path(), "css/main.css");
        let logo = touch(dir.path(), "img/logo.png");

        let mounts = MountSet::new(vec![MountPoint::app(
            Some(dir.path().to_path_buf()),
            "/static",
        )]);

        let records: BTreeSet<AssetRecord> = collect(&mounts).unwrap().into_iter().collect();
        let expected: BTreeSet<AssetRecord> = [
            AssetRecord {
                remote_key: "/static/css/main.css".to_string(),
                local_path: css,
            },
            AssetRecord {
                remote_key: "/static/img/logo.png".to_string(),
                local_path: logo,
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(records, expected);
    }

    #[test]
    fn test_walk_deep_tree() {
        let dir = TempDir::new().unwrap();
        let depth: Vec<String> = (0..64).map(|i| format!("d{}", i)).collect();
        let relative = format!("{}/leaf.js", depth.join("/"));
        touch(dir.path(), &relative);
        touch(dir.path(), "top.js");

        let mounts = MountSet::new(vec![MountPoint::app(
            Some(dir.path().to_path_buf()),
            "/static",
        )]);
        let records = collect(&mounts).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .any(|r| r.remote_key == format!("/static/{}", relative)));
    }

    #[test]
    fn test_absent_roots_contribute_nothing() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "app.js");

        let mounts = MountSet::new(vec![
            MountPoint::plugin("empty", None, Some("/empty"), "/static"),
            MountPoint::plugin("gone", Some(dir.path().join("missing")), None, "/gone"),
            MountPoint::app(Some(dir.path().to_path_buf()), "/static"),
        ]);

        let records = collect(&mounts).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].remote_key, "/static/app.js");
    }

    #[test]
    fn test_plugin_mount_keys_use_plugin_prefix() {
        let app = TempDir::new().unwrap();
        let admin = TempDir::new().unwrap();
        touch(app.path(), "site.css");
        touch(admin.path(), "admin.css");

        let mounts = MountSet::new(vec![
            MountPoint::app(Some(app.path().to_path_buf()), "/static"),
            MountPoint::plugin("admin", Some(admin.path().to_path_buf()), Some("/admin"), "/static"),
        ]);

        let keys: BTreeSet<String> = collect(&mounts)
            .unwrap()
            .into_iter()
            .map(|r| r.remote_key)
            .collect();
        assert!(keys.contains("/static/site.css"));
        assert!(keys.contains("/admin/static/admin.css"));
    }

    #[test]
    fn test_walk_is_restartable() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.css");
        touch(dir.path(), "b/c.css");

        let mounts = MountSet::new(vec![MountPoint::app(
            Some(dir.path().to_path_buf()),
            "/static",
        )]);

        let first = collect(&mounts).unwrap();
        let second = collect(&mounts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_as_root_fails_and_fuses() {
        let dir = TempDir::new().unwrap();
        // A file where a directory is expected cannot be listed
        let file_root = touch(dir.path(), "not-a-dir");

        let mounts = MountSet::new(vec![
            MountPoint::app(Some(file_root), "/static"),
            MountPoint::plugin("other", Some(dir.path().to_path_buf()), None, "/other"),
        ]);

        let mut walker = walk(&mounts);
        assert!(matches!(walker.next(), Some(Err(EnumerateError::NotADirectory(_)))));
        assert!(walker.next().is_none());
        assert!(collect(&mounts).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_walked_once() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/file.txt");
        std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("a/loop")).unwrap();

        let mounts = MountSet::new(vec![MountPoint::app(
            Some(dir.path().to_path_buf()),
            "/static",
        )]);
        let records = collect(&mounts).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].remote_key, "/static/a/file.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_alias_does_not_hide_real_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "v2/app.js");
        std::os::unix::fs::symlink(dir.path().join("v2"), dir.path().join("current")).unwrap();

        let mounts = MountSet::new(vec![MountPoint::app(
            Some(dir.path().to_path_buf()),
            "/static",
        )]);
        let keys: Vec<String> = collect(&mounts)
            .unwrap()
            .into_iter()
            .map(|r| r.remote_key)
            .collect();

        assert_eq!(keys, vec!["/static/current/app.js", "/static/v2/app.js"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_file_name_is_an_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ok.css");
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.css")), "x").unwrap();

        let mounts = MountSet::new(vec![MountPoint::app(
            Some(dir.path().to_path_buf()),
            "/static",
        )]);

        assert!(matches!(collect(&mounts), Err(EnumerateError::NonUtf8Path(_))));
    }
}
