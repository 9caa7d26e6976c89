use std::{
    path::{Component, Path, PathBuf},
    time::SystemTime,
};
use tokio::fs;

use crate::error::{ExploreError, Result};
use crate::listing::EntryKind;

// -------------------------------------------
// Containment
// -------------------------------------------

/// Splits a client path into normal components, resolving `.` and `..`
/// lexically. Climbing above the root is a traversal attempt.
fn components(requested: &str) -> Result<Vec<String>> {
    if requested.contains('\0') {
        return Err(ExploreError::InvalidPath(requested.escape_debug().to_string()));
    }

    let mut parts: Vec<String> = Vec::new();
    for comp in Path::new(requested).components() {
        match comp {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(ExploreError::InvalidPath(requested.to_string()));
                }
            }
            Component::Normal(p) => parts.push(p.to_string_lossy().into_owned()),
        }
    }

    Ok(parts)
}

/// Joins `requested` onto `root`. `""` and `"/"` resolve to `root` itself.
pub fn resolve(root: &Path, requested: &str) -> Result<PathBuf> {
    let mut out = root.to_path_buf();
    out.extend(components(requested)?);

    if !out.starts_with(root) {
        return Err(ExploreError::InvalidPath(requested.to_string()));
    }
    Ok(out)
}

/// Canonical client form of `requested`: forward slashes, leading `/`.
pub fn client_form(requested: &str) -> Result<String> {
    Ok(format!("/{}", components(requested)?.join("/")))
}

/// Client path of child `name` inside the client directory `dir`.
pub fn client_path(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

// -------------------------------------------
// Symlink-aware stat
// -------------------------------------------

/// Metadata of the entity a path ultimately refers to.
#[derive(Debug, Clone)]
pub struct RealStat {
    pub kind: EntryKind,
    /// False for fifos, sockets and devices, which are listed as files.
    pub is_file: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub real_path: PathBuf,
}

impl RealStat {
    fn new(meta: &std::fs::Metadata, real_path: PathBuf) -> Self {
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        RealStat {
            kind,
            is_file: meta.is_file(),
            size: meta.len(),
            modified: meta.modified().ok(),
            real_path,
        }
    }
}

/// Stats `path`, following it to its target if it is a symbolic link.
pub async fn resolve_symlink(path: &Path) -> Result<RealStat> {
    let shown = path.display().to_string();
    let meta = fs::symlink_metadata(path)
        .await
        .map_err(|e| ExploreError::from_io(shown.as_str(), e))?;

    if !meta.file_type().is_symlink() {
        return Ok(RealStat::new(&meta, path.to_path_buf()));
    }

    let real = fs::canonicalize(path)
        .await
        .map_err(|e| ExploreError::from_io(shown.as_str(), e))?;
    let target = fs::metadata(&real)
        .await
        .map_err(|e| ExploreError::from_io(shown.as_str(), e))?;

    Ok(RealStat::new(&target, real))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_slash_resolve_to_root() {
        let root = Path::new("/srv/files");
        assert_eq!(resolve(root, "").unwrap(), root);
        assert_eq!(resolve(root, "/").unwrap(), root);
        assert_eq!(resolve(root, "./").unwrap(), root);
    }

    #[test]
    fn redundant_segments_are_normalized() {
        let root = Path::new("/srv/files");
        assert_eq!(
            resolve(root, "/a//b/./c/../d").unwrap(),
            Path::new("/srv/files/a/b/d")
        );
        assert_eq!(client_form("a//b/./c/../d").unwrap(), "/a/b/d");
        assert_eq!(client_form("").unwrap(), "/");
    }

    #[test]
    fn traversal_is_rejected() {
        let root = Path::new("/srv/files");
        for bad in ["..", "/..", "../etc/passwd", "a/../../b", "a/b/../../../.."] {
            assert!(
                matches!(resolve(root, bad), Err(ExploreError::InvalidPath(_))),
                "{bad} escaped the root"
            );
        }
    }

    #[test]
    fn nul_bytes_are_rejected() {
        let root = Path::new("/srv/files");
        assert!(matches!(
            resolve(root, "a\0b"),
            Err(ExploreError::InvalidPath(_))
        ));
    }

    #[test]
    fn child_paths_use_forward_slashes() {
        assert_eq!(client_path("/", "a"), "/a");
        assert_eq!(client_path("/a", "b"), "/a/b");
        assert_eq!(client_path("/a/", "b"), "/a/b");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_reports_target_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real");
        std::fs::create_dir(&target).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let stat = resolve_symlink(&link).await.unwrap();
        assert_eq!(stat.kind, EntryKind::Directory);
        assert_eq!(stat.real_path, std::fs::canonicalize(&target).unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn broken_symlink_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink(dir.path().join("missing"), &link).unwrap();

        assert!(matches!(
            resolve_symlink(&link).await,
            Err(ExploreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn plain_file_reports_own_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"hello").unwrap();

        let stat = resolve_symlink(&file).await.unwrap();
        assert_eq!(stat.kind, EntryKind::File);
        assert!(stat.is_file);
        assert_eq!(stat.size, 5);
        assert_eq!(stat.real_path, file);
    }
}
