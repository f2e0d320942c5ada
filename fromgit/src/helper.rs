//! Independent filesystem operations on disjoint paths, run in parallel when `rayon` is enabled.

use std::path::Path;

#[cfg_attr(feature = "rayon", allow(dead_code))]
pub(crate) mod serial {
    pub fn map_all<T, R, F>(items: Vec<T>, op: F) -> Vec<R>
    where
        F: Fn(T) -> R,
    {
        items.into_iter().map(op).collect()
    }
}

#[cfg(feature = "rayon")]
pub(crate) mod parallel {
    use rayon::prelude::*;

    pub fn map_all_par<T, R, F>(items: Vec<T>, op: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        items.into_par_iter().map(op).collect::<Vec<_>>()
    }
}

/// Apply `op` to every item, keeping the results in input order.
pub(crate) fn map_all<T, R, F>(items: Vec<T>, op: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        parallel::map_all_par(items, op)
    }
    #[cfg(not(feature = "rayon"))]
    {
        serial::map_all(items, op)
    }
}

#[cfg(unix)]
fn copy_link(target: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(windows)]
fn copy_link(target: &Path, dst: &Path) -> std::io::Result<()> {
    let resolved = dst.parent().map_or_else(|| target.to_path_buf(), |p| p.join(target));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, dst)
    } else {
        std::os::windows::fs::symlink_file(target, dst)
    }
}

/// Copy one non-directory entry. Links are recreated rather than followed, and an existing link
/// at `dst` is replaced rather than written through.
fn copy_entry(src: &Path, file_type: std::fs::FileType, dst: &Path) -> std::io::Result<()> {
    if std::fs::symlink_metadata(dst).is_ok_and(|m| m.file_type().is_symlink()) {
        std::fs::remove_file(dst)?;
    }
    if file_type.is_symlink() {
        if std::fs::symlink_metadata(dst).is_ok() {
            remove_all(dst)?;
        }
        return copy_link(&std::fs::read_link(src)?, dst);
    }
    std::fs::copy(src, dst).map(|_| ())
}

/// Copy `src` to `dst`, recursing into directories. Symbolic links are copied as links.
pub(crate) fn copy_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    let file_type = std::fs::symlink_metadata(src)?.file_type();
    if !file_type.is_dir() {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        return copy_entry(src, file_type, dst);
    }
    for entry in walkdir::WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            copy_entry(entry.path(), entry.file_type(), &target)?;
        }
    }
    Ok(())
}

/// Remove `path`, recursively when it is a directory. Returns whether it was a directory.
pub(crate) fn remove_all(path: &Path) -> std::io::Result<bool> {
    if std::fs::symlink_metadata(path)?.is_dir() {
        std::fs::remove_dir_all(path)?;
        Ok(true)
    } else {
        std::fs::remove_file(path)?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_all_keeps_order() {
        let out = map_all((0..64).collect(), |n: u32| n * 2);
        assert_eq!(out, (0..64).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn copy_all_copies_trees() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("a/b/c.txt"), "c").unwrap();
        std::fs::write(src.join("top.txt"), "t").unwrap();
        let dst = dir.path().join("dst");
        copy_all(&src, &dst).unwrap();
        assert_eq!(std::fs::read_to_string(dst.join("a/b/c.txt")).unwrap(), "c");
        assert_eq!(std::fs::read_to_string(dst.join("top.txt")).unwrap(), "t");
    }

    #[cfg(unix)]
    #[test]
    fn copy_all_keeps_links_as_links() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("real")).unwrap();
        std::fs::write(src.join("real/file.txt"), "f").unwrap();
        std::os::unix::fs::symlink("real", src.join("to-dir")).unwrap();
        std::os::unix::fs::symlink("../not-extracted", src.join("dangling")).unwrap();

        let dst = dir.path().join("dst");
        copy_all(&src, &dst).unwrap();
        assert_eq!(std::fs::read_link(dst.join("to-dir")).unwrap(), Path::new("real"));
        assert_eq!(
            std::fs::read_link(dst.join("dangling")).unwrap(),
            Path::new("../not-extracted")
        );
        assert!(
            !std::fs::symlink_metadata(dst.join("to-dir"))
                .unwrap()
                .is_dir()
        );

        // A single dangling link is copied on its own too
        copy_all(&src.join("dangling"), &dir.path().join("alone")).unwrap();
        assert!(std::fs::symlink_metadata(dir.path().join("alone")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn copy_all_does_not_write_through_links() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside.txt");
        std::fs::write(&outside, "untouched").unwrap();
        let dst = dir.path().join("dst.txt");
        std::os::unix::fs::symlink(&outside, &dst).unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, "new").unwrap();

        copy_all(&src, &dst).unwrap();
        assert_eq!(std::fs::read_to_string(&outside).unwrap(), "untouched");
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "new");
    }

    #[test]
    fn remove_all_reports_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        std::fs::write(dir.path().join("f"), "").unwrap();
        assert!(remove_all(&dir.path().join("d")).unwrap());
        assert!(!remove_all(&dir.path().join("f")).unwrap());
        assert!(!dir.path().join("d").exists());
    }
}
