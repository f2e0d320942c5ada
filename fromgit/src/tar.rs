//! Unpacking of downloaded repository archives.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

/// What to take from an archive and where to put it.
#[derive(Debug, Clone)]
pub struct Extraction<'a> {
    /// Leading path components dropped from every entry.
    pub strip: usize,
    /// Only entries under this directory (after the first component) are kept.
    pub subdir: Option<&'a str>,
}

impl<'a> Extraction<'a> {
    /// Strip the archive's top-level wrapper directory plus the segments of `subdir`.
    pub fn for_subdir(subdir: Option<&'a str>) -> Self {
        let depth = subdir.map_or(0, |s| s.split('/').filter(|c| !c.is_empty()).count());
        Self {
            strip: 1 + depth,
            subdir,
        }
    }

    /// The destination of `path_in_archive` relative to the output directory, or `None` when the
    /// entry is filtered out.
    fn target(&self, path_in_archive: &Path) -> Option<PathBuf> {
        let mut comps = path_in_archive.components();
        // The wrapper directory is never matched against the subdirectory
        comps.next()?;
        if let Some(subdir) = self.subdir {
            let mut inner = comps.clone();
            for segment in subdir.split('/').filter(|c| !c.is_empty()) {
                match inner.next() {
                    Some(Component::Normal(c)) if c == segment => {}
                    _ => return None,
                }
            }
        }
        let rest = path_in_archive
            .components()
            .skip(self.strip)
            .collect::<Vec<_>>();
        if rest.is_empty() || !rest.iter().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(rest.into_iter().collect())
    }
}

fn decompress_archive(compressed: fs::File) -> Archive<GzDecoder<io::BufReader<fs::File>>> {
    Archive::new(GzDecoder::new(io::BufReader::new(compressed)))
}

/// Whether a link at `relative` (inside the output directory) pointing at `target` resolves to
/// somewhere inside the output directory.
fn link_stays_inside(relative: &Path, target: &Path) -> bool {
    let mut depth = relative.components().count().saturating_sub(1);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => depth -= 1,
            _ => return false,
        }
    }
    true
}

/// The first existing symbolic link among the directories leading to `relative`.
fn linked_parent(out_dir: &Path, relative: &Path) -> Option<PathBuf> {
    let mut path = out_dir.to_path_buf();
    let parents = relative.parent()?.components();
    for component in parents {
        path.push(component);
        if fs::symlink_metadata(&path).is_ok_and(|m| m.file_type().is_symlink()) {
            return Some(path);
        }
    }
    None
}

/// Extract the gzipped tar archive at `tar_file` into `out_dir`. Returns the extracted paths,
/// relative to `out_dir`.
///
/// Nothing is written outside `out_dir`: hard links, links pointing out of it and entries that
/// would be written through an existing link are skipped.
pub fn extract(tar_file: &Path, out_dir: &Path, how: &Extraction<'_>) -> Result<Vec<PathBuf>, io::Error> {
    fs::create_dir_all(out_dir)?;
    let mut extracted = Vec::new();
    let mut archive = decompress_archive(fs::File::open(tar_file)?);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() || entry_type.is_pax_local_extensions() {
            continue;
        }
        let path_in_archive = entry.path()?.into_owned();
        let Some(relative) = how.target(&path_in_archive) else {
            continue;
        };
        if entry_type.is_hard_link() {
            log::warn!("skipping hard link {}", path_in_archive.display());
            continue;
        }
        if entry_type.is_symlink() {
            let target = entry.link_name()?.map(|t| t.into_owned()).unwrap_or_default();
            if !link_stays_inside(&relative, &target) {
                log::warn!(
                    "skipping link {} to {} outside the destination",
                    path_in_archive.display(),
                    target.display()
                );
                continue;
            }
        }
        if let Some(link) = linked_parent(out_dir, &relative) {
            log::warn!(
                "skipping {} which would be written through the link {}",
                path_in_archive.display(),
                link.display()
            );
            continue;
        }
        let dest = out_dir.join(&relative);
        if fs::symlink_metadata(&dest).is_ok_and(|m| m.file_type().is_symlink()) {
            fs::remove_file(&dest)?;
        }
        if entry_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(p) = dest.parent()
                && !p.exists()
            {
                fs::create_dir_all(p)?;
            }
            entry.unpack(&dest)?;
            extracted.push(relative);
        }
    }
    Ok(extracted)
}
