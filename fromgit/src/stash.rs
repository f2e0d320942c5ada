//! Setting a destination's files aside while a nested clone overwrites it.

use std::path::{Path, PathBuf};

use crate::Error;
use crate::directive::DIRECTIVES_FILE_NAME;
use crate::helper;

const STASH_DIR_PREFIX: &str = ".tmp-";

/// Files taken out of a destination, held under the repository's cache directory until they are
/// put back with [`Stash::unstash`].
#[derive(Debug)]
pub struct Stash {
    dir: PathBuf,
}

fn entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect()
}

fn first_error(results: Vec<Result<(), Error>>) -> Result<(), Error> {
    results.into_iter().collect()
}

/// Move every entry of `dest` into `{cache_dir}/.tmp-{depth}`. Entries are copied and then
/// deleted, as the two directories may be on different filesystems.
///
/// `depth` is the nesting depth of the clone whose directives are running. A nested clone of the
/// same repository stashes at a greater depth, so it never touches the stash of its parent.
pub fn stash(cache_dir: &Path, dest: &Path, depth: usize) -> Result<Stash, Error> {
    let dir = cache_dir.join(format!("{STASH_DIR_PREFIX}{depth}"));
    let setup = |source| Error::Stash {
        path: dir.clone(),
        source,
    };
    if std::fs::symlink_metadata(&dir).is_ok() {
        log::debug!("discarding a leftover stash at {}", dir.display());
        helper::remove_all(&dir).map_err(setup)?;
    }
    std::fs::create_dir_all(&dir).map_err(setup)?;
    let paths = entries(dest).map_err(|source| Error::Stash {
        path: dest.to_path_buf(),
        source,
    })?;
    log::debug!("stashing {} entries of {} in {}", paths.len(), dest.display(), dir.display());
    first_error(helper::map_all(paths, |path| {
        let Some(name) = path.file_name() else {
            return Ok(());
        };
        helper::copy_all(&path, &dir.join(name))
            .and_then(|_| helper::remove_all(&path))
            .map(|_| ())
            .map_err(|source| Error::Stash { path, source })
    }))?;
    Ok(Stash { dir })
}

impl Stash {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move every stashed entry back into `dest`, except the directive manifest, then discard the
    /// stash directory. Stashed entries overwrite files of the same name.
    pub fn unstash(self, dest: &Path) -> Result<(), Error> {
        let paths = entries(&self.dir)
            .map_err(|source| Error::Unstash {
                path: self.dir.clone(),
                source,
            })?
            .into_iter()
            .filter(|path| path.file_name().is_some_and(|n| n != DIRECTIVES_FILE_NAME))
            .collect::<Vec<_>>();
        log::debug!("restoring {} stashed entries into {}", paths.len(), dest.display());
        first_error(helper::map_all(paths, |path| match path.file_name() {
            Some(name) => {
                helper::copy_all(&path, &dest.join(name)).map_err(|source| Error::Unstash {
                    path: path.clone(),
                    source,
                })
            }
            None => Ok(()),
        }))?;
        std::fs::remove_dir_all(&self.dir).map_err(|source| Error::Unstash {
            path: self.dir,
            source,
        })
    }
}
