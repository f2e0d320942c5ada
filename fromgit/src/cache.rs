// A BTree keeps map.json stable between writes
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::Error;

const MAP_FILE_NAME: &str = "map.json";
const ACCESS_FILE_NAME: &str = "access.json";

/// A cache operation that failed without failing the fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub message: String,
}

/// The cache directory of a single repository.
///
/// `map.json` maps each requested ref to the commit hash it last resolved to, and each hash in
/// the map has a `<hash>.tar.gz` archive next to it. `access.json` records when each ref was
/// last requested and is never read back.
#[derive(Debug, Default)]
pub struct RepoCache {
    dir: PathBuf,
    map: BTreeMap<String, String>,
    access: BTreeMap<String, String>,
    diagnostics: Vec<Diagnostic>,
}

fn read_json(path: &Path) -> Option<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::debug!("ignoring unreadable {}: {e}", path.display());
            None
        }
    }
}

impl RepoCache {
    /// Load the cache stored in `dir`. Missing or unreadable files give empty maps.
    pub fn load<P: Into<PathBuf>>(dir: P) -> Self {
        let dir = dir.into();
        Self {
            map: read_json(&dir.join(MAP_FILE_NAME)).unwrap_or_default(),
            access: read_json(&dir.join(ACCESS_FILE_NAME)).unwrap_or_default(),
            dir,
            diagnostics: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The hash `reference` last resolved to.
    pub fn get(&self, reference: &str) -> Option<&str> {
        self.map.get(reference).map(String::as_str)
    }

    /// Where the archive of `hash` is stored.
    pub fn artefact_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.tar.gz"))
    }

    /// Failures that were tolerated since this cache was loaded.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn tolerate<E: std::fmt::Display>(&mut self, path: PathBuf, err: E) {
        log::debug!("ignoring cache failure at {}: {err}", path.display());
        self.diagnostics.push(Diagnostic {
            path,
            message: err.to_string(),
        });
    }

    fn write(&self, file_name: &str, map: &BTreeMap<String, String>) -> Result<(), Error> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(map)?;
        Ok(std::fs::write(self.dir.join(file_name), json)?)
    }

    /// Note that `reference` was requested now. Failing to save is tolerated.
    pub fn record_access(&mut self, reference: &str) {
        self.access
            .insert(reference.to_string(), chrono::Utc::now().to_rfc3339());
        if let Err(err) = self.write(ACCESS_FILE_NAME, &self.access) {
            self.tolerate(self.dir.join(ACCESS_FILE_NAME), err);
        }
    }

    /// Bind `reference` to `hash` and persist the map. The archive of the hash it replaces is
    /// deleted once no ref points at it any more.
    pub fn commit(&mut self, reference: &str, hash: &str) -> Result<(), Error> {
        let old = match self.map.get(reference) {
            Some(old) if old == hash => return Ok(()),
            old => old.cloned(),
        };
        self.map.insert(reference.to_string(), hash.to_string());
        if let Some(old) = old
            && !self.map.values().any(|h| h == &old)
        {
            let stale = self.artefact_path(&old);
            log::debug!("removing unreferenced archive {}", stale.display());
            if let Err(err) = std::fs::remove_file(&stale) {
                self.tolerate(stale, err);
            }
        }
        self.write(MAP_FILE_NAME, &self.map)
    }
}
