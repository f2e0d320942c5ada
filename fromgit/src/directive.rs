//! Post-fetch directives carried by the fetched content itself.
//!
//! A repository may contain a `fromgit.json` manifest at the root of what was extracted. It is a
//! JSON array of actions run in order against the destination:
//!
//! ```json
//! [
//!   { "action": "clone", "src": "user/base-template" },
//!   { "action": "remove", "files": ["LICENSE", "docs"] }
//! ]
//! ```

use std::path::{Component, Path, PathBuf};

use crate::event::{Event, EventCode, EventSink};
use crate::helper;
use crate::Error;

/// Name of the directive manifest in fetched content.
pub const DIRECTIVES_FILE_NAME: &str = "fromgit.json";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Directive {
    /// Clone another repository over the destination.
    Clone {
        src: String,
        /// Use only the local cache.
        #[serde(default)]
        cache: bool,
        #[serde(default)]
        force: bool,
        #[serde(default)]
        verbose: bool,
    },
    /// Delete files or directories from the destination.
    Remove {
        #[serde(deserialize_with = "one_or_many")]
        files: Vec<String>,
    },
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(
        match <OneOrMany as serde::Deserialize>::deserialize(deserializer)? {
            OneOrMany::One(file) => vec![file],
            OneOrMany::Many(files) => files,
        },
    )
}

/// Parse a directive manifest.
pub fn parse_directives(json: &str) -> Result<Vec<Directive>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read and delete the manifest in `dest`. Returns `None` when there is no manifest.
pub fn take_directives(dest: &Path) -> Result<Option<Vec<Directive>>, Error> {
    let path = dest.join(DIRECTIVES_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    let directives = parse_directives(&text).map_err(|source| Error::BadDirectives {
        path: path.clone(),
        source,
    })?;
    std::fs::remove_file(&path)?;
    Ok(Some(directives))
}

enum Removal {
    Removed(String),
    Missing(String),
}

fn is_plain_relative(file: &str) -> bool {
    let path = Path::new(file);
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Delete `files` from `dest`. Files that don't exist are reported as warnings. Returns what was
/// removed, with a trailing `/` on directories.
///
/// Only plain relative paths are accepted. Anything that could name a path outside `dest` (an
/// absolute path, `..`, `.` or an empty string) is reported and left alone.
pub fn remove(dest: &Path, files: &[String], events: &dyn EventSink) -> Result<Vec<String>, Error> {
    let (targets, unsafe_paths): (Vec<(String, PathBuf)>, Vec<_>) = files
        .iter()
        .map(|file| (file.clone(), dest.join(file)))
        .partition(|(file, _)| is_plain_relative(file));
    for (file, _) in unsafe_paths {
        events.emit(
            Event::warn(
                EventCode::UnsafePath,
                format!("action wants to remove '{file}' which is not inside the destination"),
            )
            .with("file", &file),
        );
    }
    let outcomes = helper::map_all(targets, |(file, path)| {
        if std::fs::symlink_metadata(&path).is_err() {
            return Ok(Removal::Missing(file));
        }
        helper::remove_all(&path).map(|is_dir| {
            Removal::Removed(if is_dir { format!("{file}/") } else { file })
        })
    });
    let mut removed = Vec::new();
    for outcome in outcomes {
        match outcome? {
            Removal::Removed(file) => removed.push(file),
            Removal::Missing(file) => events.emit(
                Event::warn(
                    EventCode::FileDoesNotExist,
                    format!("action wants to remove '{file}' but it does not exist"),
                )
                .with("file", &file),
            ),
        }
    }
    if !removed.is_empty() {
        events.emit(
            Event::info(EventCode::Removed, format!("removed: {}", removed.join(", ")))
                .with("files", removed.join(",")),
        );
    }
    Ok(removed)
}
