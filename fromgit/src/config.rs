use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Error;

const BASE_DIR_NAME: &str = ".fromgit";
const SETTINGS_FILE_NAME: &str = "config.toml";
const DEFAULT_MAX_DEPTH: usize = 8;

/// Runtime settings of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the per-repository cache directories.
    pub cache_dir: PathBuf,
    /// Proxy used to tunnel HTTPS downloads.
    pub proxy: Option<String>,
    /// How deeply `clone` directives may nest.
    pub max_depth: usize,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    cache_dir: Option<PathBuf>,
    proxy: Option<String>,
    max_depth: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: Self::default_cache_dir(),
            proxy: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Settings {
    /// Settings rooted at `cache_dir`, without a proxy.
    pub fn with_cache_dir<P: Into<PathBuf>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// `~/.fromgit`, or a directory under the system temp dir when there is no home.
    pub fn default_cache_dir() -> PathBuf {
        home::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(BASE_DIR_NAME)
    }

    /// Load settings from the process environment.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&std::env::vars().collect())
    }

    /// Load settings from `env`. The TOML file named by `FROMGIT_CONFIG` (or `config.toml` in the
    /// default cache directory) is read first, then `FROMGIT_CACHE` and the `https_proxy`
    /// variables override it.
    pub fn load_from(env: &HashMap<String, String>) -> Result<Self, Error> {
        let file = env
            .get("FROMGIT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::default_cache_dir().join(SETTINGS_FILE_NAME));
        let raw = if file.is_file() {
            RawSettings::read(&file)?
        } else {
            RawSettings::default()
        };
        let defaults = Self::default();
        Ok(Self {
            cache_dir: env
                .get("FROMGIT_CACHE")
                .map(PathBuf::from)
                .or(raw.cache_dir)
                .unwrap_or(defaults.cache_dir),
            proxy: ["https_proxy", "HTTPS_PROXY"]
                .iter()
                .find_map(|key| env.get(*key).filter(|v| !v.is_empty()).cloned())
                .or(raw.proxy),
            max_depth: raw.max_depth.unwrap_or(defaults.max_depth),
        })
    }
}

impl RawSettings {
    fn read(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| Error::BadSettings {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let env = HashMap::from([(
            "FROMGIT_CONFIG".to_owned(),
            dir.path().join("none.toml").display().to_string(),
        )]);
        let settings = Settings::load_from(&env).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            "cache_dir = \"/from/file\"\nproxy = \"http://file:3128\"\nmax_depth = 3\n",
        )
        .unwrap();
        let config = ("FROMGIT_CONFIG".to_owned(), file.display().to_string());

        let settings = Settings::load_from(&HashMap::from([config.clone()])).unwrap();
        assert_eq!(settings.cache_dir, PathBuf::from("/from/file"));
        assert_eq!(settings.proxy.as_deref(), Some("http://file:3128"));
        assert_eq!(settings.max_depth, 3);

        let env = HashMap::from([
            config,
            ("FROMGIT_CACHE".to_owned(), "/from/env".to_owned()),
            ("https_proxy".to_owned(), "http://env:3128".to_owned()),
        ]);
        let settings = Settings::load_from(&env).unwrap();
        assert_eq!(settings.cache_dir, PathBuf::from("/from/env"));
        assert_eq!(settings.proxy.as_deref(), Some("http://env:3128"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "cache = \"/typo\"\n").unwrap();
        let env = HashMap::from([("FROMGIT_CONFIG".to_owned(), file.display().to_string())]);
        assert!(matches!(
            Settings::load_from(&env),
            Err(Error::BadSettings { .. })
        ));
    }
}
