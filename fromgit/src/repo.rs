//! Parsing of repository specifiers such as `user/name/subdir#v1.2.3`.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::Error;

static SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:https://)?([^:/]+\.[^:/]+)/|git@([^:/]+)[:/]|([^/]+):)?([^/\s]+)/([^/\s#]+)((?:/[^/\s#]+)+)?/?(?:#(.+))?$",
    )
    .unwrap_or_else(|e| panic!("specifier pattern should compile: {e}"))
});

/// The hosts we know how to download archives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    Github,
    Gitlab,
    Bitbucket,
    Sourcehut,
}

impl Site {
    fn from_host(host: &str) -> Option<Self> {
        let host = host
            .strip_suffix(".com")
            .or_else(|| host.strip_suffix(".org"))
            .unwrap_or(host);
        match host {
            "github" => Some(Self::Github),
            "gitlab" => Some(Self::Gitlab),
            "bitbucket" => Some(Self::Bitbucket),
            "git.sr.ht" | "sourcehut" => Some(Self::Sourcehut),
            _ => None,
        }
    }

    /// The name used for this site's directory in the cache.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::Sourcehut => "git.sr.ht",
        }
    }

    pub fn domain(&self) -> &'static str {
        match self {
            Self::Github => "github.com",
            Self::Gitlab => "gitlab.com",
            Self::Bitbucket => "bitbucket.org",
            Self::Sourcehut => "git.sr.ht",
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the content of a repository is materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Download a commit archive, cached locally.
    #[default]
    Tar,
    /// Clone with `git` and discard the history.
    Git,
}

/// A parsed repository specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub site: Site,
    pub user: String,
    pub name: String,
    pub subdir: Option<String>,
    pub https_url: String,
    pub ssh_url: String,
    pub reference: String,
    pub mode: Mode,
}

impl Repository {
    /// Parse a specifier. The host defaults to GitHub and the ref to `HEAD`.
    pub fn parse(src: &str) -> Result<Self, Error> {
        let captures = SPECIFIER.captures(src).ok_or_else(|| Error::BadSpecifier {
            src: src.to_string(),
        })?;
        let host = captures
            .get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3))
            .map_or("github", |m| m.as_str());
        let site = Site::from_host(host).ok_or_else(|| Error::UnsupportedHost {
            src: src.to_string(),
            host: host.to_string(),
        })?;
        let user = captures[4].to_string();
        let name = captures[5]
            .strip_suffix(".git")
            .unwrap_or(&captures[5])
            .to_string();
        if name.is_empty() {
            return Err(Error::BadSpecifier {
                src: src.to_string(),
            });
        }
        let subdir = captures
            .get(6)
            .map(|m| m.as_str().trim_start_matches('/').to_string());
        let reference = captures
            .get(7)
            .map_or_else(|| "HEAD".to_string(), |m| m.as_str().to_string());
        // Refs are handed to git on the command line
        if reference.starts_with('-') {
            return Err(Error::BadSpecifier {
                src: src.to_string(),
            });
        }
        let domain = site.domain();
        Ok(Self {
            https_url: format!("https://{domain}/{user}/{name}"),
            ssh_url: format!("git@{domain}:{user}/{name}"),
            mode: Mode::default(),
            site,
            user,
            name,
            subdir,
            reference,
        })
    }

    /// Number of path segments in the requested subdirectory.
    pub fn subdir_depth(&self) -> usize {
        self.subdir
            .as_deref()
            .map_or(0, |s| s.split('/').filter(|c| !c.is_empty()).count())
    }

    /// The URL of the archive of `hash` on this repository's host.
    pub fn archive_url(&self, hash: &str) -> String {
        match self.site {
            Site::Gitlab => format!("{}/repository/archive.tar.gz?ref={hash}", self.https_url),
            Site::Bitbucket => format!("{}/get/{hash}.tar.gz", self.https_url),
            Site::Github | Site::Sourcehut => format!("{}/archive/{hash}.tar.gz", self.https_url),
        }
    }

    /// Path of this repository's cache directory relative to the cache base.
    pub fn cache_path(&self) -> std::path::PathBuf {
        [self.site.name(), self.user.as_str(), self.name.as_str()]
            .iter()
            .collect()
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.site, self.user, self.name)?;
        if let Some(subdir) = &self.subdir {
            write!(f, "/{subdir}")?;
        }
        write!(f, "#{}", self.reference)
    }
}

impl std::str::FromStr for Repository {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
