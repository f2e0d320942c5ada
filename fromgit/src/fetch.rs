//! The engine: from a specifier to files on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::RepoCache;
use crate::config::Settings;
use crate::directive::{self, Directive};
use crate::event::{Event, EventCode, EventSink, LogSink};
use crate::repo::{Mode, Repository};
use crate::resolve::resolve_hash;
use crate::tar::{self, Extraction};
use crate::transport::{HttpTransport, Transport};
use crate::{Error, git, helper, stash};

const CLONE_SCRATCH_DIR_NAME: &str = ".clone";

/// Options of a single clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Write into a destination that already has files in it.
    pub force: bool,
    /// Report the detailed progress events as well.
    pub verbose: bool,
    /// Never contact the remote, use only what is cached.
    pub cache: bool,
    /// Overrides the mode implied by the host.
    pub mode: Option<Mode>,
}

/// Fetches repositories into directories, caching archives under [`Settings::cache_dir`].
pub struct FromGit {
    settings: Settings,
    transport: Box<dyn Transport>,
    events: Arc<dyn EventSink>,
}

impl FromGit {
    /// An engine that downloads over HTTPS and reports events to the `log` facade.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            transport: Box::new(HttpTransport),
            events: Arc::new(LogSink),
        }
    }

    pub fn with_transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Box::new(transport);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The cache directory of `repo`.
    pub fn cache_dir(&self, repo: &Repository) -> PathBuf {
        self.settings.cache_dir.join(repo.cache_path())
    }

    /// Fetch `src` into `dest`, then run the directives the fetched content carries.
    pub fn clone(&self, src: &str, dest: &Path, opts: &Options) -> Result<(), Error> {
        let repo = Repository::parse(src)?;
        self.clone_repo(&repo, dest, opts, &mut Vec::new())
    }

    fn clone_repo(
        &self,
        repo: &Repository,
        dest: &Path,
        opts: &Options,
        ancestry: &mut Vec<String>,
    ) -> Result<(), Error> {
        match opts.mode.unwrap_or(repo.mode) {
            Mode::Tar => {
                self.materialize(repo, dest, opts)?;
            }
            Mode::Git => self.clone_with_git(repo, dest, opts)?,
        }
        let Some(directives) = directive::take_directives(dest)? else {
            return Ok(());
        };
        ancestry.push(repo.to_string());
        let cache_dir = self.cache_dir(repo);
        let mut stashed = None;
        for d in directives {
            match d {
                Directive::Remove { files } => {
                    directive::remove(dest, &files, &*self.events)?;
                }
                Directive::Clone {
                    src,
                    cache,
                    verbose,
                    // Nested clones always overwrite
                    force: _,
                } => {
                    if stashed.is_none() {
                        stashed = Some(stash::stash(&cache_dir, dest, ancestry.len())?);
                    }
                    let nested_opts = Options {
                        force: true,
                        verbose,
                        cache,
                        mode: None,
                    };
                    self.clone_directive(&src, dest, &nested_opts, ancestry)?;
                }
            }
        }
        if let Some(stashed) = stashed {
            stashed.unstash(dest)?;
        }
        ancestry.pop();
        Ok(())
    }

    fn clone_directive(
        &self,
        src: &str,
        dest: &Path,
        opts: &Options,
        ancestry: &mut Vec<String>,
    ) -> Result<(), Error> {
        let nested = |source: Error| Error::NestedClone {
            src: src.to_string(),
            source: Box::new(source),
        };
        let repo = Repository::parse(src).map_err(nested)?;
        if ancestry.contains(&repo.to_string()) {
            return Err(Error::DirectiveCycle {
                src: src.to_string(),
            });
        }
        if ancestry.len() > self.settings.max_depth {
            return Err(Error::RecursionLimit {
                src: src.to_string(),
                limit: self.settings.max_depth,
            });
        }
        log::debug!("running nested clone of {repo} at depth {}", ancestry.len());
        self.clone_repo(&repo, dest, opts, ancestry).map_err(nested)
    }

    /// Download (unless cached) and extract the archive of `repo` into `dest`. Returns the commit
    /// hash that was extracted.
    pub fn materialize(&self, repo: &Repository, dest: &Path, opts: &Options) -> Result<String, Error> {
        self.check_dest(dest, opts)?;
        let mut cache = RepoCache::load(self.cache_dir(repo));
        let result = self.materialize_with(&mut cache, repo, dest, opts);
        for diagnostic in cache.diagnostics() {
            self.events.emit(
                Event::warn(
                    EventCode::CacheFailure,
                    format!(
                        "cache file {} could not be used: {}",
                        diagnostic.path.display(),
                        diagnostic.message
                    ),
                )
                .with("path", diagnostic.path.display()),
            );
        }
        result
    }

    fn materialize_with(
        &self,
        cache: &mut RepoCache,
        repo: &Repository,
        dest: &Path,
        opts: &Options,
    ) -> Result<String, Error> {
        cache.record_access(&repo.reference);

        let hash = if opts.cache {
            cache.get(&repo.reference).map(str::to_string)
        } else {
            resolve_hash(repo, cache, &*self.transport, &*self.events, opts.verbose)
        }
        .ok_or_else(|| Error::MissingRef {
            reference: repo.reference.clone(),
        })?;

        let file = cache.artefact_path(&hash);
        let url = repo.archive_url(&hash);
        if file.exists() {
            self.verbose(
                opts,
                Event::info(EventCode::FileExists, format!("{} already exists locally", file.display()))
                    .with("path", file.display()),
            );
        } else if opts.cache {
            return Err(Error::MissingArtefact { path: file });
        } else {
            self.download(&url, &file, opts)?;
        }
        cache.commit(&repo.reference, &hash)?;

        self.verbose(
            opts,
            Event::info(
                EventCode::Extracting,
                format!("extracting {} to {}", file.display(), dest.display()),
            )
            .with("path", file.display()),
        );
        let how = Extraction::for_subdir(repo.subdir.as_deref());
        let files = tar::extract(&file, dest, &how).map_err(|source| Error::Extract {
            from: file.clone(),
            dest: dest.to_path_buf(),
            source,
        })?;
        log::debug!("extracted {} files from {}", files.len(), file.display());

        self.success(repo, dest, &hash);
        Ok(hash)
    }

    fn download(&self, url: &str, file: &Path, opts: &Options) -> Result<(), Error> {
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let proxy = self.settings.proxy.as_deref();
        if let Some(proxy) = proxy {
            self.verbose(
                opts,
                Event::info(EventCode::Proxy, format!("using proxy {proxy}")).with("proxy", proxy),
            );
        }
        self.verbose(
            opts,
            Event::info(EventCode::Downloading, format!("downloading {url} to {}", file.display()))
                .with("url", url),
        );
        self.transport.download(url, file, proxy).map_err(|source| {
            if file.exists()
                && let Err(err) = std::fs::remove_file(file)
            {
                log::debug!("could not remove partial download {}: {err}", file.display());
            }
            Error::CouldNotDownload {
                url: url.to_string(),
                source,
            }
        })
    }

    fn clone_with_git(&self, repo: &Repository, dest: &Path, opts: &Options) -> Result<(), Error> {
        self.check_dest(dest, opts)?;
        let scratch = self.cache_dir(repo).join(CLONE_SCRATCH_DIR_NAME);
        if scratch.exists() {
            std::fs::remove_dir_all(&scratch)?;
        }
        if let Some(parent) = scratch.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let hash = git::clone_into(&repo.https_url, &repo.reference, &scratch)?;
        let root = match &repo.subdir {
            Some(subdir) => scratch.join(subdir),
            None => scratch.clone(),
        };
        let copy_tree = || -> std::io::Result<()> {
            std::fs::create_dir_all(dest)?;
            let entries = std::fs::read_dir(&root)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()?;
            helper::map_all(entries, |path| match path.file_name() {
                Some(name) => helper::copy_all(&path, &dest.join(name)),
                None => Ok(()),
            })
            .into_iter()
            .collect()
        };
        copy_tree().map_err(|source| Error::Extract {
            from: root.clone(),
            dest: dest.to_path_buf(),
            source,
        })?;
        std::fs::remove_dir_all(&scratch)?;
        self.success(repo, dest, &hash);
        Ok(())
    }

    fn check_dest(&self, dest: &Path, opts: &Options) -> Result<(), Error> {
        let is_empty = match std::fs::read_dir(dest) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if is_empty {
            self.verbose(
                opts,
                Event::info(EventCode::DestIsEmpty, "destination directory is empty"),
            );
        } else if opts.force {
            self.events.emit(
                Event::info(
                    EventCode::DestNotEmpty,
                    "destination directory is not empty. Using force, continuing",
                )
                .with("dest", dest.display()),
            );
        } else {
            return Err(Error::DestNotEmpty {
                dest: dest.to_path_buf(),
            });
        }
        Ok(())
    }

    fn success(&self, repo: &Repository, dest: &Path, hash: &str) {
        self.events.emit(
            Event::info(
                EventCode::Success,
                format!("cloned {repo} to {}", dest.display()),
            )
            .with("repo", repo)
            .with("ref", &repo.reference)
            .with("hash", hash)
            .with("dest", dest.display()),
        );
    }

    fn verbose(&self, opts: &Options, event: Event) {
        if opts.verbose {
            self.events.emit(event);
        } else {
            log::debug!("{event}");
        }
    }
}
