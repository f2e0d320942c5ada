//! Copy the files of a git repository without its history.
//!
//! A repository is named by a short specifier such as `user/name`, `gitlab:user/name/sub/dir#v1.2`
//! or `git@github.com:user/name`. The ref after `#` is resolved against the remote, the commit
//! archive is downloaded into a per-repository cache, and the archive is extracted into the
//! destination with its wrapping directory removed.
//!
//! # Usage
//!
//! ```rust
//! use fromgit::Repository;
//!
//! let repo = Repository::parse("gitlab:user/name/sub/dir#v1.2")?;
//! assert_eq!(repo.site.name(), "gitlab");
//! assert_eq!(repo.subdir.as_deref(), Some("sub/dir"));
//! assert_eq!(repo.reference, "v1.2");
//! # Ok::<(), fromgit::Error>(())
//! ```
//!
//! Fetch into a directory:
//!
//! ```no_run
//! use fromgit::{FromGit, Options, Settings};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), fromgit::Error> {
//! let engine = FromGit::new(Settings::load()?);
//! engine.clone("user/name#main", Path::new("my-project"), &Options::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Caching
//!
//! Every repository has a directory under [`Settings::cache_dir`] holding `<hash>.tar.gz`
//! archives, `map.json` (ref to hash) and `access.json` (ref to last access time). An archive is
//! deleted once no ref maps to its hash any more.
//!
//! # Directives
//!
//! Fetched content may carry a `fromgit.json` manifest of actions run against the destination
//! after extraction, see [`directive`].
//!
//! # Optional Features
//!
//! - `rayon` (default): run independent filesystem operations in parallel.

pub mod cache;
pub mod config;
pub mod directive;
mod error;
pub mod event;
mod fetch;
pub mod git;
mod helper;
pub mod repo;
pub mod resolve;
pub mod stash;
pub mod tar;
pub mod transport;

#[doc(inline)]
pub use crate::config::Settings;
#[doc(inline)]
pub use crate::error::{Error, TransportError};
#[doc(inline)]
pub use crate::event::{Event, EventCode, EventSink, Level};
#[doc(inline)]
pub use crate::fetch::{FromGit, Options};
#[doc(inline)]
pub use crate::repo::{Mode, Repository, Site};
#[doc(inline)]
pub use crate::transport::{HttpTransport, Transport};
