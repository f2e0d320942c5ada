//! Resolving a requested ref to a commit hash.

use crate::cache::RepoCache;
use crate::event::{Event, EventCode, EventSink};
use crate::git::{RefKind, RemoteRef};
use crate::repo::Repository;
use crate::transport::Transport;

/// Refs shorter than this are never treated as hash prefixes.
pub const MIN_HASH_PREFIX: usize = 8;

/// Pick the hash `selector` refers to. Names are matched exactly before any hash prefix is tried,
/// so a branch is never shadowed by a commit whose hash happens to start with its name.
pub fn select_ref<'a>(refs: &'a [RemoteRef], selector: &str) -> Option<&'a RemoteRef> {
    refs.iter()
        .find(|r| r.name.as_deref() == Some(selector))
        .or_else(|| {
            if selector.len() < MIN_HASH_PREFIX {
                return None;
            }
            refs.iter().find(|r| r.hash.starts_with(selector))
        })
}

/// Resolve `repo.reference` against the remote. When the remote can't be listed, fall back to the
/// hash the ref resolved to last time.
pub fn resolve_hash(
    repo: &Repository,
    cache: &RepoCache,
    transport: &dyn Transport,
    events: &dyn EventSink,
    verbose: bool,
) -> Option<String> {
    let refs = match transport.list_refs(&repo.https_url) {
        Ok(refs) => refs,
        Err(err) => {
            events.emit(
                Event::warn(EventCode::CouldNotFetch, err.to_string())
                    .with("url", &repo.https_url)
                    .with("code", err.code()),
            );
            return from_cache(repo, cache, events);
        }
    };
    if repo.reference == "HEAD" {
        return refs
            .iter()
            .find(|r| r.kind == RefKind::Head)
            .map(|r| r.hash.clone());
    }
    let found = select_ref(&refs, &repo.reference)?;
    if verbose && found.name.as_deref() == Some(repo.reference.as_str()) {
        events.emit(
            Event::info(
                EventCode::FoundMatch,
                format!("found matching commit hash: {}", found.hash),
            )
            .with("ref", &repo.reference),
        );
    }
    Some(found.hash.clone())
}

fn from_cache(repo: &Repository, cache: &RepoCache, events: &dyn EventSink) -> Option<String> {
    let hash = cache.get(&repo.reference)?;
    events.emit(
        Event::info(EventCode::UsingCache, format!("using cached commit hash {hash}"))
            .with("ref", &repo.reference),
    );
    Some(hash.to_string())
}
