//! Talking to remotes with the `git` executable.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::Error;

static REF_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^refs/(\w+)/(.+)$")
        .unwrap_or_else(|e| panic!("ref pattern should compile: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefKind {
    Head,
    Branch,
    Tag,
    Other(String),
}

/// One row of a remote ref listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub kind: RefKind,
    /// `None` for `HEAD`.
    pub name: Option<String>,
    pub hash: String,
}

impl RemoteRef {
    /// Parse one `<hash>\t<ref>` line of `git ls-remote` output.
    pub fn parse_line(line: &str) -> Result<Self, Error> {
        let bad_ref = || Error::BadRef {
            line: line.to_string(),
        };
        let (hash, reference) = line.split_once('\t').ok_or_else(bad_ref)?;
        let hash = hash.trim().to_string();
        let reference = reference.trim();
        if reference == "HEAD" {
            return Ok(Self {
                kind: RefKind::Head,
                name: None,
                hash,
            });
        }
        let captures = REF_NAME.captures(reference).ok_or_else(bad_ref)?;
        let kind = match &captures[1] {
            "heads" => RefKind::Branch,
            "tags" => RefKind::Tag,
            other => RefKind::Other(other.to_string()),
        };
        Ok(Self {
            kind,
            name: Some(captures[2].to_string()),
            hash,
        })
    }
}

/// Parse the complete output of `git ls-remote`. Blank lines are ignored.
pub fn parse_ls_remote(output: &str) -> Result<Vec<RemoteRef>, Error> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(RemoteRef::parse_line)
        .collect()
}

fn git() -> Command {
    let mut git = Command::new("git");
    git.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null());
    git
}

fn run(mut command: Command) -> Result<String, Error> {
    log::trace!("running {command:?}");
    let output = command.output()?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(Error::subprocess(&command, &output))
    }
}

/// List the refs of the remote at `url`.
pub fn ls_remote(url: &str) -> Result<Vec<RemoteRef>, Error> {
    let mut command = git();
    command.args(["ls-remote", url]);
    let stdout = run(command).map_err(|e| Error::CouldNotFetchRefs {
        url: url.to_string(),
        source: Box::new(e),
    })?;
    parse_ls_remote(&stdout)
}

/// Clone `url` into `dest`, check out `reference` and discard the `.git` directory. Returns the
/// hash of the commit that was checked out.
pub fn clone_into(url: &str, reference: &str, dest: &Path) -> Result<String, Error> {
    let mut clone = git();
    clone.args(["clone", "--quiet", "--"]).arg(url).arg(dest);
    run(clone)?;
    let git_dir = dest.join(".git");
    let in_clone = || {
        let mut command = git();
        command
            .arg(format!("--git-dir={}", git_dir.display()))
            .arg(format!("--work-tree={}", dest.display()));
        command
    };
    if reference != "HEAD" {
        let mut checkout = in_clone();
        checkout.args(["checkout", "--quiet", reference, "--"]);
        run(checkout)?;
    }
    let mut rev_parse = in_clone();
    rev_parse.args(["rev-parse", "HEAD"]);
    let hash = run(rev_parse)?.trim().to_string();
    if git_dir.exists() {
        std::fs::remove_dir_all(git_dir)?;
    }
    Ok(hash)
}
