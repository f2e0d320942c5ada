use std::path::PathBuf;

use clap::FromArgMatches;
use clap::{CommandFactory, Parser};

use fromgit::{Mode, Options, Repository, Settings};

use crate::error::AppError;

// Shamelessly borrowed from https://github.com/crate-ci/clap-cargo/blob/0378657ffdf2b67bcd6f1ab56e04a1322b92dd0e/src/style.rs
// thanks to https://stackoverflow.com/a/79614957
use anstyle::AnsiColor::*;
use anstyle::Effects;
use anstyle::Style;

const HEADER: Style = Green.on_default().effects(Effects::BOLD);
const USAGE: Style = Green.on_default().effects(Effects::BOLD);
const LITERAL: Style = Cyan.on_default().effects(Effects::BOLD);
const PLACEHOLDER: Style = Cyan.on_default();
const ERROR: Style = Red.on_default().effects(Effects::BOLD);
const VALID: Style = Cyan.on_default().effects(Effects::BOLD);
const INVALID: Style = Yellow.on_default().effects(Effects::BOLD);

const APP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

#[derive(Debug, Parser)]
#[command(name = "fromgit")]
#[command(version)]
#[command(about = "Copy the files of a git repository without its history")]
#[command(
    after_help = "Examples:\n  fromgit user/repo\n  fromgit gitlab:user/repo/sub/dir#v1.2.0 my-app\n  fromgit git@github.com:user/repo#main --force"
)]
#[command(styles = APP_STYLING)]
#[command(term_width = 80)]
struct Args {
    /// The repository to copy: [host:]user/name[/subdir][#ref]. The host defaults to GitHub and
    /// the ref to HEAD.
    #[arg(value_name = "SRC")]
    src: String,

    /// Where to put the files. Defaults to the current directory.
    #[arg(value_name = "DEST")]
    dest: Option<PathBuf>,

    /// Write into the destination even if it is not empty.
    #[arg(long, short = 'f')]
    force: bool,

    /// Report every step.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Only use archives already in the cache, never contact the remote.
    #[arg(long, short = 'c')]
    cache: bool,

    /// Clone with `git` instead of downloading an archive. Works with private repositories.
    #[arg(long)]
    git: bool,

    /// Cache directory to use. If omitted, check the `FROMGIT_CACHE` environment variable and then
    /// `~/.fromgit`
    #[arg(long, value_name = "PATH")]
    cache_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ValidatedArgs {
    pub src: String,
    pub repo: Repository,
    pub dest: PathBuf,
    pub options: Options,
    pub settings: Settings,
}

impl TryFrom<Args> for ValidatedArgs {
    type Error = AppError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let repo = Repository::parse(&args.src).map_err(AppError::invalid_source)?;
        let mut settings = Settings::load().map_err(AppError::settings)?;
        if let Some(cache_dir) = args.cache_dir {
            settings.cache_dir = cache_dir;
        }
        let dest = match args.dest {
            Some(dest) => dest,
            None => std::env::current_dir()?,
        };
        if dest.is_file() {
            return Err(AppError::arg_validation(format!(
                "destination is a file: {}",
                dest.display()
            )));
        }
        Ok(Self {
            src: args.src,
            repo,
            dest,
            options: Options {
                force: args.force,
                verbose: args.verbose,
                cache: args.cache,
                mode: args.git.then_some(Mode::Git),
            },
            settings,
        })
    }
}

pub fn parse() -> Result<ValidatedArgs, AppError> {
    let matches = Args::command().get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => {
            err.format(&mut Args::command()).exit();
        }
    };
    ValidatedArgs::try_from(args)
}
