use std::process::ExitCode;
use std::sync::Arc;

use fromgit::FromGit;

use crate::error::AppError;

mod args;
mod error;
mod progress;

fn run() -> Result<(), AppError> {
    let args = args::parse()?;
    log::debug!("{args:#?}");

    let reporter = Arc::new(progress::Reporter::new(&args.src));
    let engine = FromGit::new(args.settings).with_events(reporter.clone());
    let result = engine.clone(&args.src, &args.dest, &args.options);
    reporter.finish();
    result.map_err(|err| AppError::fetch(args.repo.to_string(), err))
}

fn report(error: &AppError) {
    eprintln!("error: {error}");
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            error.into()
        }
    }
}
