use std::path::PathBuf;

/// Failures of the HTTPS transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("server responded with {code} {message}")]
    Status { code: u16, message: String },
    #[error("received redirect from {url} with no location header")]
    RedirectWithoutLocation { url: String },
    #[error("gave up after {hops} redirects starting from {url}")]
    TooManyRedirects { url: String, hops: usize },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The main error enum for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not parse repository specifier '{src}'")]
    BadSpecifier { src: String },

    #[error("host '{host}' of '{src}' is not supported, expected github, gitlab, bitbucket or sourcehut")]
    UnsupportedHost { src: String, host: String },

    #[error("could not fetch remote {url}")]
    CouldNotFetchRefs {
        url: String,
        #[source]
        source: Box<Error>,
    },

    #[error("could not parse remote ref '{line}'")]
    BadRef { line: String },

    #[error("could not find commit hash for {reference}")]
    MissingRef { reference: String },

    #[error("could not download {url}")]
    CouldNotDownload {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("cached archive {} is missing", path.display())]
    MissingArtefact { path: PathBuf },

    #[error("destination directory {} is not empty, use force to override", dest.display())]
    DestNotEmpty { dest: PathBuf },

    #[error("could not read directives from {}", path.display())]
    BadDirectives {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("nested clone of '{src}' failed")]
    NestedClone {
        src: String,
        #[source]
        source: Box<Error>,
    },

    #[error("directive clones '{src}' which is already being cloned")]
    DirectiveCycle { src: String },

    #[error("nested clone of '{src}' exceeds the depth limit of {limit}")]
    RecursionLimit { src: String, limit: usize },

    #[error("could not set aside {} while cloning over it", path.display())]
    Stash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not put {} back after cloning", path.display())]
    Unstash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not extract {} into {}", from.display(), dest.display())]
    Extract {
        from: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read settings from {}", path.display())]
    BadSettings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Command '{command}' exited with status {status}\n{stderr}")]
    Subprocess {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// A stable identifier for the kind of failure.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadSpecifier { .. } => "BAD_SRC",
            Error::UnsupportedHost { .. } => "UNSUPPORTED_HOST",
            Error::CouldNotFetchRefs { .. } => "COULD_NOT_FETCH",
            Error::BadRef { .. } => "BAD_REF",
            Error::MissingRef { .. } => "MISSING_REF",
            Error::CouldNotDownload { .. } => "COULD_NOT_DOWNLOAD",
            Error::MissingArtefact { .. } => "MISSING_ARTEFACT",
            Error::DestNotEmpty { .. } => "DEST_NOT_EMPTY",
            Error::BadDirectives { .. } => "BAD_DIRECTIVES",
            Error::NestedClone { .. } => "NESTED_CLONE",
            Error::DirectiveCycle { .. } => "DIRECTIVE_CYCLE",
            Error::RecursionLimit { .. } => "RECURSION_LIMIT",
            Error::Stash { .. } => "STASH",
            Error::Unstash { .. } => "UNSTASH",
            Error::Extract { .. } => "EXTRACT",
            Error::BadSettings { .. } => "BAD_SETTINGS",
            Error::Subprocess { .. } => "SUBPROCESS",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }

    pub(crate) fn subprocess(command: &std::process::Command, output: &std::process::Output) -> Self {
        let command = std::iter::once(command.get_program())
            .chain(command.get_args())
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        Error::Subprocess {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}
