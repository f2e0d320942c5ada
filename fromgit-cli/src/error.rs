use std::process::ExitCode;

/// Categories of application errors that can be matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    /// Argument validation errors, including unparseable specifiers
    ArgValidation,
    /// General IO errors
    IO,
    /// Settings file errors
    Settings,
    /// Fetching errors
    Fetch,
}

/// Internal error type that contains all application error variants.
#[derive(Debug, thiserror::Error)]
pub enum AppErrorInner {
    #[error("Argument error: {0}")]
    ArgValidation(String),
    #[error(transparent)]
    InvalidSource(fromgit::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Failed to load settings")]
    Settings(#[source] fromgit::Error),
    #[error("Failed to fetch '{src}'")]
    Fetch {
        src: String,
        #[source]
        err: fromgit::Error,
    },
}

/// The main application-level error type. We keep the concrete error types (rather than using
/// `anyhow`) because the exit code depends on what went wrong, while still adding context such as
/// which specifier was being fetched.
///
/// This type uses the newtype pattern to wrap a boxed inner error, reducing stack size.
#[derive(Debug)]
pub struct AppError(Box<AppErrorInner>, AppErrorKind);

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl AppError {
    /// Create a new AppError with the given inner error and kind
    pub fn new(inner: AppErrorInner, kind: AppErrorKind) -> Self {
        Self(Box::new(inner), kind)
    }

    /// Get the error kind for pattern matching
    pub fn error_kind(&self) -> &AppErrorKind {
        &self.1
    }

    /// Create an argument validation error
    pub fn arg_validation(msg: String) -> Self {
        Self::new(AppErrorInner::ArgValidation(msg), AppErrorKind::ArgValidation)
    }

    /// Create an error for a specifier that could not be parsed
    pub fn invalid_source(err: fromgit::Error) -> Self {
        Self::new(AppErrorInner::InvalidSource(err), AppErrorKind::ArgValidation)
    }

    /// Create a settings error
    pub fn settings(err: fromgit::Error) -> Self {
        Self::new(AppErrorInner::Settings(err), AppErrorKind::Settings)
    }

    /// Create a fetch error
    pub fn fetch(src: String, err: fromgit::Error) -> Self {
        Self::new(AppErrorInner::Fetch { src, err }, AppErrorKind::Fetch)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::new(AppErrorInner::IO(err), AppErrorKind::IO)
    }
}

impl From<AppError> for ExitCode {
    fn from(error: AppError) -> Self {
        ExitCode::from(match error.error_kind() {
            AppErrorKind::Fetch => 1,
            AppErrorKind::ArgValidation => 2,
            _ => 3,
        })
    }
}
