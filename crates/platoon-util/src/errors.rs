use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for platoon operations outside the resolution algorithm.
#[derive(Debug, Error, Diagnostic)]
pub enum PlatoonError {
    /// Invalid or malformed resolution request or module catalog.
    #[error("Request error: {message}")]
    #[diagnostic(help("Check the request and catalog TOML files for typos"))]
    Request { message: String },

    /// Global configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}
