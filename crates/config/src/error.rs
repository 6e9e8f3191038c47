use std::path::PathBuf;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),

    #[error("invalid value for {name}: {message}")]
    InvalidEnv { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
