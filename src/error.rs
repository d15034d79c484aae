use crate::model::WindowId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{what} is unavailable")]
    Unavailable { what: String },

    #[error("Permission not granted for {what}")]
    PermissionDenied { what: &'static str },

    #[error("Window {window} not found")]
    WindowNotFound { window: WindowId },

    #[error("Window server connection failed: {message}")]
    Connection { message: String },

    #[error("IO operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Invalid preferences: {source}")]
    Config {
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn unavailable(what: impl Into<String>) -> Self {
        Error::Unavailable { what: what.into() }
    }

    /// Errors raised by races with the OS (process exiting, permission still
    /// pending). Discovery drops the entry and says nothing.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Unavailable { .. } | Error::PermissionDenied { .. } | Error::WindowNotFound { .. }
        )
    }
}
