//! Error types shared across Lenscast crates.

use std::path::PathBuf;

/// Top-level error type for Lenscast operations.
///
/// Only [`LenscastError::Acquisition`] and [`LenscastError::Bind`] are ever
/// surfaced from a pipeline start; per-frame render problems are recovered
/// locally and never become an error value.
#[derive(Debug, thiserror::Error)]
pub enum LenscastError {
    #[error("Acquisition error: {message}")]
    Acquisition { message: String },

    #[error("Bind error: {message}")]
    Bind { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Surface error: {message}")]
    Surface { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Publication slot '{slot}' is already owned by an active pipeline")]
    SlotBusy { slot: String },

    #[error("Pipeline was disposed before it finished starting")]
    Disposed,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LenscastError.
pub type LenscastResult<T> = Result<T, LenscastError>;

impl LenscastError {
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
        }
    }

    pub fn bind(msg: impl Into<String>) -> Self {
        Self::Bind {
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn slot_busy(slot: impl Into<String>) -> Self {
        Self::SlotBusy { slot: slot.into() }
    }

    /// Whether this error aborts a pipeline start (acquisition or bind class).
    pub fn is_start_fatal(&self) -> bool {
        matches!(self, Self::Acquisition { .. } | Self::Bind { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_fatal_classification() {
        assert!(LenscastError::acquisition("camera busy").is_start_fatal());
        assert!(LenscastError::bind("replace failed").is_start_fatal());
        assert!(!LenscastError::render("bad frame").is_start_fatal());
        assert!(!LenscastError::Disposed.is_start_fatal());
    }

    #[test]
    fn display_includes_message() {
        let err = LenscastError::slot_busy("camera");
        assert_eq!(
            err.to_string(),
            "Publication slot 'camera' is already owned by an active pipeline"
        );
        assert_eq!(
            LenscastError::acquisition("denied").to_string(),
            "Acquisition error: denied"
        );
    }
}
