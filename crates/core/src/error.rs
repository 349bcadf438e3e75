use std::path::PathBuf;

/// Result alias that carries the custom [`GridBeatError`] type.
pub type Result<T> = std::result::Result<T, GridBeatError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum GridBeatError {
    /// Free-form message for conditions that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Configuration that makes judgment meaningless, e.g. a zero-sized grid.
    /// Always fatal: a session refuses to start with it.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A single chart line that could not be parsed. The parser records these
    /// and keeps going, so they never abort a whole chart.
    #[error("chart line {line} in [{section}]: {reason}")]
    ChartLine {
        line: usize,
        section: String,
        reason: String,
    },
    /// A chart or audio resource that does not exist on disk.
    #[error("missing resource `{}`", path.display())]
    MissingResource { path: PathBuf },
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl GridBeatError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a session can carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ChartLine { .. } | Self::MissingResource { .. })
    }
}

impl From<&str> for GridBeatError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for GridBeatError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
