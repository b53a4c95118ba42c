/// Coarse classification of an [`EngineError`].
///
/// Only [`ErrorKind::MalformedInput`], [`ErrorKind::ExternalToolFailure`] and
/// [`ErrorKind::Environment`] reach the user. Missing structure and name
/// collisions are resolved inside the engine and only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StructuralNotFound,
    NameCollision,
    MalformedInput,
    ExternalToolFailure,
    Environment,
}

/// All errors produced by the engine and its boundary adapters.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("structure not found: {what}")]
    StructuralNotFound { what: String },

    #[error("name collision on {name}, renamed to {renamed}")]
    NameCollision { name: String, renamed: String },

    #[error("malformed block {block}: {reason}")]
    MalformedInput { block: String, reason: String },

    #[error("{tool} failed ({}): {stderr}", exit_label(.status))]
    ExternalToolFailure { tool: String, status: Option<i32>, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        EngineError::StructuralNotFound { what: what.into() }
    }

    pub(crate) fn malformed(block: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::MalformedInput { block: block.into(), reason: reason.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::StructuralNotFound { .. } => ErrorKind::StructuralNotFound,
            EngineError::NameCollision { .. } => ErrorKind::NameCollision,
            EngineError::MalformedInput { .. } => ErrorKind::MalformedInput,
            EngineError::ExternalToolFailure { .. } => ErrorKind::ExternalToolFailure,
            EngineError::Io(_) | EngineError::Config(_) => ErrorKind::Environment,
        }
    }

    /// Whether the error must be surfaced to the user instead of logged.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self.kind(), ErrorKind::StructuralNotFound | ErrorKind::NameCollision)
    }
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit {code}"),
        None => "terminated".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
