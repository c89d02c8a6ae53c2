use std::fmt;

/// Broad category of a failure.
///
/// `IllegalState` covers lifecycle misuse (wrong phase for the operation);
/// `ResourceExhausted` covers process-wide table pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IllegalState,
    ResourceExhausted,
}

/// All ways an embedding operation can fail.
///
/// Two failure modes deliberately never appear here:
///
/// * a per-argument encoding failure is absorbed by the argument encoder —
///   the runtime's arguments stay unset and startup continues;
/// * failure of the runtime's own core initialization terminates the
///   process, by the embedded runtime's design. It is never surfaced as a
///   value and must not be intercepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedError {
    /// `start` was called while a session is already running.
    AlreadyRunning,
    /// `stop` was called without a running session.
    NotRunning,
    /// A module registration arrived after the runtime had started.
    RegisterAfterStart(String),
    /// The builtin-module table could not take another entry.
    TableExhausted(String),
}

impl EmbedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbedError::AlreadyRunning
            | EmbedError::NotRunning
            | EmbedError::RegisterAfterStart(_) => ErrorKind::IllegalState,
            EmbedError::TableExhausted(_) => ErrorKind::ResourceExhausted,
        }
    }
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedError::AlreadyRunning => write!(f, "the runtime is already running"),
            EmbedError::NotRunning    => write!(f, "no runtime session is running"),
            EmbedError::RegisterAfterStart(name) => {
                write!(f, "cannot add module `{name}` after the runtime has started")
            }
            EmbedError::TableExhausted(name) => {
                write!(f, "insufficient memory to add module `{name}` to the builtin table")
            }
        }
    }
}

impl std::error::Error for EmbedError {}

pub type Result<T> = std::result::Result<T, EmbedError>;
