// MIT License

/// All errors that can occur in the paradox-web-bridge library.
///
/// Every failure during a session step carries the originating kind so the
/// caller can log it, but the recovery policy is uniform: the engine resets
/// to `LoggedOut` and the next `process()` call restarts the login cycle.
#[derive(Debug, thiserror::Error)]
pub enum ParadoxError {
    #[error("Transport failure: {details}")]
    TransportFailure { details: String },

    #[error("Invalid session token (length {length}, expected 16)")]
    InvalidToken { length: usize },

    #[error("Another user is already logged in: {user}")]
    AlreadyLoggedIn { user: String },

    #[error("Login attempt ceiling reached on the IP module")]
    AttemptCeilingReached,

    #[error("Terminology unavailable: {details}")]
    TerminologyUnavailable { details: String },

    #[error("Malformed status response: {details}")]
    MalformedResponse { details: String },

    #[error("IP module initialization timed out (last stage {last_stage})")]
    ModuleInitTimeout { last_stage: u32 },

    #[error("Unknown arm mode: {mode}")]
    UnknownArmMode { mode: String },

    #[error("Unknown area: {name}")]
    UnknownArea { name: String },
}

impl ParadoxError {
    /// Whether this error is terminal for the current login cycle.
    ///
    /// Terminal errors mean the module actively refused the session
    /// (lockout, or someone else holds it). Retrying immediately only makes
    /// things worse; the caller should back off before the next cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ParadoxError::AttemptCeilingReached | ParadoxError::AlreadyLoggedIn { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ParadoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(ParadoxError::AttemptCeilingReached.is_terminal());
        assert!(
            ParadoxError::AlreadyLoggedIn {
                user: "admin".to_string()
            }
            .is_terminal()
        );
        assert!(
            !ParadoxError::TransportFailure {
                details: "timeout".to_string()
            }
            .is_terminal()
        );
        assert!(!ParadoxError::InvalidToken { length: 0 }.is_terminal());
        assert!(!ParadoxError::ModuleInitTimeout { last_stage: 1 }.is_terminal());
    }
}
