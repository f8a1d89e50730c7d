//! Error types for the rule layer

/// Errors raised while parsing rule inputs or applying transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Cannot {action} a ranking in status {from}")]
    InvalidTransition { action: &'static str, from: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Debate is {actual}, expected {expected}")]
    DebateState { expected: String, actual: String },
}

impl CoreError {
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            kind,
            value: value.into(),
        }
    }
}
