/// Errors raised while validating or parsing a solver configuration.
///
/// These are fatal: no partial engine is constructed when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Returned when the evaluation budget is zero.
    #[error("invalid budget: must be at least 1")]
    InvalidBudget,

    /// Returned when `probe_ratio` falls outside `(0.0, 1.0]`.
    #[error("invalid probe_ratio: {0} must be in (0.0, 1.0]")]
    InvalidProbeRatio(f64),

    /// Returned when a parameter's lower bound is not below its upper bound,
    /// or either bound is not finite.
    #[error("invalid bounds for '{name}': min ({min}) must be finite and less than max ({max})")]
    InvalidBounds {
        /// The name of the offending parameter.
        name: String,
        /// The declared lower bound.
        min: f64,
        /// The declared upper bound.
        max: f64,
    },

    /// Returned when the configuration declares no parameters at all.
    #[error("bounds cannot be empty")]
    EmptyBounds,

    /// Returned when a configuration document cannot be deserialized.
    #[error("malformed configuration document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by misuse of the ask/tell/seed call sequence.
///
/// The engine's state is left unchanged when one of these is returned, so the
/// caller may correct the input and retry.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Returned when a counted result reuses an already-recorded `eval_id`.
    #[error("duplicate eval_id {0} for a counted result")]
    DuplicateEvalId(u64),

    /// Returned when `tell` is called after the run has finished.
    #[error("tell() called in the Done state")]
    TellAfterDone,

    /// Returned when `seed` is called while an asked batch is still
    /// unanswered.
    #[error("seed() called while an asked batch is outstanding")]
    SeedDuringAsk,

    /// Returned when a batch of counted results would push the history past
    /// the configured budget.
    #[error("accepting the batch would exceed the budget of {budget}")]
    BudgetExceeded {
        /// The configured evaluation budget.
        budget: u64,
    },

    /// Returned when a reported point names a parameter absent from the
    /// configured bounds, or omits a configured one.
    #[error("unknown or missing parameter '{0}'")]
    UnknownParameter(String),
}

/// Aggregate error type for fallible public operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration problem. See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A call-sequence problem. See [`ProtocolError`].
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidBounds {
            name: "lr".to_string(),
            min: 1.0,
            max: 0.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("lr"), "message should name the parameter: {msg}");
        assert!(msg.contains('1'), "message should show the bounds: {msg}");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::DuplicateEvalId(17);
        assert!(err.to_string().contains("17"));
    }

    #[test]
    fn test_error_from_conversions() {
        let err: Error = ConfigError::InvalidBudget.into();
        assert!(matches!(err, Error::Config(ConfigError::InvalidBudget)));

        let err: Error = ProtocolError::TellAfterDone.into();
        assert!(matches!(err, Error::Protocol(ProtocolError::TellAfterDone)));
    }
}
