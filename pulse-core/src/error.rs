//! Error types.
//!
//! Runtime failures (scheduling, asset loading) are absorbed by the component
//! that produced them and turned into an observable "absent" state. They are
//! still modelled as proper error values so that the absorbing component can
//! log them and so that completions can carry the cause.

use thiserror::Error;

/// Failure to schedule a delayed task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// No async runtime is reachable from the calling thread.
    #[error("no async runtime is available on this thread")]
    RuntimeUnavailable,

    /// The scheduler has been shut down and accepts no new work.
    #[error("scheduler has been shut down")]
    ShutDown,

    /// Periodic work was requested with a zero interval.
    #[error("periodic work needs a non-zero interval")]
    ZeroInterval,
    /// The requested delay does not fit in a `Duration`.
    #[error("requested delay is out of range")]
    DelayOverflow,
}

/// Failure to load or decode a selected asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("failed to load asset `{token}`: {reason}")]
    Load { token: String, reason: String },

    #[error("asset `{token}` is not a recognised image")]
    Decode { token: String },
}

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Umbrella error for the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_their_cause() {
        let err = AssetError::Load {
            token: "photo-1".into(),
            reason: "permission denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to load asset `photo-1`: permission denied"
        );

        let wrapped: Error = SchedulerError::ShutDown.into();
        assert_eq!(wrapped.to_string(), "scheduler has been shut down");
    }
}
