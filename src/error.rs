use crate::dispatcher::{InstallationAttempt, Strategy};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    /// Non-fatal, the prober treats the thing as absent.
    #[error("Detection command '{command}' failed: {reason}")]
    DetectionFailure { command: String, reason: String },

    #[error("{strategy} strategy failed for {browser}: {reason}")]
    StrategyFailure { browser: &'static str, strategy: Strategy, reason: String },

    #[error("{}", exhausted_message(.browser, .attempts))]
    AllStrategiesExhausted { browser: &'static str, attempts: Vec<InstallationAttempt> },

    #[error("Unsupported environment: {0}")]
    EnvironmentUnsupported(String)
}

fn exhausted_message(browser: &str, attempts: &[InstallationAttempt]) -> String {
    if attempts.is_empty() {
        return format!("No installation method is available for {browser} on this system");
    }

    let tried = attempts.iter().map(|a| a.strategy.to_string()).collect::<Vec<_>>().join(", ");
    format!("Every installation method failed for {browser} (tried {tried})")
}

pub type Result<T> = std::result::Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_without_attempts_says_nothing_was_available() {
        let err = ManagerError::AllStrategiesExhausted { browser: "Opera", attempts: Vec::new() };
        assert_eq!(err.to_string(), "No installation method is available for Opera on this system");
    }

    #[test]
    fn unsupported_environment_message() {
        let err = ManagerError::EnvironmentUnsupported(String::from("no package manager found"));
        assert_eq!(err.to_string(), "Unsupported environment: no package manager found");
    }
}
