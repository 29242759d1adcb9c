use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to read notification preferences: {0}")]
    Preferences(String),

    #[error("failed to send notifications: {}", format_failures(.0))]
    Delivery(Vec<DeliveryFailure>),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeliveryFailure {
    pub service: String,
    pub error: String,
}

fn format_failures(failures: &[DeliveryFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{}: {}", failure.service, failure.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::{DeliveryFailure, NotifyError};

    #[test]
    fn delivery_error_lists_every_failure() {
        let error = NotifyError::Delivery(vec![
            DeliveryFailure {
                service: "slack://a".to_string(),
                error: "timeout".to_string(),
            },
            DeliveryFailure {
                service: "ntfy://b".to_string(),
                error: "401".to_string(),
            },
        ]);

        assert_eq!(
            error.to_string(),
            "failed to send notifications: slack://a: timeout; ntfy://b: 401"
        );
    }
}
