//! Client error types.

use crate::transport::HubError;

/// Errors surfaced by the action gateway.
///
/// Every failure is also logged at the call site; callers that only want the
/// original fire-and-forget behavior can ignore the result.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("hub error: {0}")]
    Hub(#[from] HubError),

    #[error("connection is not established")]
    NotConnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_display() {
        assert_eq!(
            ClientError::NotConnected.to_string(),
            "connection is not established"
        );
    }

    #[test]
    fn hub_error_is_wrapped() {
        let err: ClientError = HubError::Closed.into();
        assert!(matches!(err, ClientError::Hub(HubError::Closed)));
    }
}
