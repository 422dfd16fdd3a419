use ledger::LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Message used when the server rejects a request without a readable
/// `{message}` body.
pub const DEFAULT_API_ERROR_MESSAGE: &str = "The server rejected the request";

const CONNECTION_USER_MESSAGE: &str = "Could not reach server";
const FALLBACK_USER_MESSAGE: &str = "Something went wrong, please try again";
const INVALID_AMOUNT_USER_MESSAGE: &str = "Enter an amount greater than zero";
const CONFIRMED_USER_MESSAGE: &str = "This payment is already confirmed and cannot be removed";
const DELETED_USER_MESSAGE: &str = "This payment was already removed";

/// Outcome of a failed call through the repository boundary.
///
/// Every failed remote call ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// No response reached the client. Retryable by the caller.
    #[error("connection error: {0}")]
    Connection(String),
    /// The server answered with a non-success status.
    #[error("{status}: {message}")]
    Api { status: u16, message: String },
    /// The response matched no known contract.
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl DomainError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Connection(_))
    }

    /// Text safe to show to a user. Never contains raw transport errors.
    pub fn user_message(&self) -> String {
        match self {
            DomainError::Connection(_) => CONNECTION_USER_MESSAGE.to_string(),
            DomainError::Api { message, .. } => message.clone(),
            DomainError::UnexpectedShape(_) => FALLBACK_USER_MESSAGE.to_string(),
        }
    }
}

/// Errors returned by the services built on top of the repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Repository(#[from] DomainError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ClientError {
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Repository(err) => err.user_message(),
            ClientError::Ledger(err) => match err {
                LedgerError::InvalidAmount(_) => INVALID_AMOUNT_USER_MESSAGE,
                LedgerError::ReversalRequired(_) => CONFIRMED_USER_MESSAGE,
                LedgerError::TerminalState(_) => DELETED_USER_MESSAGE,
                _ => FALLBACK_USER_MESSAGE,
            }
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_hide_transport_details() {
        let err = ClientError::from(DomainError::Connection(
            "tcp connect error: Connection refused (os error 111)".to_string(),
        ));
        assert_eq!(err.user_message(), "Could not reach server");
    }

    #[test]
    fn api_errors_surface_server_message() {
        let err = DomainError::Api {
            status: 422,
            message: "amount exceeds share".to_string(),
        };
        assert_eq!(err.user_message(), "amount exceeds share");
        assert!(!err.is_retryable());
    }

    #[test]
    fn unexpected_shape_uses_fallback() {
        let err = DomainError::UnexpectedShape("missing field `id`".to_string());
        assert_eq!(err.user_message(), FALLBACK_USER_MESSAGE);
    }

    #[test]
    fn ledger_errors_use_fixed_messages() {
        let message = |err: LedgerError| ClientError::from(err).user_message();

        assert_eq!(
            message(LedgerError::ReversalRequired(4)),
            CONFIRMED_USER_MESSAGE
        );
        assert_eq!(message(LedgerError::TerminalState(4)), DELETED_USER_MESSAGE);
        assert_eq!(
            message(LedgerError::InvalidAmount("got -1.00".to_string())),
            INVALID_AMOUNT_USER_MESSAGE
        );
        assert_eq!(message(LedgerError::Overflow), FALLBACK_USER_MESSAGE);
        assert_eq!(
            message(LedgerError::UnknownMember(
                "expense 3 references registered:2".to_string()
            )),
            FALLBACK_USER_MESSAGE
        );
    }
}
