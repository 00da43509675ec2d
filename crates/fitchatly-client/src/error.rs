use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connection refused, timeout,
    /// malformed body on a success status).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error status; `message` is the server's
    /// own error text.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A send was issued while a previous exchange was still in flight.
    #[error("an exchange is already in flight")]
    Busy,
}

impl ClientError {
    /// HTTP status of the server rejection, if this was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
