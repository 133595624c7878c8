use crate::protocol::Protocol;
use thiserror::Error;

/// Errors surfaced to callers of [`crate::client::MailClient`].
///
/// Only configuration and precondition problems show up here. Transport
/// failures are handled at the orchestration boundary and degrade to an
/// empty list or `false` instead of propagating.
#[derive(Error, Debug)]
pub enum MailError {
    #[error(
        "unsupported mail store port {0}; supported ports: 143 (IMAP), 993 (IMAP SSL), \
         110 (POP3), 995 (POP3 SSL), 3143 (IMAP test), 3993 (IMAP SSL test)"
    )]
    UnsupportedPort(u16),

    #[error("at least one filter must be given; deleting a whole folder is not allowed")]
    MissingFilter,

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Failures while opening or using a store/transport session.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The server greeted us with a different protocol than the port was
    /// resolved to. Almost always a misconfigured port, not a network issue.
    #[error(
        "server answered with an SMTP greeting while a {expected} connection was expected; \
         check the configured store port"
    )]
    ProtocolMismatch { expected: Protocol },

    #[error("no {0} backend is available in this build")]
    UnsupportedBackend(Protocol),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

impl From<std::io::Error> for ConnectionError {
    fn from(e: std::io::Error) -> Self {
        ConnectionError::Connect(e.to_string())
    }
}

impl From<imap::Error> for ConnectionError {
    fn from(e: imap::Error) -> Self {
        let msg = e.to_string();
        // An IMAP parse failure whose payload carries an SMTP banner means we
        // dialed a mail relay, not a store. Same diagnosis the plaintext path
        // makes from the greeting itself.
        if msg.contains("ESMTP") || msg.contains("220 ") {
            return ConnectionError::ProtocolMismatch {
                expected: Protocol::Imap,
            };
        }
        ConnectionError::Imap(msg)
    }
}

impl From<native_tls::Error> for ConnectionError {
    fn from(e: native_tls::Error) -> Self {
        ConnectionError::Tls(e.to_string())
    }
}

impl From<lettre::smtp::error::Error> for ConnectionError {
    fn from(e: lettre::smtp::error::Error) -> Self {
        ConnectionError::Smtp(e.to_string())
    }
}
