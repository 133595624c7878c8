use crate::error::MailError;
use std::fmt;
use tracing::warn;

/// Wire protocols this client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Imap,
    Pop3,
    Smtp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Protocol::Imap => "IMAP",
            Protocol::Pop3 => "POP3",
            Protocol::Smtp => "SMTP",
        };
        write!(f, "{}", name)
    }
}

/// A (protocol, security mode) pair resolved from a bare port number.
///
/// Produced once per connection attempt and immutable after that. Store
/// resolution is strict: an unknown port is a configuration error and is
/// rejected before any network traffic. SMTP resolution is permissive,
/// because relays in test setups routinely sit on arbitrary ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    pub protocol: Protocol,
    pub use_ssl: bool,
    pub use_starttls: bool,
}

impl ProtocolDescriptor {
    /// Resolves a mail store port (IMAP/POP3).
    ///
    /// Ports 3143/3993 are the conventional test-server offsets of 143/993.
    pub fn for_store_port(port: u16) -> Result<ProtocolDescriptor, MailError> {
        let (protocol, use_ssl) = match port {
            143 | 3143 => (Protocol::Imap, false),
            993 | 3993 => (Protocol::Imap, true),
            110 => (Protocol::Pop3, false),
            995 => (Protocol::Pop3, true),
            other => return Err(MailError::UnsupportedPort(other)),
        };

        Ok(ProtocolDescriptor {
            protocol,
            use_ssl,
            use_starttls: false,
        })
    }

    /// Resolves an SMTP port. Never fails: a non-standard port is accepted
    /// as plain SMTP with a logged caveat, and no security upgrade applied.
    pub fn for_smtp_port(port: u16) -> ProtocolDescriptor {
        let (use_ssl, use_starttls) = match port {
            25 => (false, false),
            587 => (false, true),
            465 => (true, false),
            other => {
                warn!("unusual SMTP port: {}", other);
                warn!("standard SMTP ports: 25 (plain), 587 (STARTTLS), 465 (SSL)");
                (false, false)
            }
        };

        ProtocolDescriptor {
            protocol: Protocol::Smtp,
            use_ssl,
            use_starttls,
        }
    }
}
