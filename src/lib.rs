//! Mailbox housekeeping over IMAP/SMTP: enumerate folders, list and filter
//! messages with composable server-side search predicates, bulk-delete
//! matches, and send new messages.

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod protocol;
pub mod search;
pub mod sender;
pub mod session;

pub use client::MailClient;
pub use error::{ConnectionError, MailError};
pub use message::{Draft, Email};
pub use protocol::{Protocol, ProtocolDescriptor};
pub use search::SearchPredicate;
