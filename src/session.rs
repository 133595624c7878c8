use crate::config::Connection;
use crate::error::ConnectionError;
use crate::message::Email;
use crate::protocol::{Protocol, ProtocolDescriptor};
use crate::search::SearchPredicate;
use std::io::{Read, Write};
use std::net::TcpStream;
use tracing::{debug, info, warn};

pub type Uid = u32;

/// How a folder is opened. Listing uses `ReadOnly` (IMAP EXAMINE), deletion
/// needs `ReadWrite` (IMAP SELECT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderMode {
    ReadOnly,
    ReadWrite,
}

/// One live, single-use connection to a remote mail store.
///
/// The store is an opaque capability: it accepts a search and returns
/// matching messages, accepts flag mutations and an expunge request. Every
/// public operation opens its own store through a [`StoreFactory`] and
/// closes it before returning; nothing is pooled or reused.
pub trait MailStore {
    /// Names of all folders visible to the account.
    fn folder_names(&mut self) -> Result<Vec<String>, ConnectionError>;

    /// Selects `folder` for the rest of this session.
    fn open_folder(&mut self, folder: &str, mode: FolderMode) -> Result<(), ConnectionError>;

    /// Evaluates `query` server-side in the open folder. `None` matches
    /// every message; that is a different request than any predicate.
    fn search(&mut self, query: Option<&SearchPredicate>) -> Result<Vec<Uid>, ConnectionError>;

    /// Fetches summaries for the given UIDs from the open folder.
    fn fetch(&mut self, uids: &[Uid]) -> Result<Vec<Email>, ConnectionError>;

    /// Flags the given messages `\Deleted` without removing them yet.
    fn mark_deleted(&mut self, uids: &[Uid]) -> Result<(), ConnectionError>;

    /// Permanently removes every message flagged `\Deleted`.
    fn expunge(&mut self) -> Result<(), ConnectionError>;

    /// Tears the session down. Best-effort: failures are logged, never
    /// propagated, so release can run on every exit path. Must not expunge;
    /// expunge is always an explicit, earlier step.
    fn close(&mut self);
}

/// Opens a store connection for an already-resolved descriptor.
pub type StoreFactory =
    Box<dyn Fn(&ProtocolDescriptor) -> Result<Box<dyn MailStore>, ConnectionError> + Send + Sync>;

struct ImapStore<T: Read + Write> {
    session: imap::Session<T>,
}

impl<T: Read + Write> MailStore for ImapStore<T> {
    fn folder_names(&mut self) -> Result<Vec<String>, ConnectionError> {
        let names = self.session.list(Some(""), Some("*"))?;
        Ok(names.iter().map(|n| n.name().to_string()).collect())
    }

    fn open_folder(&mut self, folder: &str, mode: FolderMode) -> Result<(), ConnectionError> {
        match mode {
            FolderMode::ReadOnly => self.session.examine(folder)?,
            FolderMode::ReadWrite => self.session.select(folder)?,
        };
        Ok(())
    }

    fn search(&mut self, query: Option<&SearchPredicate>) -> Result<Vec<Uid>, ConnectionError> {
        let program = match query {
            Some(predicate) => predicate.to_imap_query(),
            None => "ALL".to_string(),
        };
        debug!("UID SEARCH {}", program);
        let mut uids: Vec<Uid> = self.session.uid_search(program)?.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    fn fetch(&mut self, uids: &[Uid]) -> Result<Vec<Email>, ConnectionError> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let uid_set = uid_set(uids);
        let fetches = self
            .session
            .uid_fetch(uid_set, "(UID FLAGS ENVELOPE INTERNALDATE)")?;

        let mut emails = Vec::new();
        for fetch in fetches.iter() {
            let email =
                Email::from_fetch(fetch).map_err(|e| ConnectionError::Imap(e.to_string()))?;
            emails.push(email);
        }
        Ok(emails)
    }

    fn mark_deleted(&mut self, uids: &[Uid]) -> Result<(), ConnectionError> {
        if uids.is_empty() {
            return Ok(());
        }
        self.session
            .uid_store(uid_set(uids), "+FLAGS (\\Deleted)")?;
        Ok(())
    }

    fn expunge(&mut self) -> Result<(), ConnectionError> {
        self.session.expunge()?;
        Ok(())
    }

    fn close(&mut self) {
        // LOGOUT, never CLOSE: closing a selected folder with CLOSE would
        // expunge flagged messages behind the caller's back.
        if let Err(e) = self.session.logout() {
            warn!("failed to log out cleanly: {}", e);
        }
    }
}

fn uid_set(uids: &[Uid]) -> String {
    uids.iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Opens a store session for the resolved protocol/security mode.
///
/// A server that greets us in the wrong protocol is reported as a
/// [`ConnectionError::ProtocolMismatch`], since that points at a
/// misconfigured port rather than a flaky network.
pub fn open_store(
    conn: &Connection,
    descriptor: &ProtocolDescriptor,
) -> Result<Box<dyn MailStore>, ConnectionError> {
    match descriptor.protocol {
        Protocol::Imap => {
            info!(
                "connecting to IMAP server {}:{} (ssl: {})",
                conn.hostname, conn.imap_port, descriptor.use_ssl
            );
            if descriptor.use_ssl {
                open_imap_tls(conn)
            } else {
                open_imap_plain(conn)
            }
        }
        // Descriptor resolution knows these ports; no client backend for
        // them is wired into this build.
        Protocol::Pop3 => Err(ConnectionError::UnsupportedBackend(Protocol::Pop3)),
        Protocol::Smtp => Err(ConnectionError::UnsupportedBackend(Protocol::Smtp)),
    }
}

fn open_imap_tls(conn: &Connection) -> Result<Box<dyn MailStore>, ConnectionError> {
    let client = imap::ClientBuilder::new(&conn.hostname, conn.imap_port).native_tls()?;
    let session = client
        .login(&conn.username, &conn.password)
        .map_err(|e| ConnectionError::Auth(e.0.to_string()))?;
    info!("connected to {}:{}", conn.hostname, conn.imap_port);
    Ok(Box::new(ImapStore { session }))
}

fn open_imap_plain(conn: &Connection) -> Result<Box<dyn MailStore>, ConnectionError> {
    let mut tcp = TcpStream::connect((conn.hostname.as_str(), conn.imap_port))?;

    // The greeting is consumed here, before the IMAP client takes over the
    // stream, so a wrong-protocol server can be diagnosed up front.
    let greeting = read_greeting(&mut tcp)?;
    debug!("server greeting: {}", greeting);
    if greeting.starts_with("220") || greeting.contains("ESMTP") {
        return Err(ConnectionError::ProtocolMismatch {
            expected: Protocol::Imap,
        });
    }

    let client = imap::Client::new(tcp);
    let session = client
        .login(&conn.username, &conn.password)
        .map_err(|e| ConnectionError::Auth(e.0.to_string()))?;
    info!("connected to {}:{}", conn.hostname, conn.imap_port);
    Ok(Box::new(ImapStore { session }))
}

/// Reads the single greeting line byte by byte, so nothing past the CRLF is
/// pulled off the stream.
fn read_greeting(stream: &mut TcpStream) -> Result<String, ConnectionError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if stream.read(&mut byte)? == 0 {
            break;
        }
        line.push(byte[0]);
        if byte[0] == b'\n' || line.len() > 8192 {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&line).trim().to_string())
}
