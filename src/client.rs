use crate::config::Connection;
use crate::error::{ConnectionError, MailError};
use crate::message::{Draft, Email};
use crate::protocol::ProtocolDescriptor;
use crate::search::SearchPredicate;
use crate::sender;
use crate::session::{self, FolderMode, MailStore, StoreFactory};
use tracing::{error, info};

/// The public operation surface: list folders, list/filter messages, delete
/// matching messages, send a message.
///
/// Holds only immutable configuration, so independent operations can run
/// concurrently from separate callers. Each operation opens its own store
/// session and fully tears it down before returning.
///
/// Precondition errors (unsupported store port, missing delete filter) come
/// back as `Err`. Remote failures do not: listing degrades to an empty list
/// and delete/send to `false`, with the cause logged where it happened. The
/// result shape alone therefore cannot distinguish "empty folder" from
/// "connection failed".
pub struct MailClient {
    connection: Connection,
    store_factory: StoreFactory,
    sender: sender::Sender,
}

impl MailClient {
    pub fn new(connection: Connection) -> MailClient {
        let conn = connection.clone();
        let store_factory: StoreFactory =
            Box::new(move |descriptor| session::open_store(&conn, descriptor));
        MailClient {
            connection,
            store_factory,
            sender: Box::new(sender::send),
        }
    }

    /// Swaps the connection-opening seam, for tests and alternative
    /// backends.
    pub fn with_store_factory(connection: Connection, store_factory: StoreFactory) -> MailClient {
        MailClient {
            connection,
            store_factory,
            sender: Box::new(sender::send),
        }
    }

    /// Swaps the outbound transport seam, for tests.
    pub fn with_sender(mut self, sender: sender::Sender) -> MailClient {
        self.sender = sender;
        self
    }

    /// Lists folder names on the store. Advisory: any connection failure
    /// comes back as an empty list, which callers must read as
    /// "unknown/unavailable" rather than "no folders exist".
    pub fn list_folders(&self) -> Result<Vec<String>, MailError> {
        let descriptor = ProtocolDescriptor::for_store_port(self.connection.imap_port)?;

        let listed = self.with_store(&descriptor, |store| store.folder_names());
        match listed {
            Ok(folders) => {
                info!("total folders found: {}", folders.len());
                Ok(folders)
            }
            Err(e) => {
                error!("error listing folders: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Lists messages in `folder`, filtered server-side when a predicate is
    /// given. `None` lists everything. Connection failures degrade to an
    /// empty list; whether a predicate was supplied is the caller's only way
    /// to tell "zero messages" from "zero matches".
    pub fn list_messages(
        &self,
        folder: &str,
        query: Option<&SearchPredicate>,
    ) -> Result<Vec<Email>, MailError> {
        let descriptor = ProtocolDescriptor::for_store_port(self.connection.imap_port)?;

        let listed = self.with_store(&descriptor, |store| {
            store.open_folder(folder, FolderMode::ReadOnly)?;
            let uids = store.search(query)?;
            store.fetch(&uids)
        });
        match listed {
            Ok(messages) => {
                match query {
                    Some(_) => info!(
                        "total emails matching search criteria in {}: {}",
                        folder,
                        messages.len()
                    ),
                    None => info!("total emails in {}: {}", folder, messages.len()),
                }
                Ok(messages)
            }
            Err(e) => {
                error!("error listing emails from folder {}: {}", folder, e);
                Ok(Vec::new())
            }
        }
    }

    /// Deletes every message in `folder` matching `query`: each match is
    /// flagged `\Deleted`, then the folder is expunged in one explicit step.
    ///
    /// A missing predicate is rejected before any connection is opened, so
    /// wiping a folder wholesale is impossible to request by accident.
    /// Returns `Ok(false)` when nothing matched or when the exchange failed
    /// partway; a failure between marking and expunge can leave messages
    /// flagged but not removed, and is not retried.
    pub fn delete_messages(
        &self,
        folder: &str,
        query: Option<&SearchPredicate>,
    ) -> Result<bool, MailError> {
        let query = query.ok_or(MailError::MissingFilter)?;
        let descriptor = ProtocolDescriptor::for_store_port(self.connection.imap_port)?;

        let deleted = self.with_store(&descriptor, |store| {
            store.open_folder(folder, FolderMode::ReadWrite)?;
            let uids = store.search(Some(query))?;
            info!(
                "found {} emails matching search criteria in folder {}",
                uids.len(),
                folder
            );

            if uids.is_empty() {
                return Ok(false);
            }

            store.mark_deleted(&uids)?;
            store.expunge()?;
            info!(
                "successfully deleted {} emails from folder {}",
                uids.len(),
                folder
            );
            Ok(true)
        });
        match deleted {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("error deleting emails from folder {}: {}", folder, e);
                Ok(false)
            }
        }
    }

    /// Sends `draft` over SMTP. The port is resolved permissively, so this
    /// never rejects configuration; any build or transport failure is logged
    /// and reported as `false`.
    pub fn send(&self, draft: &Draft) -> bool {
        info!("sending email to: {}, subject: {}", draft.to, draft.subject);
        let descriptor = ProtocolDescriptor::for_smtp_port(self.connection.smtp_port);

        match (self.sender)(&self.connection, &descriptor, draft) {
            Ok(()) => true,
            Err(e) => {
                error!("error sending email to {}: {}", draft.to, e);
                false
            }
        }
    }

    /// Opens a store, runs `body` against it, and closes the store no
    /// matter how `body` came out.
    fn with_store<T>(
        &self,
        descriptor: &ProtocolDescriptor,
        body: impl FnOnce(&mut dyn MailStore) -> Result<T, ConnectionError>,
    ) -> Result<T, ConnectionError> {
        let mut store = (self.store_factory)(descriptor)?;
        let outcome = body(store.as_mut());
        store.close();
        outcome
    }
}
