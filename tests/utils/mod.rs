use chrono::{NaiveDate, NaiveDateTime};
use mailbroom::config::Connection;
use mailbroom::error::ConnectionError;
use mailbroom::message::{Address, Email};
use mailbroom::search::SearchPredicate;
use mailbroom::session::{FolderMode, MailStore, StoreFactory, Uid};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn connection() -> Connection {
    Connection {
        hostname: "mail.example.com".to_string(),
        imap_port: 143,
        smtp_port: 25,
        username: "user@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub uid: Uid,
    pub from: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
    pub received: NaiveDateTime,
    pub sent: NaiveDateTime,
    pub seen: bool,
    pub deleted: bool,
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

pub fn message(uid: Uid, from: &str, subject: &str, seen: bool) -> StoredMessage {
    StoredMessage {
        uid,
        from: from.to_string(),
        to: "user@example.com".to_string(),
        cc: String::new(),
        bcc: String::new(),
        subject: subject.to_string(),
        body: format!("body of {}", subject),
        received: at(2026, 3, 10, 9, 30, 0),
        sent: at(2026, 3, 10, 9, 29, 0),
        seen,
        deleted: false,
    }
}

/// Evaluates a predicate against one stored message, with the same
/// semantics the server-side translation promises: case-insensitive
/// substring text matches, date bounds inclusive of the whole named day.
pub fn eval(predicate: &SearchPredicate, msg: &StoredMessage) -> bool {
    fn contains(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    match predicate {
        SearchPredicate::Unread => !msg.seen,
        SearchPredicate::Read => msg.seen,
        SearchPredicate::FromContains(text) => contains(&msg.from, text),
        SearchPredicate::SubjectContains(text) => contains(&msg.subject, text),
        SearchPredicate::BodyContains(text) => contains(&msg.body, text),
        SearchPredicate::ToContains(text) => contains(&msg.to, text),
        SearchPredicate::CcContains(text) => contains(&msg.cc, text),
        SearchPredicate::BccContains(text) => contains(&msg.bcc, text),
        SearchPredicate::ReceivedAfter(date) => {
            msg.received >= date.and_hms_opt(0, 0, 0).unwrap()
        }
        SearchPredicate::ReceivedBefore(date) => {
            msg.received <= date.and_hms_opt(23, 59, 59).unwrap()
        }
        SearchPredicate::SentAfter(date) => msg.sent >= date.and_hms_opt(0, 0, 0).unwrap(),
        SearchPredicate::SentBefore(date) => msg.sent <= date.and_hms_opt(23, 59, 59).unwrap(),
        SearchPredicate::And(left, right) => eval(left, msg) && eval(right, msg),
        SearchPredicate::Or(left, right) => eval(left, msg) || eval(right, msg),
        SearchPredicate::Not(inner) => !eval(inner, msg),
    }
}

/// A fake remote mailbox shared across the sessions a [`StoreFactory`]
/// hands out, so changes made in one session are visible to the next.
pub struct MockWorld {
    folders: Arc<Mutex<HashMap<String, Vec<StoredMessage>>>>,
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub expunges: Arc<AtomicUsize>,
    fail_expunge: bool,
}

impl MockWorld {
    pub fn with_inbox(messages: Vec<StoredMessage>) -> MockWorld {
        let mut folders = HashMap::new();
        folders.insert("INBOX".to_string(), messages);
        MockWorld {
            folders: Arc::new(Mutex::new(folders)),
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            expunges: Arc::new(AtomicUsize::new(0)),
            fail_expunge: false,
        }
    }

    pub fn with_folders(names: &[&str]) -> MockWorld {
        let mut folders = HashMap::new();
        for name in names {
            folders.insert(name.to_string(), Vec::new());
        }
        MockWorld {
            folders: Arc::new(Mutex::new(folders)),
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            expunges: Arc::new(AtomicUsize::new(0)),
            fail_expunge: false,
        }
    }

    pub fn failing_expunge(mut self) -> MockWorld {
        self.fail_expunge = true;
        self
    }

    pub fn store_factory(&self) -> StoreFactory {
        let folders = self.folders.clone();
        let opens = self.opens.clone();
        let closes = self.closes.clone();
        let expunges = self.expunges.clone();
        let fail_expunge = self.fail_expunge;

        Box::new(move |_descriptor| {
            opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockStore {
                folders: folders.clone(),
                open_folder: None,
                closes: closes.clone(),
                expunges: expunges.clone(),
                fail_expunge,
            }))
        })
    }

    /// A factory behaving like an unreachable host: every open attempt
    /// fails, but attempts are still counted.
    pub fn unreachable_factory(&self) -> StoreFactory {
        let opens = self.opens.clone();
        Box::new(move |_descriptor| {
            opens.fetch_add(1, Ordering::SeqCst);
            Err(ConnectionError::Connect("connection refused".to_string()))
        })
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn expunge_count(&self) -> usize {
        self.expunges.load(Ordering::SeqCst)
    }

    pub fn inbox(&self) -> Vec<StoredMessage> {
        self.folders.lock().unwrap()["INBOX"].clone()
    }
}

struct MockStore {
    folders: Arc<Mutex<HashMap<String, Vec<StoredMessage>>>>,
    open_folder: Option<(String, FolderMode)>,
    closes: Arc<AtomicUsize>,
    expunges: Arc<AtomicUsize>,
    fail_expunge: bool,
}

impl MockStore {
    fn open_name(&self) -> Result<&str, ConnectionError> {
        self.open_folder
            .as_ref()
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| ConnectionError::Imap("no folder open".to_string()))
    }

    fn require_read_write(&self) -> Result<(), ConnectionError> {
        match self.open_folder {
            Some((_, FolderMode::ReadWrite)) => Ok(()),
            _ => Err(ConnectionError::Imap(
                "folder not open read-write".to_string(),
            )),
        }
    }
}

impl MailStore for MockStore {
    fn folder_names(&mut self) -> Result<Vec<String>, ConnectionError> {
        let mut names: Vec<String> = self.folders.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn open_folder(&mut self, folder: &str, mode: FolderMode) -> Result<(), ConnectionError> {
        if !self.folders.lock().unwrap().contains_key(folder) {
            return Err(ConnectionError::Imap(format!("no such folder: {}", folder)));
        }
        self.open_folder = Some((folder.to_string(), mode));
        Ok(())
    }

    fn search(&mut self, query: Option<&SearchPredicate>) -> Result<Vec<Uid>, ConnectionError> {
        let name = self.open_name()?.to_string();
        let folders = self.folders.lock().unwrap();
        let mut uids: Vec<Uid> = folders[&name]
            .iter()
            .filter(|m| match query {
                Some(predicate) => eval(predicate, m),
                None => true,
            })
            .map(|m| m.uid)
            .collect();
        uids.sort_unstable();
        Ok(uids)
    }

    fn fetch(&mut self, uids: &[Uid]) -> Result<Vec<Email>, ConnectionError> {
        let name = self.open_name()?.to_string();
        let folders = self.folders.lock().unwrap();
        Ok(folders[&name]
            .iter()
            .filter(|m| uids.contains(&m.uid))
            .map(|m| {
                let (mailbox, host) = m.from.split_once('@').unwrap_or((m.from.as_str(), ""));
                Email {
                    uid: m.uid,
                    from: vec![Address {
                        name: None,
                        mailbox: Some(mailbox.to_string()),
                        host: Some(host.to_string()),
                    }],
                    subject: m.subject.clone(),
                    date: None,
                    seen: m.seen,
                }
            })
            .collect())
    }

    fn mark_deleted(&mut self, uids: &[Uid]) -> Result<(), ConnectionError> {
        self.require_read_write()?;
        let name = self.open_name()?.to_string();
        let mut folders = self.folders.lock().unwrap();
        for msg in folders.get_mut(&name).unwrap() {
            if uids.contains(&msg.uid) {
                msg.deleted = true;
            }
        }
        Ok(())
    }

    fn expunge(&mut self) -> Result<(), ConnectionError> {
        self.require_read_write()?;
        if self.fail_expunge {
            return Err(ConnectionError::Imap("EXPUNGE failed".to_string()));
        }
        let name = self.open_name()?.to_string();
        self.expunges.fetch_add(1, Ordering::SeqCst);
        let mut folders = self.folders.lock().unwrap();
        folders.get_mut(&name).unwrap().retain(|m| !m.deleted);
        Ok(())
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
