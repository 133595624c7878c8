use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Summary of one stored message, built from an IMAP FETCH response
/// carrying `UID FLAGS ENVELOPE INTERNALDATE`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Email {
    pub uid: u32,
    pub from: Vec<Address>,
    pub subject: String,
    pub date: Option<DateTime<FixedOffset>>,
    pub seen: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub name: Option<String>,
    pub mailbox: Option<String>,
    pub host: Option<String>,
}

impl Address {
    fn from_imap_address(address: &imap_proto::Address) -> Address {
        Address {
            name: decode(&address.name),
            mailbox: decode(&address.mailbox),
            host: decode(&address.host),
        }
    }

    /// `mailbox@host`, or whatever parts of it the envelope carried.
    pub fn email(&self) -> String {
        match (&self.mailbox, &self.host) {
            (Some(mailbox), Some(host)) => format!("{}@{}", mailbox, host),
            (Some(mailbox), None) => mailbox.clone(),
            _ => String::new(),
        }
    }
}

fn decode(field: &Option<std::borrow::Cow<[u8]>>) -> Option<String> {
    field
        .as_ref()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

impl Email {
    pub fn from_fetch(msg: &imap::types::Fetch) -> Result<Email> {
        let uid = msg.uid.ok_or(anyhow!("UID missing from fetch response"))?;
        let envelope = msg.envelope().ok_or(anyhow!("no envelope in fetch"))?;

        let from = envelope
            .from
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(Address::from_imap_address)
            .collect();

        let subject = envelope
            .subject
            .as_ref()
            .map(|cow| String::from_utf8_lossy(cow).into_owned())
            .unwrap_or_default();

        let seen = msg.flags().contains(&imap::types::Flag::Seen);

        Ok(Email {
            uid,
            from,
            subject,
            date: msg.internal_date(),
            seen,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self)
    }
}

/// An outbound message. The sender address comes from the configured
/// account, so a draft is just recipient, subject and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub to: String,
    pub subject: String,
    pub body: String,
}
