use chrono::{Duration, NaiveDate};

/// A server-side message filter, built from atomic criteria and combined
/// with [`and`](SearchPredicate::and) / [`or`](SearchPredicate::or) /
/// [`not`](SearchPredicate::not).
///
/// The tree is a plain value: building it never touches the network, and
/// translating it twice yields the same query. "No filter at all" is
/// expressed as `Option::None` by callers, which is a different thing from
/// any predicate value: a search without a predicate means "everything",
/// not "nothing".
///
/// ```
/// use mailbroom::search::SearchPredicate;
///
/// let q = SearchPredicate::unread().and(SearchPredicate::from_contains("boss@example.com"));
/// assert_eq!(q.to_imap_query(), r#"(UNSEEN FROM "boss@example.com")"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPredicate {
    Unread,
    Read,
    FromContains(String),
    SubjectContains(String),
    BodyContains(String),
    ToContains(String),
    CcContains(String),
    BccContains(String),
    ReceivedAfter(NaiveDate),
    ReceivedBefore(NaiveDate),
    SentAfter(NaiveDate),
    SentBefore(NaiveDate),
    And(Box<SearchPredicate>, Box<SearchPredicate>),
    Or(Box<SearchPredicate>, Box<SearchPredicate>),
    Not(Box<SearchPredicate>),
}

impl SearchPredicate {
    pub fn unread() -> SearchPredicate {
        SearchPredicate::Unread
    }

    pub fn read() -> SearchPredicate {
        SearchPredicate::Read
    }

    /// Sender address or display name contains `text`.
    pub fn from_contains(text: impl Into<String>) -> SearchPredicate {
        SearchPredicate::FromContains(text.into())
    }

    pub fn subject_contains(text: impl Into<String>) -> SearchPredicate {
        SearchPredicate::SubjectContains(text.into())
    }

    pub fn body_contains(text: impl Into<String>) -> SearchPredicate {
        SearchPredicate::BodyContains(text.into())
    }

    pub fn to_contains(text: impl Into<String>) -> SearchPredicate {
        SearchPredicate::ToContains(text.into())
    }

    pub fn cc_contains(text: impl Into<String>) -> SearchPredicate {
        SearchPredicate::CcContains(text.into())
    }

    pub fn bcc_contains(text: impl Into<String>) -> SearchPredicate {
        SearchPredicate::BccContains(text.into())
    }

    /// Received on day `date` or later (from local start of day, inclusive).
    pub fn received_after(date: NaiveDate) -> SearchPredicate {
        SearchPredicate::ReceivedAfter(date)
    }

    /// Received on day `date` or earlier (up to 23:59:59, inclusive), so
    /// `received_after(d).and(received_before(d))` covers exactly day `d`.
    pub fn received_before(date: NaiveDate) -> SearchPredicate {
        SearchPredicate::ReceivedBefore(date)
    }

    pub fn sent_after(date: NaiveDate) -> SearchPredicate {
        SearchPredicate::SentAfter(date)
    }

    pub fn sent_before(date: NaiveDate) -> SearchPredicate {
        SearchPredicate::SentBefore(date)
    }

    /// Both predicates must match.
    pub fn and(self, other: SearchPredicate) -> SearchPredicate {
        SearchPredicate::And(Box::new(self), Box::new(other))
    }

    /// At least one predicate must match.
    pub fn or(self, other: SearchPredicate) -> SearchPredicate {
        SearchPredicate::Or(Box::new(self), Box::new(other))
    }

    /// The predicate must not match.
    pub fn not(self) -> SearchPredicate {
        SearchPredicate::Not(Box::new(self))
    }

    /// Renders the tree as an IMAP SEARCH program, one search key per node.
    ///
    /// Composites are parenthesized so every subtree stays a single key and
    /// nests cleanly under OR/NOT. IMAP date comparisons have whole-day
    /// granularity; the inclusive "before end of `d`" bound is expressed as
    /// strictly-before `d + 1`.
    pub fn to_imap_query(&self) -> String {
        match self {
            SearchPredicate::Unread => "UNSEEN".to_string(),
            SearchPredicate::Read => "SEEN".to_string(),
            SearchPredicate::FromContains(text) => format!("FROM {}", quote(text)),
            SearchPredicate::SubjectContains(text) => format!("SUBJECT {}", quote(text)),
            SearchPredicate::BodyContains(text) => format!("BODY {}", quote(text)),
            SearchPredicate::ToContains(text) => format!("TO {}", quote(text)),
            SearchPredicate::CcContains(text) => format!("CC {}", quote(text)),
            SearchPredicate::BccContains(text) => format!("BCC {}", quote(text)),
            SearchPredicate::ReceivedAfter(date) => format!("SINCE {}", imap_date(*date)),
            SearchPredicate::ReceivedBefore(date) => {
                format!("BEFORE {}", imap_date(day_after(*date)))
            }
            SearchPredicate::SentAfter(date) => format!("SENTSINCE {}", imap_date(*date)),
            SearchPredicate::SentBefore(date) => {
                format!("SENTBEFORE {}", imap_date(day_after(*date)))
            }
            SearchPredicate::And(left, right) => {
                format!("({} {})", left.to_imap_query(), right.to_imap_query())
            }
            SearchPredicate::Or(left, right) => {
                format!("(OR {} {})", left.to_imap_query(), right.to_imap_query())
            }
            SearchPredicate::Not(inner) => format!("(NOT {})", inner.to_imap_query()),
        }
    }
}

/// IMAP quoted-string: backslash-escape `\` and `"`. Control characters
/// (CR, LF and friends) cannot appear in a quoted string at all, so they
/// are dropped rather than poisoning the whole query.
fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c.is_control() {
            continue;
        }
        if c == '\\' || c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// IMAP date-text, e.g. `3-Mar-2026`.
fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date + Duration::days(1)
}
