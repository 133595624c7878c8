use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use mailbroom::config::{self, Config, Connection};
use mailbroom::{Draft, MailClient, SearchPredicate};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Mailbox housekeeping: list, filter, delete and send email")]
struct Cli {
    /// Specify location of config file.
    #[clap(long, global = true)]
    config: Option<String>,

    /// hostname of the mail server.
    #[clap(long, global = true)]
    hostname: Option<String>,

    /// IMAP/POP3 port of the mail store. POP3 ports (110, 995) are
    /// recognized but no POP3 backend is included; store access requires
    /// IMAP.
    #[clap(long, global = true)]
    imap_port: Option<u16>,

    /// SMTP port for sending.
    #[clap(long, global = true)]
    smtp_port: Option<u16>,

    /// username for authentication.
    #[clap(long, global = true)]
    username: Option<String>,

    /// password for authentication.
    #[clap(long, global = true)]
    password: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

impl Cli {
    #[rustfmt::skip]
    fn overwrite_config(&self, config: Config) -> Config {
        Config {
            connection: Connection {
                hostname  : self.hostname.as_ref().unwrap_or(&config.connection.hostname).clone(),
                username  : self.username.as_ref().unwrap_or(&config.connection.username).clone(),
                password  : self.password.as_ref().unwrap_or(&config.connection.password).clone(),
                imap_port : self.imap_port.unwrap_or(config.connection.imap_port),
                smtp_port : self.smtp_port.unwrap_or(config.connection.smtp_port),
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List mailbox folders.
    ListFolders {
        /// Output results in plain text format (default is JSON).
        #[clap(long)]
        text: bool,
    },
    /// List emails in a folder with optional filtering.
    ListEmails {
        /// Folder to list emails from.
        #[clap(default_value = "INBOX")]
        folder: String,

        #[clap(flatten)]
        filters: FilterArgs,

        /// Output results in plain text format (default is JSON).
        #[clap(long)]
        text: bool,
    },
    /// Delete emails in a folder matching the given criteria.
    DeleteEmails {
        /// Folder to delete emails from.
        #[clap(default_value = "INBOX")]
        folder: String,

        #[clap(flatten)]
        filters: FilterArgs,
    },
    /// Send an email.
    Send {
        /// Recipient address.
        #[clap(long)]
        to: String,

        /// Subject line.
        #[clap(long)]
        subject: String,

        /// Plain text body.
        #[clap(long)]
        body: String,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Filter unread emails.
    #[clap(long)]
    unread: bool,

    /// Filter read emails.
    #[clap(long)]
    read: bool,

    /// Filter emails from sender (address or name).
    #[clap(long)]
    from: Option<String>,

    /// Filter emails with subject containing text.
    #[clap(long)]
    subject: Option<String>,

    /// Filter emails with body containing text.
    #[clap(long)]
    body: Option<String>,

    /// Filter emails sent to recipient.
    #[clap(long)]
    to: Option<String>,

    /// Filter emails CC'd to recipient.
    #[clap(long)]
    cc: Option<String>,

    /// Filter emails BCC'd to recipient.
    #[clap(long)]
    bcc: Option<String>,

    /// Filter emails received after date (yyyy-mm-dd).
    #[clap(long)]
    received_after: Option<String>,

    /// Filter emails received before date (yyyy-mm-dd).
    #[clap(long)]
    received_before: Option<String>,

    /// Filter emails sent after date (yyyy-mm-dd).
    #[clap(long)]
    sent_after: Option<String>,

    /// Filter emails sent before date (yyyy-mm-dd).
    #[clap(long)]
    sent_before: Option<String>,
}

impl FilterArgs {
    /// Folds every supplied flag into one predicate, ANDed left to right in
    /// the order the flags are declared. No flags means no predicate.
    fn build_predicate(&self) -> Result<Option<SearchPredicate>> {
        let mut query: Option<SearchPredicate> = None;
        let mut add = |atom: SearchPredicate| {
            query = Some(match query.take() {
                Some(existing) => existing.and(atom),
                None => atom,
            });
        };

        if self.unread {
            add(SearchPredicate::unread());
        }
        if self.read {
            add(SearchPredicate::read());
        }
        if let Some(from) = nonblank(&self.from) {
            add(SearchPredicate::from_contains(from));
        }
        if let Some(subject) = nonblank(&self.subject) {
            add(SearchPredicate::subject_contains(subject));
        }
        if let Some(body) = nonblank(&self.body) {
            add(SearchPredicate::body_contains(body));
        }
        if let Some(to) = nonblank(&self.to) {
            add(SearchPredicate::to_contains(to));
        }
        if let Some(cc) = nonblank(&self.cc) {
            add(SearchPredicate::cc_contains(cc));
        }
        if let Some(bcc) = nonblank(&self.bcc) {
            add(SearchPredicate::bcc_contains(bcc));
        }
        if let Some(date) = nonblank(&self.received_after) {
            add(SearchPredicate::received_after(parse_date(
                &date,
                "--received-after",
            )?));
        }
        if let Some(date) = nonblank(&self.received_before) {
            add(SearchPredicate::received_before(parse_date(
                &date,
                "--received-before",
            )?));
        }
        if let Some(date) = nonblank(&self.sent_after) {
            add(SearchPredicate::sent_after(parse_date(&date, "--sent-after")?));
        }
        if let Some(date) = nonblank(&self.sent_before) {
            add(SearchPredicate::sent_before(parse_date(
                &date,
                "--sent-before",
            )?));
        }

        Ok(query)
    }
}

fn nonblank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

fn parse_date(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date format for {}. Use yyyy-mm-dd format.", flag))
}

#[derive(Serialize)]
struct FolderListResponse {
    count: usize,
    folders: Vec<String>,
}

#[derive(Serialize)]
struct EmailListResponse {
    folder: String,
    count: usize,
    emails: Vec<mailbroom::Email>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let config = cli.overwrite_config(config::get_config(&cli.config)?);
    let client = MailClient::new(config.connection);

    match &cli.command {
        Command::ListFolders { text } => {
            let folders = client.list_folders()?;
            if *text {
                println!("Folders ({}):", folders.len());
                for folder in &folders {
                    println!("  {}", folder);
                }
            } else {
                let response = FolderListResponse {
                    count: folders.len(),
                    folders,
                };
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            Ok(0)
        }
        Command::ListEmails {
            folder,
            filters,
            text,
        } => {
            let query = filters.build_predicate()?;
            let emails = client.list_messages(folder, query.as_ref())?;

            if *text {
                if emails.is_empty() {
                    let message = match query {
                        Some(_) => format!(
                            "No emails found matching the criteria in folder: {}",
                            folder
                        ),
                        None => format!("No emails found in folder: {}", folder),
                    };
                    println!("{}", message);
                    return Ok(0);
                }
                println!("Emails in folder '{}' ({}):", folder, emails.len());
                println!();
                for email in &emails {
                    let from = email
                        .from
                        .first()
                        .map(|a| a.email())
                        .unwrap_or_else(|| "Unknown".to_string());
                    let date = email
                        .date
                        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    let marker = if email.seen { " " } else { "*" };
                    println!("{} [{}] {} - {} ({})", marker, email.uid, from, email.subject, date);
                }
            } else {
                let response = EmailListResponse {
                    folder: folder.clone(),
                    count: emails.len(),
                    emails,
                };
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            Ok(0)
        }
        Command::DeleteEmails { folder, filters } => {
            let query = filters.build_predicate()?;
            if query.is_none() {
                eprintln!(
                    "Error: at least one filter option must be specified to prevent accidental deletion of all emails."
                );
                eprintln!("Use --help to see available filter options.");
                return Ok(1);
            }

            if client.delete_messages(folder, query.as_ref())? {
                println!("Emails deleted successfully from folder: {}", folder);
            } else {
                println!("No emails found matching the criteria in folder: {}", folder);
            }
            Ok(0)
        }
        Command::Send { to, subject, body } => {
            let draft = Draft {
                to: to.clone(),
                subject: subject.clone(),
                body: body.clone(),
            };
            if client.send(&draft) {
                println!("Email sent successfully to: {}", to);
                Ok(0)
            } else {
                eprintln!("Error: email could not be sent to: {}", to);
                Ok(1)
            }
        }
    }
}
