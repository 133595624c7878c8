use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;

const DEFAULT_CONFIG_FILE: &str = "mailbroom.toml";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub connection: Connection,
}

/// Immutable account configuration shared by every operation.
#[derive(Deserialize, Debug, Clone)]
pub struct Connection {
    pub hostname: String,
    pub imap_port: u16,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
}

/// Loads configuration from a TOML file, falling back to `EMAIL_*`
/// environment variables when no file is present. An explicit `--config`
/// path must exist; only the default path is allowed to be missing.
pub fn get_config(file: &Option<String>) -> Result<Config> {
    let path = file.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);

    let config = match fs::read_to_string(path) {
        Ok(s) => toml::from_str(&s).with_context(|| format!("couldn't parse {}", path))?,
        Err(e) if file.is_none() && e.kind() == std::io::ErrorKind::NotFound => from_env()?,
        Err(e) => return Err(e).with_context(|| format!("couldn't read {}", path)),
    };

    validate(&config.connection)?;
    Ok(config)
}

fn from_env() -> Result<Config> {
    Ok(Config {
        connection: Connection {
            hostname: required_env("EMAIL_HOSTNAME")?,
            imap_port: required_port_env("EMAIL_IMAP_PORT")?,
            smtp_port: required_port_env("EMAIL_SMTP_PORT")?,
            username: required_env("EMAIL_USER")?,
            password: required_env("EMAIL_PASSWORD")?,
        },
    })
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| {
        format!(
            "required environment variable {} is not set; create {} or set it",
            key, DEFAULT_CONFIG_FILE
        )
    })
}

fn required_port_env(key: &str) -> Result<u16> {
    let value = required_env(key)?;
    value.parse::<u16>().with_context(|| {
        format!(
            "environment variable {} must be a port number, got: {}",
            key, value
        )
    })
}

fn validate(conn: &Connection) -> Result<()> {
    if conn.hostname.trim().is_empty() {
        bail!("hostname is required");
    }
    if conn.username.trim().is_empty() {
        bail!("username is required");
    }
    if conn.password.trim().is_empty() {
        bail!("password is required");
    }
    Ok(())
}
