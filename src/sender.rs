use crate::config::Connection;
use crate::error::ConnectionError;
use crate::message::Draft;
use crate::protocol::ProtocolDescriptor;
use lettre::smtp::authentication::Credentials;
use lettre::{ClientSecurity, ClientTlsParameters, SmtpClient, Transport};
use tracing::{debug, info};

/// The outbound transport seam, mirroring [`crate::session::StoreFactory`]:
/// tests swap in a closure instead of a live SMTP relay.
pub type Sender = Box<
    dyn Fn(&Connection, &ProtocolDescriptor, &Draft) -> Result<(), ConnectionError> + Send + Sync,
>;

/// Builds and transmits one message over SMTP.
///
/// The transport security mode comes straight from the resolved descriptor:
/// plain, STARTTLS upgrade, or TLS from the first byte.
pub fn send(conn: &Connection, descriptor: &ProtocolDescriptor, draft: &Draft) -> Result<(), ConnectionError> {
    let security = client_security(conn, descriptor)?;
    let credentials = Credentials::new(conn.username.clone(), conn.password.clone());

    let mut transport = SmtpClient::new(
        format!("{}:{}", conn.hostname, conn.smtp_port),
        security,
    )?
    .credentials(credentials)
    .transport();

    let email = lettre_email::Email::builder()
        .from(conn.username.as_str())
        .to(draft.to.as_str())
        .subject(&draft.subject)
        .text(&draft.body)
        .build()
        .map_err(|e| ConnectionError::Smtp(e.to_string()))?;

    debug!(
        "sending to {} via {}:{} (ssl: {}, starttls: {})",
        draft.to, conn.hostname, conn.smtp_port, descriptor.use_ssl, descriptor.use_starttls
    );
    transport.send(email.into())?;
    info!("email sent to {}", draft.to);
    Ok(())
}

fn client_security(
    conn: &Connection,
    descriptor: &ProtocolDescriptor,
) -> Result<ClientSecurity, ConnectionError> {
    if !descriptor.use_ssl && !descriptor.use_starttls {
        return Ok(ClientSecurity::None);
    }

    let connector = native_tls::TlsConnector::builder().build()?;
    let tls = ClientTlsParameters::new(conn.hostname.clone(), connector);
    if descriptor.use_ssl {
        Ok(ClientSecurity::Wrapper(tls))
    } else {
        Ok(ClientSecurity::Required(tls))
    }
}
